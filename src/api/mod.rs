pub mod auth;
pub mod interceptor;
pub mod routes;
pub mod server;

pub use auth::{AuthOutcome, Claims, TokenService};
pub use routes::ApiRoutes;
pub use server::ApiServer;
