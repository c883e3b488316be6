use crate::api::routes::ApiRoutes;
use warp::Filter;

/// Servidor HTTP de la plataforma: monta el árbol de rutas con CORS
/// permisivo (el frontend se sirve aparte) y atiende en el puerto dado.
pub struct ApiServer {
    routes: ApiRoutes,
    port: u16,
}

impl ApiServer {
    pub fn new(routes: ApiRoutes, port: u16) -> Self {
        Self { routes, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sirve peticiones hasta que el proceso termina.
    pub async fn serve(self) {
        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type", "authorization"])
            .allow_methods(vec!["GET", "POST", "OPTIONS"]);

        let routes = self.routes.build().with(cors);

        tracing::info!("Servidor HTTP escuchando en el puerto {}", self.port);
        warp::serve(routes).run(([0, 0, 0, 0], self.port)).await;
    }
}
