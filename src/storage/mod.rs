pub mod sqlite;

pub use sqlite::{
    CoffeeRecord, CoffeeRow, CreatorAccount, CreatorProfile, CreatorSummary, SiteStats,
    SqliteStorage,
};
