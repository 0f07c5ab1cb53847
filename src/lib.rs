mod database {
    pub mod actions;
    pub mod error;
    pub mod filter;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod config;
mod constants;
mod shopping_list;

pub mod routes;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use shopping_list::*;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
