use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod accounts;
pub mod auth;
pub mod config;
pub mod feedback;
pub mod permission;
pub mod reviews;
pub mod schema;
pub mod state;
pub mod util_resp;
pub mod validation;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
