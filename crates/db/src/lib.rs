//! SQLite persistence for the nextaction GTD bot.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool, PoolSettings};
