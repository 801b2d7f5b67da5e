pub mod app;
pub mod auth;
pub mod config;
pub mod dates;
pub mod error;
pub mod extract;
pub mod listings;
pub mod messages;
pub mod sql;
pub mod state;
pub mod tags;
pub mod users;
