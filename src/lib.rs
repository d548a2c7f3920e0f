pub mod config;
pub mod error;
pub mod mastodon;
pub mod scheduler;
pub mod server;
pub mod status;
pub mod sync;
