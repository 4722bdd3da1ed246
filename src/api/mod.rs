pub mod error;
pub mod handler;
pub mod server;
pub mod state;
pub mod types;
