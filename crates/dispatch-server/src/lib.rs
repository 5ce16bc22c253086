pub mod config;
pub mod encoder;
pub mod handlers;
pub mod server;
pub mod state;

#[cfg(test)]
mod testutil;

pub use config::ServerConfig;
pub use server::run_server;
pub use state::AppState;
