pub mod config;
mod error_response;
mod http_layers;
pub mod server;
pub(self) mod session;
pub mod state;
pub mod validation;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::Session;
