//! HTTP adapter (Axum server).

pub mod handlers;
pub mod server;


pub use server::HttpServer;
