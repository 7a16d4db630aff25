pub mod api;
pub mod config;
pub mod http_server;
pub mod ingest;

pub use config::Config;
pub use http_server::{
    build_router, run_http_server, run_http_server_with_listener, HttpServerState,
};
pub use ingest::{IngestError, ReplayIngestor};
