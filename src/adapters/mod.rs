pub mod file_config;
pub mod http_client;
pub mod http_handler;
pub mod registry;

/// Re-export commonly used types from adapters
pub use file_config::FileConfigProvider;
pub use http_client::HttpClientAdapter;
pub use http_handler::GatewayHandler;
pub use registry::ConsulRegistry;
