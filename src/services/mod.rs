pub mod activation;
pub mod http_store;
pub mod loader;
pub mod memory_store;
pub mod store;
