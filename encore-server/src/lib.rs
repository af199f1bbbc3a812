pub mod http;
pub mod store;
pub mod subsystems;
