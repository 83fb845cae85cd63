pub mod backend;
pub mod error_mapping;
pub mod webdriver;
pub mod xpath;

pub use backend::RemoteBackend;
