pub mod backend;
pub mod cli;
pub mod config;
pub mod executor;
pub mod flow;
pub mod locator;
pub mod scenario;
pub mod snapshot;
pub mod wait;

pub use tapwright_common::error;
pub use tapwright_common::formatter;
pub use tapwright_common::protocol;
