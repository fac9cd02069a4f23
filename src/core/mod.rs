pub mod config;
pub mod page;

pub use config::{Config, Credentials, Endpoint, Timing};
pub use page::PageDriver;
