pub mod client;
pub mod page;

pub use client::CdpClient;
pub use page::CdpPage;
