mod client;
mod error;
pub mod mapping;

pub use client::RemoteExtractor;
pub use error::RemoteError;
