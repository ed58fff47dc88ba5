pub mod cache;
pub mod client;
pub mod payload;

pub use cache::{CachedPayload, RegistryCache};
pub use client::{FetchOutcome, RegistryClient, RegistryPort};
pub use payload::RegistryPayload;
