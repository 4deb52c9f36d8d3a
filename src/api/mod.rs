pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, Payload};
pub use error::ApiError;
