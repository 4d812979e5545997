//! Remote-call boundary
//!
//! The lifecycle core only sees the [`PostApi`] trait. [`HttpPostClient`] is
//! the reqwest-backed implementation used by the binary.

pub mod client;
mod error;
mod http;

pub use client::PostApi;
pub use error::ApiError;
pub use http::HttpPostClient;
