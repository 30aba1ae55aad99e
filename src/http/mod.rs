//! HTTP plumbing shared by the worker and the CLI.

mod client;
mod types;

#[cfg(test)]
pub mod testing;

pub use client::{HttpClient, Network};
pub use types::{Request, Response};
