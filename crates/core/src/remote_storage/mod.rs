//! Remote storage abstraction.
//!
//! This module provides a `RemoteStorage` trait for uploading payloads and
//! confirming they exist remotely, with a backend that drives an external
//! storage CLI (BaiduPCS-Go and compatible tools).

mod command;
mod types;

pub use command::CommandStorage;
pub use types::*;
