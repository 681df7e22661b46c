//! HTTP surface.
//!
//! Browser pages plus a small JSON API for uploading lab reports, polling
//! their jobs, listing extracted results and rescanning the uploads folder.
//! `api_router()` returns a `Router` that can be mounted on any axum server.

pub mod endpoints;
pub mod error;
pub mod pages;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
