//! API endpoint handlers, one module per resource.

pub mod health;
pub mod reports;
pub mod scan;
pub mod status;
pub mod upload;
