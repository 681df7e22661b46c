pub mod import;
pub mod extraction;
pub mod parsing;
pub mod classify;
pub mod aggregate;
pub mod processor;
pub mod jobs;
