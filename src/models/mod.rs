pub mod document;
pub mod enums;
pub mod job;
pub mod lab;
pub mod report;

pub use document::*;
pub use enums::*;
pub use job::*;
pub use lab::*;
pub use report::*;
