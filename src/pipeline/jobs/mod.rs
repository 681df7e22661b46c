pub mod scan;
pub mod scheduler;
pub mod table;

pub use scan::ScanOutcome;
pub use scheduler::JobScheduler;
pub use table::JobTable;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::import::ImportError;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Report store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Internal error: {0}")]
    Internal(String),
}
