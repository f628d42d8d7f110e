use thiserror::Error;
use uuid::Uuid;

use crate::driver::DriverError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Another scrape worker is already running")]
    SlotBusy,

    #[error("No worker is running for session {0}")]
    NoWorker(Uuid),

    #[error("Page fetch gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
