use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pending schedule with the given ID exists for the destination.
    #[error("Schedule not found or already sent: {id}")]
    NotFound { id: String },

    /// The trigger columns of a stored row are invalid.
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// The startup scan exhausted its retry budget.
    #[error("Store unavailable after {attempts} attempts: {last}")]
    StoreUnavailable { attempts: u32, last: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
