pub mod billing;
pub mod fallback;
pub mod metrics;
pub mod payments;
pub mod reminders;
pub mod seats;
pub mod settings;
pub mod students;
pub mod whatsapp;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    SeatConflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database not configured")]
    NoDatabase,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Failures of the storage layer, as opposed to problems with the request.
    pub fn is_storage(&self) -> bool {
        matches!(self, ServiceError::NoDatabase | ServiceError::Database(_))
    }
}

impl From<seats::SeatConflict> for ServiceError {
    fn from(conflict: seats::SeatConflict) -> Self {
        ServiceError::SeatConflict(conflict.to_string())
    }
}
