use std::fmt;

pub type StoreFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum DreamError {
    /// Rejected before classification (e.g. empty text).
    InvalidInput(String),
    /// Another writer committed first; the caller must redo the whole
    /// read-update sequence.
    Conflict { user_id: String, expected_version: u64 },
    /// A stored aggregate violates its invariants. Never repaired.
    CorruptState(String),
    InvalidConfig(String),
    /// Failure inside the aggregate store collaborator.
    Store(StoreFailure),
}

impl fmt::Display for DreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DreamError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            DreamError::Conflict {
                user_id,
                expected_version,
            } => write!(
                f,
                "concurrent update for user '{user_id}' (expected version {expected_version})"
            ),
            DreamError::CorruptState(msg) => write!(f, "corrupt aggregate state: {msg}"),
            DreamError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            DreamError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for DreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DreamError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl DreamError {
    pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        DreamError::Store(Box::new(e))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DreamError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, DreamError>;
