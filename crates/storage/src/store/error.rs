#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    NodeNotFound,
    ParentNotFound,
    DuplicateKey,
    SelfParent,
    CircularReference,
    HasChildren,
    Cancelled,
    CorruptHierarchy(&'static str),
}

impl StoreError {
    /// Stable machine-readable code, safe to expose to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Sql(_) => "STORAGE",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NodeNotFound => "NODE_NOT_FOUND",
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::SelfParent => "SELF_PARENT",
            Self::CircularReference => "CIRCULAR_REFERENCE",
            Self::HasChildren => "HAS_CHILDREN",
            Self::Cancelled => "CANCELLED",
            Self::CorruptHierarchy(_) => "CORRUPT_HIERARCHY",
        }
    }

    /// True for errors caused by the request itself rather than by storage.
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::Sql(_) | Self::Cancelled | Self::CorruptHierarchy(_)
        )
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NodeNotFound => write!(f, "location not found"),
            Self::ParentNotFound => write!(f, "parent location not found"),
            Self::DuplicateKey => write!(f, "location number already exists"),
            Self::SelfParent => write!(f, "location cannot be its own parent"),
            Self::CircularReference => {
                write!(f, "cannot create circular reference in location hierarchy")
            }
            Self::HasChildren => write!(f, "location has children and cannot be deleted"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::CorruptHierarchy(message) => write!(f, "corrupt hierarchy: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sql(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
