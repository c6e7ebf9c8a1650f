use thiserror::Error;

/// Result type alias using RunStateError
pub type Result<T> = std::result::Result<T, RunStateError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on without
/// parsing messages. `NotFound` is distinct from the store failure kinds:
/// callers treat it as "no prior state".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsErrorKind {
    // Lookup
    NotFound,

    // Storage medium
    StoreWrite,
    StoreRead,

    // Locking
    AlreadyLocked,
    LockNotHeld,

    // Validation
    InvalidName,
    InvalidInput,

    // Encoding/config
    Serialization,
    Config,

    // Internal
    Internal,
}

impl RsErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            RsErrorKind::NotFound => "ERR_NOT_FOUND",
            RsErrorKind::StoreWrite => "ERR_STORE_WRITE",
            RsErrorKind::StoreRead => "ERR_STORE_READ",
            RsErrorKind::AlreadyLocked => "ERR_ALREADY_LOCKED",
            RsErrorKind::LockNotHeld => "ERR_LOCK_NOT_HELD",
            RsErrorKind::InvalidName => "ERR_INVALID_NAME",
            RsErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            RsErrorKind::Serialization => "ERR_SERIALIZATION",
            RsErrorKind::Config => "ERR_CONFIG",
            RsErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for
/// debugging. Built from a [`RunStateError`] at API boundaries and by the
/// logging macros.
#[derive(Debug, Clone)]
pub struct RsError {
    kind: RsErrorKind,
    op: Option<String>,
    namespace: Option<String>,
    entity: Option<String>,
    message: String,
}

impl RsError {
    /// Create a new error with the specified kind
    pub fn new(kind: RsErrorKind) -> Self {
        Self {
            kind,
            op: None,
            namespace: None,
            entity: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add namespace (job name) context
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add entity context (entry name, lock name)
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> RsErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for RsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, " (namespace: {})", namespace)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        Ok(())
    }
}

impl std::error::Error for RsError {}

// ========== End Error Facility ==========

/// Error taxonomy for state store and job lock operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunStateError {
    /// The storage medium rejected or failed a write
    #[error("Failed to write {namespace}/{name}: {message}")]
    StoreWrite {
        namespace: String,
        name: String,
        message: String,
    },

    /// The storage medium failed a read
    #[error("Failed to read {namespace}/{name}: {message}")]
    StoreRead {
        namespace: String,
        name: String,
        message: String,
    },

    /// Requested version or alias does not exist
    #[error("Not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },

    /// Another owner holds the job lock
    #[error("Job lock already held for {job_name}{}", owner_suffix(.owner))]
    AlreadyLocked {
        job_name: String,
        owner: Option<String>,
    },

    /// Release attempted by a caller that does not hold the lock
    #[error("Job lock for {job_name} is not held by this owner")]
    LockNotHeld { job_name: String },

    /// Namespace or entry name is not usable as a key
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Caller supplied an unusable argument
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// State record encode/decode failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invariant broken inside a backend (poisoned mutex etc.)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn owner_suffix(owner: &Option<String>) -> String {
    owner
        .as_deref()
        .map(|o| format!(" by {}", o))
        .unwrap_or_default()
}

impl RunStateError {
    /// Classify this error without converting it
    pub fn kind(&self) -> RsErrorKind {
        match self {
            RunStateError::StoreWrite { .. } => RsErrorKind::StoreWrite,
            RunStateError::StoreRead { .. } => RsErrorKind::StoreRead,
            RunStateError::NotFound { .. } => RsErrorKind::NotFound,
            RunStateError::AlreadyLocked { .. } => RsErrorKind::AlreadyLocked,
            RunStateError::LockNotHeld { .. } => RsErrorKind::LockNotHeld,
            RunStateError::InvalidName { .. } => RsErrorKind::InvalidName,
            RunStateError::InvalidInput { .. } => RsErrorKind::InvalidInput,
            RunStateError::Serialization { .. } => RsErrorKind::Serialization,
            RunStateError::Config { .. } => RsErrorKind::Config,
            RunStateError::Internal { .. } => RsErrorKind::Internal,
        }
    }

    /// True when the error means "no such version or alias"
    pub fn is_not_found(&self) -> bool {
        matches!(self, RunStateError::NotFound { .. })
    }

    pub fn not_found(namespace: &str, name: &str) -> Self {
        RunStateError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn store_write(namespace: &str, name: &str, message: impl ToString) -> Self {
        RunStateError::StoreWrite {
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn store_read(namespace: &str, name: &str, message: impl ToString) -> Self {
        RunStateError::StoreRead {
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        RunStateError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RunStateError::Internal {
            message: message.into(),
        }
    }
}

impl From<RunStateError> for RsError {
    fn from(err: RunStateError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            RunStateError::StoreWrite {
                namespace, name, ..
            } => RsError::new(kind)
                .with_namespace(namespace)
                .with_entity(name)
                .with_op("store_write")
                .with_message(message),

            RunStateError::StoreRead {
                namespace, name, ..
            } => RsError::new(kind)
                .with_namespace(namespace)
                .with_entity(name)
                .with_op("store_read")
                .with_message(message),

            RunStateError::NotFound { namespace, name } => RsError::new(kind)
                .with_namespace(namespace)
                .with_entity(name)
                .with_message(message),

            RunStateError::AlreadyLocked { job_name, .. } => RsError::new(kind)
                .with_entity(job_name)
                .with_op("acquire_lock")
                .with_message(message),

            RunStateError::LockNotHeld { job_name } => RsError::new(kind)
                .with_entity(job_name)
                .with_op("release_lock")
                .with_message(message),

            RunStateError::InvalidName { name, .. } => RsError::new(kind)
                .with_entity(name)
                .with_message(message),

            RunStateError::InvalidInput { .. }
            | RunStateError::Serialization { .. }
            | RunStateError::Config { .. }
            | RunStateError::Internal { .. } => RsError::new(kind).with_message(message),
        }
    }
}

impl From<serde_json::Error> for RunStateError {
    fn from(err: serde_json::Error) -> Self {
        RunStateError::Serialization {
            message: err.to_string(),
        }
    }
}
