use crate::version::Version;

/// Errors from the class registry and the core value types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// No class with this name has been registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A decoded class is neither the expected class nor derived from it.
    #[error("expected exact or derived from {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The class name is already taken.
    #[error("class already registered: {0}")]
    AlreadyRegistered(String),

    /// The class is abstract or registered with a factory of another product type.
    #[error("no factory for class {0}")]
    NoFactory(String),

    /// A version string is not of the form `major.minor`.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// A time string is not a valid ISO-8601 UTC timestamp.
    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while reading or writing an archive.
///
/// Decode errors are collected by the archive session instead of aborting it,
/// see [`crate::archive::ArchiveState`].
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Fewer bytes were available than the value requires.
    #[error("stream truncated: expected {expected} bytes, got {got}")]
    StreamTruncated { expected: usize, got: usize },

    /// A string, blob or sequence is longer than a 32-bit length prefix
    /// can express.
    #[error("length {0} exceeds the 32-bit length prefix")]
    LengthOverflow(usize),

    /// The byte stream is structurally invalid.
    #[error("stream corrupt: {0}")]
    StreamCorrupt(String),

    /// The archive is newer than the object's serializer understands.
    #[error("archive version {found} too high: {class} skipped (supports up to {supported})")]
    VersionTooHigh {
        class: String,
        found: Version,
        supported: Version,
    },

    /// A textual value could not be parsed into the property's type.
    #[error("invalid value for {property}: {value:?}")]
    InvalidValue { property: String, value: String },

    /// A mandatory property or object is absent.
    #[error("missing mandatory {0}")]
    Missing(String),

    /// The session has been closed or was never opened.
    #[error("archive is not open")]
    NotOpen,

    /// The operation needs the other direction.
    #[error("archive is open for {0}")]
    WrongMode(&'static str),

    /// XML parse or render failure.
    #[error("xml error: {0}")]
    Xml(String),

    /// Invalid archive configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error from the byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Class registry failure while decoding.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
