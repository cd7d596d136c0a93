use seisgraph_core::CoreError;

/// Errors from identity registration, ownership changes and notifier replay.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The child already has a parent, possibly this one.
    #[error("{child} is already owned by {parent}")]
    AlreadyOwned { child: String, parent: String },

    /// Another child of the parent has the same index.
    #[error("{parent} already has a child with index {index}")]
    DuplicateIndex { parent: String, index: String },

    /// A live object with this publicID is already registered.
    #[error("publicID already registered: {0}")]
    DuplicateId(String),

    /// The object has no publicID to register under.
    #[error("{0} has no publicID")]
    NoPublicId(String),

    /// The child's back-reference names another parent, or none.
    #[error("{child} is not a child of {parent}")]
    WrongParent { child: String, parent: String },

    /// The parent has no collection for this class.
    #[error("{child} cannot be a child of {parent}")]
    WrongClass { child: String, parent: String },

    /// A notifier names a parent that is not registered.
    #[error("parent object not found: {0}")]
    ParentNotFound(String),

    /// No child of the parent has the given index.
    #[error("{parent} has no child {child}")]
    ChildNotFound { parent: String, child: String },

    /// An update was emitted for an object without a parent.
    #[error("{0} is not attached to a parent")]
    NotAttached(String),

    /// A notifier without an object.
    #[error("notifier carries no object")]
    EmptyNotifier,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
