use crate::scene::ObjectId;

/// Result alias that carries the custom [`MosaicError`] type.
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    /// A layout strategy name that the engine does not recognise.
    #[error("unknown layout strategy `{0}`")]
    UnknownStrategy(String),
    /// A composite strategy was invoked without one of its required object
    /// roles ("objects", "inners", "outers").
    #[error("layout data is missing the `{0}` role")]
    MissingRole(&'static str),
    /// Explicit grid counts that cannot hold the supplied object set. The
    /// grid validates this before moving anything.
    #[error("{objects} objects cannot fit in a {cols}x{rows} grid")]
    GridOverflow {
        objects: usize,
        cols: usize,
        rows: usize,
    },
    /// A strategy was handed an empty object list.
    #[error("layout invoked with no objects")]
    EmptyLayout,
    /// The tiling search ran out of shrink attempts before every object fit.
    #[error("tiling could not fit {0} objects within the bound")]
    PackFailed(usize),
    /// Registry lookup for an object that is not (or no longer) live. Seen
    /// when a removal races a second removal of the same stream; callers log
    /// and skip rather than corrupt state.
    #[error("object {0} is not registered")]
    NotFound(ObjectId),
    /// An option or bound value a strategy cannot work with.
    #[error("invalid layout option: {0}")]
    InvalidOption(String),
    /// Group membership operation aimed at a non-group object.
    #[error("object {0} is not a group")]
    NotAGroup(ObjectId),
    /// The registry mutex was poisoned by a panicking holder.
    #[error("scene registry lock has been poisoned")]
    Poisoned,
    /// Wrapper around standard IO errors (config loading).
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration or report serialization.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
