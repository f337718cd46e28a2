//! Editor-level errors.

use parche_graph::ValidationError;
use thiserror::Error;

/// Errors from dispatching an action.
///
/// Every variant leaves the editor unchanged: validation failures roll back
/// inside the graph, and empty-history undo/redo touch nothing.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The action failed graph validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Undo was requested with an empty undo history.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo was requested with an empty redo history.
    #[error("nothing to redo")]
    NothingToRedo,
}
