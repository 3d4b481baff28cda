use thiserror::Error;

/// Errors returned by [`SearchTree`](crate::SearchTree) and [`AvlTree`](crate::AvlTree).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested key is not present in the tree.
    #[error("key not found")]
    NotFound,

    /// A structural operation was requested on a node that cannot support it, such as rotating a
    /// node whose pivot child is absent.
    #[error("invalid tree operation: {0}")]
    InvalidOperation(&'static str),
}
