//! Load-state union for screen-facing data.

/// The lifecycle of remotely loaded data, as a tagged union.
///
/// `Idle` is the explicit not-started sentinel (a cleared search box is
/// `Idle`, not `Success(vec![])`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> LoadState<T> {
    /// The loaded value, if any.
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a load is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
