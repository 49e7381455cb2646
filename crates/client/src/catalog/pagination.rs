//! Per-category pagination cursors.
//!
//! Each category tracks its next page, whether more data may exist, and
//! whether a fetch is in flight. A fetch may begin only when the category
//! is idle and not exhausted; a short page marks the category exhausted.

/// Server page size for catalog listings.
pub const PAGE_SIZE: u32 = 4;

/// Cursor state for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Next page to request, zero-based.
    pub current_page: u32,
    /// Whether another page may exist.
    pub has_more: bool,
    /// Whether a fetch for this category is in flight.
    pub is_loading: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 0,
            has_more: true,
            is_loading: false,
        }
    }
}

/// Cursor table keyed by category index.
#[derive(Debug, Default)]
pub struct Paginator {
    states: Vec<PaginationState>,
}

impl Paginator {
    /// Create cursors for `categories` categories, all at page zero.
    #[must_use]
    pub fn new(categories: usize) -> Self {
        Self {
            states: vec![PaginationState::default(); categories],
        }
    }

    /// Try to start a fetch for the category.
    ///
    /// Returns the page to request, or `None` when a fetch is already in
    /// flight or the category is exhausted. Out-of-range categories are
    /// treated as exhausted.
    pub fn try_begin(&mut self, category: usize) -> Option<u32> {
        let state = self.states.get_mut(category)?;
        if state.is_loading || !state.has_more {
            return None;
        }
        state.is_loading = true;
        Some(state.current_page)
    }

    /// Record a completed fetch that returned `returned` items.
    ///
    /// A page shorter than [`PAGE_SIZE`] exhausts the category; a full
    /// page keeps it open even if the next one turns out empty.
    pub fn complete(&mut self, category: usize, returned: usize) {
        if let Some(state) = self.states.get_mut(category) {
            state.is_loading = false;
            state.current_page += 1;
            state.has_more = returned >= PAGE_SIZE as usize;
        }
    }

    /// Record a failed fetch; the page stays requestable.
    pub fn fail(&mut self, category: usize) {
        if let Some(state) = self.states.get_mut(category) {
            state.is_loading = false;
        }
    }

    /// Whether the category may still have unfetched pages. Out-of-range
    /// categories read as exhausted, matching [`Paginator::try_begin`].
    #[must_use]
    pub fn has_more(&self, category: usize) -> bool {
        self.states.get(category).is_some_and(|s| s.has_more)
    }

    /// Whether a fetch for the category is in flight.
    #[must_use]
    pub fn is_loading(&self, category: usize) -> bool {
        self.states.get(category).is_some_and(|s| s.is_loading)
    }

    /// Rewind one category to page zero.
    pub fn reset_category(&mut self, category: usize) {
        if let Some(state) = self.states.get_mut(category) {
            *state = PaginationState::default();
        }
    }

    /// Rewind every category to page zero.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = PaginationState::default();
        }
    }
}
