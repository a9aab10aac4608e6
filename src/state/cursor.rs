//! Pagination cursor for walking a multi-page result set
//!
//! The cursor only knows about offsets and page sizes; fetching, retrying and
//! extracting are the coordinator's business.

use std::fmt;

/// Represents whether more pages may exist for the current target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// The last page was full, another page may follow
    Active,

    /// The remote signaled end of data (short or empty page)
    Exhausted,
}

impl CursorState {
    /// Returns true if no further fetches may be issued
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Offset and page-size bookkeeping for one pagination run
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    offset: u32,
    page_size: u32,
    state: CursorState,
}

impl PaginationCursor {
    /// Creates an active cursor at offset 0
    ///
    /// A page size of zero would never exhaust, so it is clamped to 1.
    pub fn new(page_size: u32) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
            state: CursorState::Active,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.is_terminal()
    }

    /// Records how many listings the page at the current offset returned
    ///
    /// A short page exhausts the cursor; the offset is left pointing at that
    /// last page. A full page moves the offset forward by one page. Advancing
    /// an exhausted cursor is a no-op.
    pub fn advance(&mut self, result_count: usize) -> CursorState {
        if self.state.is_terminal() {
            tracing::warn!(
                "Cursor already exhausted at offset {}, ignoring page of {}",
                self.offset,
                result_count
            );
            return self.state;
        }

        let page_size = self.page_size as usize;
        if result_count < page_size {
            self.state = CursorState::Exhausted;
            return self.state;
        }

        if result_count > page_size {
            tracing::warn!(
                "Page at offset {} returned {} listings, more than page size {}",
                self.offset,
                result_count,
                self.page_size
            );
        }

        self.offset += self.page_size;
        self.state
    }
}
