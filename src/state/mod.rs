//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `PaginationCursor`: offset and page-size bookkeeping for one target
//! - `CursorState`: whether more pages may follow (`Active`) or not (`Exhausted`)

mod cursor;

pub use cursor::{CursorState, PaginationCursor};
