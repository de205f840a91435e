// Drag search: find which terms in a draft pull its classification away from
// a target category, and which of them are official strategy keywords.

pub mod optimizer;
pub mod removal;

pub use optimizer::{DragIteration, DragOptimizer, DragResult, DragSettings, StopReason};
pub use removal::{remove_term, word_count, RemovalMode};
