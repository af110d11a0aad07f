//! Per-entity retention state and the predicates downstream passes query.

mod state;
mod table;

pub use state::{Retainable, RetentionFlags, RetentionState, RuleClasses};
pub use table::{Retained, RetentionTable};
