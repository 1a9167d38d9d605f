// Alert scheduling and indexing.
//
// Architecture:
// - model.rs: Alert entity, firing-instant set, schedule variants and errors
// - fixed.rs: One-shot alerts at a caller-chosen instant
// - recurring.rs: Interval alerts counted back from the event start
// - index.rs: Instant/event indexes and the query and edit operations

pub mod fixed;
pub mod index;
pub mod model;
pub mod recurring;
