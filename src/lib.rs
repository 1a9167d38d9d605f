#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
pub mod core;

pub use crate::core::alerts::index::AlertIndex;
pub use crate::core::alerts::model::{Alert, AlertEdit, AlertError, AlertKind};
pub use crate::core::model::{AlertId, EventId, EventInfo, UpcomingAlert};
pub use crate::core::state::SharedAlertIndex;
pub use crate::core::store::AlertStore;
