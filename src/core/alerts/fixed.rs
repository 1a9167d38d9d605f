// Fixed-instant alerts: fire exactly once, at a caller-chosen time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::model::{AlertKind, FiringInstants, FiringPolicy, INSTANT_FORMAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedInstant {
    scheduled: NaiveDateTime,
}

impl FixedInstant {
    /// No validation: past instants are accepted and simply never show up as upcoming.
    pub fn new(scheduled: NaiveDateTime) -> Self {
        Self { scheduled }
    }

    pub fn scheduled(&self) -> NaiveDateTime {
        self.scheduled
    }

    /// Move the alert to `new_time`, swapping its single firing instant along with it.
    pub fn change_time(&mut self, new_time: NaiveDateTime, firing: &mut FiringInstants) {
        firing.remove(self.scheduled);
        self.scheduled = new_time;
        firing.add(self.scheduled);
    }
}

impl FiringPolicy for FixedInstant {
    fn kind(&self) -> AlertKind {
        AlertKind::Fixed
    }

    fn recompute(
        &self,
        _event_time: NaiveDateTime,
        _now: NaiveDateTime,
        firing: &mut FiringInstants,
    ) {
        firing.clear();
        firing.add(self.scheduled);
    }

    fn describe(&self, message: &str) -> String {
        format!(
            "{}: {} at {}",
            self.kind().display_name(),
            message,
            self.scheduled.format(INSTANT_FORMAT)
        )
    }
}
