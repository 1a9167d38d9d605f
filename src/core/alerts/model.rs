// Alert model types: the alert entity, its firing-instant set and the variant schedule.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fixed::FixedInstant;
use super::recurring::{format_interval, Recurring};
use crate::core::model::{AlertId, EventId, EventInfo};

/// Rendering used for instants inside display strings.
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Which firing-instant policy an alert follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Fires once, at a caller-chosen instant
    Fixed,
    /// Fires every `interval` until the event starts
    Recurring,
}

impl AlertKind {
    /// One-character classification used by the display layer
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Fixed => "i",
            Self::Recurring => "f",
        }
    }

    /// Get the display name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fixed => "Individual Alert",
            Self::Recurring => "Frequent Alert",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error(
        "Illegal Frequent Alert Time: every {} does not fit before event '{event}'",
        format_interval(.interval.to_owned())
    )]
    IllegalRecurrence { event: EventId, interval: Duration },

    #[error("Alert not found: {0}")]
    UnknownAlert(AlertId),

    #[error("Alert {id} is not a {}", .expected.display_name())]
    KindMismatch { id: AlertId, expected: AlertKind },

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid alert snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Ordered set of instants at which an alert surfaces.
///
/// Only the variant policies can change it; everyone else gets a read-only view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiringInstants(BTreeSet<NaiveDateTime>);

impl FiringInstants {
    pub(super) fn add(&mut self, at: NaiveDateTime) {
        self.0.insert(at);
    }

    pub(super) fn remove(&mut self, at: NaiveDateTime) {
        self.0.remove(&at);
    }

    pub(super) fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NaiveDateTime> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.0.contains(&at)
    }

    pub fn first(&self) -> Option<NaiveDateTime> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Variant-specific behaviour shared by every alert schedule.
pub trait FiringPolicy {
    fn kind(&self) -> AlertKind;

    /// Rebuild `firing` from scratch for the current parameters.
    fn recompute(&self, event_time: NaiveDateTime, now: NaiveDateTime, firing: &mut FiringInstants);

    /// Human-readable summary for the given message.
    fn describe(&self, message: &str) -> String;
}

/// Firing policy of an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    Fixed(FixedInstant),
    Recurring(Recurring),
}

impl FiringPolicy for Schedule {
    fn kind(&self) -> AlertKind {
        match self {
            Self::Fixed(fixed) => fixed.kind(),
            Self::Recurring(recurring) => recurring.kind(),
        }
    }

    fn recompute(
        &self,
        event_time: NaiveDateTime,
        now: NaiveDateTime,
        firing: &mut FiringInstants,
    ) {
        match self {
            Self::Fixed(fixed) => fixed.recompute(event_time, now, firing),
            Self::Recurring(recurring) => recurring.recompute(event_time, now, firing),
        }
    }

    fn describe(&self, message: &str) -> String {
        match self {
            Self::Fixed(fixed) => fixed.describe(message),
            Self::Recurring(recurring) => recurring.describe(message),
        }
    }
}

/// A reminder attached to one calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    event_id: EventId,
    event_name: String,
    event_time: NaiveDateTime,
    message: String,
    display: String,
    firing: FiringInstants,
    schedule: Schedule,
}

impl Alert {
    /// Build an alert and populate its firing instants from `schedule`.
    pub(super) fn new(
        id: AlertId,
        event: &EventInfo,
        message: String,
        schedule: Schedule,
        now: NaiveDateTime,
    ) -> Self {
        let mut firing = FiringInstants::default();
        schedule.recompute(event.start, now, &mut firing);
        let display = schedule.describe(&message);
        Self {
            id,
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            event_time: event.start,
            message,
            display,
            firing,
            schedule,
        }
    }

    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn event_time(&self) -> NaiveDateTime {
        self.event_time
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn firing_instants(&self) -> &FiringInstants {
        &self.firing
    }

    pub fn kind(&self) -> AlertKind {
        self.schedule.kind()
    }

    /// Recompute the display summary from the current message and schedule.
    pub(super) fn refresh_display(&mut self) {
        self.display = self.schedule.describe(&self.message);
    }

    /// Mutable access to the variant state and firing set at once, for edits.
    pub(super) fn schedule_parts_mut(
        &mut self,
    ) -> (&mut Schedule, &mut FiringInstants, NaiveDateTime) {
        (&mut self.schedule, &mut self.firing, self.event_time)
    }

    /// Whether the stored firing set is one the schedule could have produced.
    ///
    /// Recurring sets depend on the time they were generated at, so only their
    /// shape is checked: evenly spaced by the interval and ending before the event.
    pub(super) fn firing_matches_schedule(&self) -> bool {
        match &self.schedule {
            Schedule::Fixed(fixed) => {
                self.firing.len() == 1 && self.firing.contains(fixed.scheduled())
            }
            Schedule::Recurring(recurring) => {
                let interval = recurring.interval();
                let instants: Vec<_> = self.firing.iter().collect();
                let reaches_event = instants
                    .last()
                    .and_then(|last| last.checked_add_signed(interval))
                    .map_or(true, |next| next >= self.event_time);
                interval > Duration::zero()
                    && instants.iter().all(|t| *t < self.event_time)
                    && instants.windows(2).all(|w| w[1] - w[0] == interval)
                    && reaches_event
            }
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alert for event {} occurring at {}: {}",
            self.event_name,
            self.event_time.format(INSTANT_FORMAT),
            self.message
        )
    }
}

/// A change to an alert's message and schedule parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEdit {
    Fixed { message: String, time: NaiveDateTime },
    Recurring { message: String, interval: Duration },
}

impl AlertEdit {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Fixed { .. } => AlertKind::Fixed,
            Self::Recurring { .. } => AlertKind::Recurring,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Fixed { message, .. } | Self::Recurring { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(AlertKind::Fixed.tag(), "i");
        assert_eq!(AlertKind::Recurring.tag(), "f");
    }

    #[test]
    fn test_new_alert_populates_instants_and_display() {
        let event = EventInfo::new("standup", "Standup", at(10, 10));
        let alert = Alert::new(
            AlertId(1),
            &event,
            "Prepare notes".to_string(),
            Schedule::Fixed(FixedInstant::new(at(9, 18))),
            at(8, 10),
        );

        assert_eq!(alert.firing_instants().iter().collect::<Vec<_>>(), vec![at(9, 18)]);
        assert_eq!(alert.display(), "Individual Alert: Prepare notes at 2024-01-09T18:00");
        assert_eq!(alert.kind(), AlertKind::Fixed);
        assert_eq!(alert.event_name(), "Standup");
    }

    #[test]
    fn test_set_message_does_not_touch_display_until_refresh() {
        let event = EventInfo::new("standup", "Standup", at(10, 10));
        let mut alert = Alert::new(
            AlertId(1),
            &event,
            "old".to_string(),
            Schedule::Fixed(FixedInstant::new(at(9, 18))),
            at(8, 10),
        );

        alert.set_message("new");
        assert!(alert.display().contains("old"));
        alert.refresh_display();
        assert!(alert.display().contains("new"));
    }

    #[test]
    fn test_error_messages() {
        let err = AlertError::IllegalRecurrence {
            event: "standup".to_string(),
            interval: Duration::days(10),
        };
        assert_eq!(
            err.to_string(),
            "Illegal Frequent Alert Time: every 10D does not fit before event 'standup'"
        );

        let err = AlertError::KindMismatch {
            id: AlertId(4),
            expected: AlertKind::Recurring,
        };
        assert_eq!(err.to_string(), "Alert #4 is not a Frequent Alert");
    }
}
