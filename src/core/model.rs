use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Key of a calendar event as handed to us by the calendar layer.
pub type EventId = String;

/// Opaque alert identity, issued by the index on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the index needs to know about the event an alert belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub id: EventId,
    pub name: String,
    pub start: NaiveDateTime,
}

impl EventInfo {
    pub fn new(id: impl Into<EventId>, name: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start,
        }
    }
}

/// One row of the "upcoming alerts" view: a single firing instant of one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingAlert {
    pub time: NaiveDateTime,
    pub alert_id: AlertId,
    pub event_name: String,
    pub message: String,
    /// "i" for fixed alerts, "f" for recurring ones
    pub tag: &'static str,
}
