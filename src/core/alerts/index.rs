// Alert index - owns every alert and keeps the instant and event indexes in step.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::fixed::FixedInstant;
use super::model::{Alert, AlertEdit, AlertError, Schedule};
use super::recurring::Recurring;
use crate::core::model::{AlertId, EventId, EventInfo, UpcomingAlert};

/// Highest id accepted from a snapshot; leaves room to keep issuing new ids.
const MAX_STORED_ID: u64 = u64::MAX >> 1;

/// Persisted form of the index: the alerts themselves, indexes are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub next_id: u64,
    pub alerts: Vec<Alert>,
}

/// All alerts of a calendar, indexed by firing instant and by owning event.
#[derive(Debug, Default)]
pub struct AlertIndex {
    /// Arena of registered alerts
    alerts: HashMap<AlertId, Alert>,
    /// Alerts firing at each instant
    by_instant: BTreeMap<NaiveDateTime, Vec<AlertId>>,
    /// Key set of `by_instant`
    all_instants: BTreeSet<NaiveDateTime>,
    /// Alerts per owning event, in creation order
    by_event: HashMap<EventId, Vec<AlertId>>,
    next_id: u64,
}

impl AlertIndex {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Rebuild an index from persisted alerts.
    ///
    /// Rejects snapshots with out-of-range or repeated ids, and alerts whose
    /// firing instants could not have come from their schedule.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, AlertError> {
        if snapshot.next_id > MAX_STORED_ID {
            return Err(AlertError::InvalidSnapshot(format!(
                "next id {} out of range",
                snapshot.next_id
            )));
        }

        let mut index = Self::new();
        for alert in snapshot.alerts {
            let id = alert.id();
            let next = id
                .0
                .checked_add(1)
                .filter(|_| id.0 <= MAX_STORED_ID)
                .ok_or_else(|| AlertError::InvalidSnapshot(format!("alert id {id} out of range")))?;
            if index.alerts.contains_key(&id) {
                return Err(AlertError::InvalidSnapshot(format!("duplicate alert id {id}")));
            }
            if !alert.firing_matches_schedule() {
                return Err(AlertError::InvalidSnapshot(format!(
                    "alert {id} has firing instants that do not match its schedule"
                )));
            }
            index.next_id = index.next_id.max(next);
            index.register(alert);
        }
        index.next_id = index.next_id.max(snapshot.next_id);
        Ok(index)
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let mut alerts: Vec<Alert> = self.alerts.values().cloned().collect();
        alerts.sort_by_key(Alert::id);
        IndexSnapshot {
            next_id: self.next_id,
            alerts,
        }
    }

    /// Create a one-shot alert at `time`. Past instants are accepted.
    pub fn add_fixed_alert(
        &mut self,
        event: &EventInfo,
        message: impl Into<String>,
        time: NaiveDateTime,
    ) -> AlertId {
        let schedule = Schedule::Fixed(FixedInstant::new(time));
        // fixed schedules do not depend on now
        let alert = Alert::new(self.issue_id(), event, message.into(), schedule, time);
        log::info!("Added alert {} for event '{}' at {}", alert.id(), event.name, time);
        self.register(alert)
    }

    /// Create an alert repeating every `interval` until the event starts.
    ///
    /// Rejected without touching the index when no full interval fits before the event.
    pub fn add_recurring_alert(
        &mut self,
        event: &EventInfo,
        message: impl Into<String>,
        interval: Duration,
        now: NaiveDateTime,
    ) -> Result<AlertId, AlertError> {
        if !Recurring::is_valid(event.start, now, interval) {
            let err = AlertError::IllegalRecurrence {
                event: event.id.clone(),
                interval,
            };
            log::warn!("{}", err);
            return Err(err);
        }

        let schedule = Schedule::Recurring(Recurring::new(interval));
        let alert = Alert::new(self.issue_id(), event, message.into(), schedule, now);
        log::info!(
            "Added alert {} for event '{}' firing {} times",
            alert.id(),
            event.name,
            alert.firing_instants().len()
        );
        Ok(self.register(alert))
    }

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Alerts with a firing instant at or after `now` whose event has not started yet.
    ///
    /// Instants are walked from the latest down to the earliest one >= `now`;
    /// each alert is returned once.
    pub fn query_active(&self, now: NaiveDateTime) -> Vec<&Alert> {
        let mut seen = HashSet::new();
        let mut active = Vec::new();

        for (_, ids) in self.by_instant.range(now..).rev() {
            for id in ids {
                let Some(alert) = self.alerts.get(id) else {
                    continue;
                };
                if alert.event_time() > now && seen.insert(*id) {
                    active.push(alert);
                }
            }
        }
        active
    }

    /// Every firing instant at or after `now`, latest first.
    pub fn query_upcoming_instants(&self, now: NaiveDateTime) -> Vec<NaiveDateTime> {
        self.all_instants.range(now..).rev().copied().collect()
    }

    /// One row per (instant, alert) pair for instants at or after `now`, latest first.
    pub fn upcoming_rows(&self, now: NaiveDateTime) -> Vec<UpcomingAlert> {
        self.by_instant
            .range(now..)
            .rev()
            .flat_map(|(time, ids)| {
                ids.iter()
                    .filter_map(|id| self.alerts.get(id))
                    .map(move |alert| UpcomingAlert {
                        time: *time,
                        alert_id: alert.id(),
                        event_name: alert.event_name().to_string(),
                        message: alert.message().to_string(),
                        tag: alert.kind().tag(),
                    })
            })
            .collect()
    }

    /// Alerts of one event in creation order; empty when the event has none.
    pub fn alerts_for_event(&self, event: &str) -> Vec<&Alert> {
        self.by_event
            .get(event)
            .map(|ids| ids.iter().filter_map(|id| self.alerts.get(id)).collect())
            .unwrap_or_default()
    }

    /// Every alert, past or future, ordered by id.
    pub fn all_alerts(&self) -> Vec<&Alert> {
        let mut alerts: Vec<&Alert> = self.alerts.values().collect();
        alerts.sort_by_key(|a| a.id());
        alerts
    }

    pub fn delete_alert(&mut self, id: AlertId) -> Option<Alert> {
        let alert = self.alerts.remove(&id)?;
        self.unindex_instants(&alert);

        let mut emptied = Vec::new();
        for (event, ids) in &mut self.by_event {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                emptied.push(event.clone());
            }
        }
        for event in emptied {
            self.by_event.remove(&event);
        }

        log::info!("Deleted alert {} for event '{}'", id, alert.event_name());
        Some(alert)
    }

    /// Delete every alert of `event` and drop its bucket. Returns how many were removed.
    pub fn delete_all_alerts_for_event(&mut self, event: &str) -> usize {
        let ids = self.by_event.get(event).cloned().unwrap_or_default();
        let removed = ids
            .into_iter()
            .filter_map(|id| self.delete_alert(id))
            .count();
        self.by_event.remove(event);
        removed
    }

    /// Apply `edit` to an alert, keeping the indexes consistent.
    ///
    /// The alert's old instants are unindexed before it changes and the new ones
    /// indexed afterwards. On error the alert and indexes are left untouched.
    pub fn edit_alert(
        &mut self,
        id: AlertId,
        edit: AlertEdit,
        now: NaiveDateTime,
    ) -> Result<(), AlertError> {
        let alert = self.alerts.get(&id).ok_or(AlertError::UnknownAlert(id))?;
        if alert.kind() != edit.kind() {
            return Err(AlertError::KindMismatch {
                id,
                expected: alert.kind(),
            });
        }
        if let AlertEdit::Recurring { interval, .. } = &edit {
            if !Recurring::is_valid(alert.event_time(), now, *interval) {
                let err = AlertError::IllegalRecurrence {
                    event: alert.event_id().clone(),
                    interval: *interval,
                };
                log::warn!("Edit of alert {} rejected: {}", id, err);
                return Err(err);
            }
        }

        let Some(mut alert) = self.alerts.remove(&id) else {
            return Err(AlertError::UnknownAlert(id));
        };
        self.unindex_instants(&alert);

        alert.set_message(edit.message());
        let (schedule, firing, event_time) = alert.schedule_parts_mut();
        match (schedule, &edit) {
            (Schedule::Fixed(fixed), AlertEdit::Fixed { time, .. }) => {
                fixed.change_time(*time, firing);
            }
            (Schedule::Recurring(recurring), AlertEdit::Recurring { interval, .. }) => {
                recurring.change_frequency(*interval, event_time, now, firing);
            }
            // kinds were checked above
            _ => {}
        }
        alert.refresh_display();

        log::debug!("Edited alert {}: {}", id, alert.display());
        self.index_instants(&alert);
        self.alerts.insert(id, alert);
        Ok(())
    }

    pub fn edit_fixed_alert(
        &mut self,
        id: AlertId,
        message: impl Into<String>,
        time: NaiveDateTime,
    ) -> Result<(), AlertError> {
        let edit = AlertEdit::Fixed {
            message: message.into(),
            time,
        };
        // fixed schedules do not depend on now
        self.edit_alert(id, edit, time)
    }

    pub fn edit_recurring_alert(
        &mut self,
        id: AlertId,
        message: impl Into<String>,
        interval: Duration,
        now: NaiveDateTime,
    ) -> Result<(), AlertError> {
        let edit = AlertEdit::Recurring {
            message: message.into(),
            interval,
        };
        self.edit_alert(id, edit, now)
    }

    fn issue_id(&mut self) -> AlertId {
        let id = AlertId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a fully-built alert into the arena and all indexes.
    fn register(&mut self, alert: Alert) -> AlertId {
        let id = alert.id();
        self.index_instants(&alert);
        self.by_event.entry(alert.event_id().clone()).or_default().push(id);
        self.alerts.insert(id, alert);
        id
    }

    fn index_instants(&mut self, alert: &Alert) {
        for at in alert.firing_instants().iter() {
            self.by_instant.entry(at).or_default().push(alert.id());
            self.all_instants.insert(at);
        }
    }

    fn unindex_instants(&mut self, alert: &Alert) {
        for at in alert.firing_instants().iter() {
            let Some(ids) = self.by_instant.get_mut(&at) else {
                continue;
            };
            ids.retain(|id| *id != alert.id());
            if ids.is_empty() {
                log::debug!("No alerts left at {}, pruning", at);
                self.by_instant.remove(&at);
                self.all_instants.remove(&at);
            }
        }
    }

    /// Alerts registered at exactly `at`.
    pub fn alerts_at(&self, at: NaiveDateTime) -> Vec<&Alert> {
        self.by_instant
            .get(&at)
            .map(|ids| ids.iter().filter_map(|id| self.alerts.get(id)).collect())
            .unwrap_or_default()
    }

    /// Check the three structures agree with each other and with the alerts.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let keys: BTreeSet<_> = self.by_instant.keys().copied().collect();
        if keys != self.all_instants || self.by_instant.values().any(Vec::is_empty) {
            return false;
        }
        for (at, ids) in &self.by_instant {
            for id in ids {
                match self.alerts.get(id) {
                    Some(alert) if alert.firing_instants().contains(*at) => {}
                    _ => return false,
                }
            }
        }
        for alert in self.alerts.values() {
            for at in alert.firing_instants().iter() {
                if !self.by_instant.get(&at).is_some_and(|ids| ids.contains(&alert.id())) {
                    return false;
                }
            }
            let in_bucket = self
                .by_event
                .get(alert.event_id())
                .is_some_and(|ids| ids.contains(&alert.id()));
            if !in_bucket {
                return false;
            }
        }
        self.by_event
            .values()
            .flatten()
            .all(|id| self.alerts.contains_key(id))
    }

    #[cfg(test)]
    pub(crate) fn instant_keys(&self) -> Vec<NaiveDateTime> {
        self.all_instants.iter().copied().collect()
    }
}
