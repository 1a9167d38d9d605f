use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, Local, NaiveDateTime};

use super::alerts::index::AlertIndex;
use super::alerts::model::{Alert, AlertEdit, AlertError};
use super::model::{AlertId, EventInfo, UpcomingAlert};

/// Source of "now" for alert operations.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Thread-safe handle to an `AlertIndex`.
///
/// Every mutation holds the write lock for its whole duration so readers never
/// see the instant and event indexes out of step. The clock is read once per call.
#[derive(Clone)]
pub struct SharedAlertIndex {
    index: Arc<RwLock<AlertIndex>>,
    clock: Arc<dyn Clock>,
}

impl SharedAlertIndex {
    pub fn new(index: AlertIndex) -> Self {
        Self::with_clock(index, Arc::new(SystemClock))
    }

    pub fn with_clock(index: AlertIndex, clock: Arc<dyn Clock>) -> Self {
        Self {
            index: Arc::new(RwLock::new(index)),
            clock,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Shared access for queries that need more than one call to agree.
    pub fn read(&self) -> RwLockReadGuard<'_, AlertIndex> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AlertIndex> {
        self.index.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_fixed_alert(
        &self,
        event: &EventInfo,
        message: impl Into<String>,
        time: NaiveDateTime,
    ) -> AlertId {
        self.write().add_fixed_alert(event, message, time)
    }

    pub fn add_recurring_alert(
        &self,
        event: &EventInfo,
        message: impl Into<String>,
        interval: Duration,
    ) -> Result<AlertId, AlertError> {
        let now = self.now();
        self.write().add_recurring_alert(event, message, interval, now)
    }

    pub fn edit_alert(&self, id: AlertId, edit: AlertEdit) -> Result<(), AlertError> {
        let now = self.now();
        self.write().edit_alert(id, edit, now)
    }

    pub fn delete_alert(&self, id: AlertId) -> Option<Alert> {
        self.write().delete_alert(id)
    }

    pub fn delete_all_alerts_for_event(&self, event: &str) -> usize {
        self.write().delete_all_alerts_for_event(event)
    }

    /// Owned copies of the currently active alerts.
    pub fn active_alerts(&self) -> Vec<Alert> {
        let now = self.now();
        self.read().query_active(now).into_iter().cloned().collect()
    }

    pub fn upcoming_instants(&self) -> Vec<NaiveDateTime> {
        let now = self.now();
        self.read().query_upcoming_instants(now)
    }

    pub fn upcoming_rows(&self) -> Vec<UpcomingAlert> {
        let now = self.now();
        self.read().upcoming_rows(now)
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        self.read().all_alerts().into_iter().cloned().collect()
    }

    pub fn alerts_for_event(&self, event: &str) -> Vec<Alert> {
        self.read().alerts_for_event(event).into_iter().cloned().collect()
    }
}
