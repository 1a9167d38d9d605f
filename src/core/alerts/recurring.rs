// Recurring alerts: fire every `interval`, counted backwards from the event start.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::model::{AlertKind, FiringInstants, FiringPolicy};

const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    /// Stored as whole seconds
    #[serde(with = "interval_secs")]
    interval: Duration,
}

impl Recurring {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when at least one full interval fits strictly between `now` and the event start.
    pub fn is_valid(event_time: NaiveDateTime, now: NaiveDateTime, interval: Duration) -> bool {
        if interval <= Duration::zero() || now >= event_time {
            return false;
        }
        event_time
            .checked_sub_signed(interval)
            .map_or(false, |first| first > now)
    }

    /// Replace the interval and regenerate every instant against `now`.
    pub fn change_frequency(
        &mut self,
        interval: Duration,
        event_time: NaiveDateTime,
        now: NaiveDateTime,
        firing: &mut FiringInstants,
    ) {
        self.interval = interval;
        self.recompute(event_time, now, firing);
    }
}

impl FiringPolicy for Recurring {
    fn kind(&self) -> AlertKind {
        AlertKind::Recurring
    }

    fn recompute(
        &self,
        event_time: NaiveDateTime,
        now: NaiveDateTime,
        firing: &mut FiringInstants,
    ) {
        firing.clear();
        if self.interval <= Duration::zero() {
            return;
        }

        // Walk back from the event until we are at or before now.
        let mut t = event_time;
        loop {
            match t.checked_sub_signed(self.interval) {
                Some(prev) => t = prev,
                None => return,
            }
            if t <= now {
                break;
            }
        }

        // Then forward, stopping short of the event itself.
        while t < event_time {
            firing.add(t);
            match t.checked_add_signed(self.interval) {
                Some(next) => t = next,
                None => break,
            }
        }
    }

    fn describe(&self, message: &str) -> String {
        format!(
            "{}: {} every {}",
            self.kind().display_name(),
            message,
            format_interval(self.interval)
        )
    }
}

/// Render an interval as whole days ("2D") when it divides evenly, else whole hours ("36H").
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.num_seconds();
    if secs != 0 && secs % SECS_PER_DAY == 0 {
        format!("{}D", interval.num_days())
    } else {
        format!("{}H", interval.num_hours())
    }
}

mod interval_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(interval.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs).ok_or_else(|| serde::de::Error::custom("interval out of range"))
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

    fn generate(
        event: NaiveDateTime,
        now: NaiveDateTime,
        interval: Duration,
    ) -> Vec<NaiveDateTime> {
        let mut firing = FiringInstants::default();
        Recurring::new(interval).recompute(event, now, &mut firing);
        firing.iter().collect()
    }

    #[test]
    fn test_validity() {
        let event = at(10, 10);
        assert!(Recurring::is_valid(event, at(8, 10), Duration::days(1)));
        // event already started
        assert!(!Recurring::is_valid(event, at(10, 10), Duration::hours(1)));
        assert!(!Recurring::is_valid(event, at(11, 0), Duration::hours(1)));
        // one interval back lands exactly on now
        assert!(!Recurring::is_valid(event, at(9, 10), Duration::days(1)));
        // interval longer than the remaining window
        assert!(!Recurring::is_valid(event, at(8, 10), Duration::days(10)));
        assert!(!Recurring::is_valid(event, at(8, 10), Duration::zero()));
        assert!(!Recurring::is_valid(event, at(8, 10), Duration::hours(-3)));
    }

    #[test]
    fn test_daily_instants_start_at_now() {
        let instants = generate(at(10, 10), at(8, 10), Duration::days(1));
        assert_eq!(instants, vec![at(8, 10), at(9, 10)]);
    }

    #[test]
    fn test_uneven_window_starts_before_now() {
        // 7h steps back from 10th 10:00: 03:00, 20:00 (9th), 13:00, 06:00 <= now (9th 08:00)
        let instants = generate(at(10, 10), at(9, 8), Duration::hours(7));
        assert_eq!(instants, vec![at(9, 6), at(9, 13), at(9, 20), at(10, 3)]);
    }

    #[test]
    fn test_generated_instants_bounds() {
        let event = at(20, 12);
        let intervals = [
            Duration::hours(1),
            Duration::hours(5),
            Duration::days(2),
            Duration::minutes(90),
        ];
        let nows = [at(1, 0), at(15, 7), at(19, 23)];

        for interval in intervals {
            for now in nows {
                if !Recurring::is_valid(event, now, interval) {
                    continue;
                }
                let instants = generate(event, now, interval);
                let first = instants[0];
                assert!(first <= now);
                assert!(first > now - interval);
                assert!(instants.iter().all(|t| *t < event));
                assert!(instants.windows(2).all(|w| w[1] - w[0] == interval));
            }
        }
    }

    #[test]
    fn test_change_frequency_uses_edit_time() {
        let event = at(10, 10);
        let mut recurring = Recurring::new(Duration::days(1));
        let mut firing = FiringInstants::default();
        recurring.recompute(event, at(8, 10), &mut firing);

        recurring.change_frequency(Duration::hours(3), event, at(9, 23), &mut firing);

        assert_eq!(recurring.interval(), Duration::hours(3));
        let instants: Vec<_> = firing.iter().collect();
        assert_eq!(instants, vec![at(9, 22), at(10, 1), at(10, 4), at(10, 7)]);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::days(1)), "1D");
        assert_eq!(format_interval(Duration::days(14)), "14D");
        assert_eq!(format_interval(Duration::hours(36)), "36H");
        assert_eq!(format_interval(Duration::hours(3)), "3H");
        assert_eq!(format_interval(Duration::minutes(150)), "2H");
    }

    #[test]
    fn test_interval_serializes_as_seconds() {
        let recurring = Recurring::new(Duration::hours(2));
        let json = serde_json::to_string(&recurring).unwrap();
        assert_eq!(json, r#"{"interval":7200}"#);
        let back: Recurring = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recurring);
    }
}
