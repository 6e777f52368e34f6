//! Owner-defined recurring availability templates.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OwnerId, RuleId, TimeWindow, ValidationError};

use super::Slot;

/// Bounds for rule durations, in minutes.
pub const MIN_SLOT_MINUTES: u32 = 5;
pub const MAX_SLOT_MINUTES: u32 = 8 * 60;
pub const MAX_BUFFER_MINUTES: u32 = 4 * 60;

/// Which local dates a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Every week on the listed weekdays.
    Weekly { days: Vec<Weekday> },

    /// Every date in `[from, to]`, optionally restricted to some weekdays.
    /// An empty `days` list means every day in the range.
    DateRange {
        from: NaiveDate,
        to: NaiveDate,
        #[serde(default)]
        days: Vec<Weekday>,
    },
}

impl Recurrence {
    /// Every day of the week.
    pub fn daily() -> Self {
        Recurrence::Weekly {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }

    /// Monday through Friday.
    pub fn weekdays() -> Self {
        Recurrence::Weekly {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            Recurrence::Weekly { days } => days.contains(&date.weekday()),
            Recurrence::DateRange { from, to, days } => {
                *from <= date && date <= *to && (days.is_empty() || days.contains(&date.weekday()))
            }
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Recurrence::Weekly { days } if days.is_empty() => {
                Err(ValidationError::empty_field("recurrence.days"))
            }
            Recurrence::DateRange { from, to, .. } if from > to => Err(
                ValidationError::invalid_format("recurrence", "date range ends before it starts"),
            ),
            _ => Ok(()),
        }
    }
}

/// A recurring template: on matching dates, the owner is open between
/// `open_from` and `open_until` (local time in `timezone`) and offers
/// back-to-back slots of `slot_minutes`, each padded by the buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    #[serde(default)]
    pub id: RuleId,
    pub owner_id: OwnerId,
    pub recurrence: Recurrence,
    pub open_from: NaiveTime,
    pub open_until: NaiveTime,
    pub timezone: Tz,
    pub slot_minutes: u32,
    #[serde(default)]
    pub buffer_before_minutes: u32,
    #[serde(default)]
    pub buffer_after_minutes: u32,
}

impl AvailabilityRule {
    /// Creates a validated rule in UTC with no buffers.
    pub fn new(
        owner_id: OwnerId,
        recurrence: Recurrence,
        open_from: NaiveTime,
        open_until: NaiveTime,
        slot_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let rule = Self {
            id: RuleId::new(),
            owner_id,
            recurrence,
            open_from,
            open_until,
            timezone: Tz::UTC,
            slot_minutes,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Sets the buffers kept free before and after each slot.
    pub fn with_buffers(mut self, before_minutes: u32, after_minutes: u32) -> Result<Self, ValidationError> {
        self.buffer_before_minutes = before_minutes;
        self.buffer_after_minutes = after_minutes;
        self.validate()?;
        Ok(self)
    }

    /// Sets the time zone the daily hours are expressed in.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Checks every invariant of the rule. Also used for rules that
    /// arrive through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.recurrence.validate()?;
        if self.open_from >= self.open_until {
            return Err(ValidationError::invalid_format(
                "open_until",
                "daily window must end after it opens",
            ));
        }
        check_range("slot_minutes", self.slot_minutes, MIN_SLOT_MINUTES, MAX_SLOT_MINUTES)?;
        check_range("buffer_before_minutes", self.buffer_before_minutes, 0, MAX_BUFFER_MINUTES)?;
        check_range("buffer_after_minutes", self.buffer_after_minutes, 0, MAX_BUFFER_MINUTES)?;
        Ok(())
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }

    pub fn buffer_before(&self) -> Duration {
        Duration::minutes(i64::from(self.buffer_before_minutes))
    }

    pub fn buffer_after(&self) -> Duration {
        Duration::minutes(i64::from(self.buffer_after_minutes))
    }

    /// Expands the rule into every slot lying entirely inside `range`.
    ///
    /// Walks the local calendar dates that `range` touches in the rule's
    /// time zone. Each slot's footprint (slot plus buffers) must fit inside
    /// the day's open window; consecutive footprints are laid end to end.
    pub fn expand(&self, range: &TimeWindow) -> Vec<Slot> {
        let mut slots = Vec::new();
        let first = range.start().with_timezone(&self.timezone).date_naive();
        let last = range.end().with_timezone(&self.timezone).date_naive();

        for date in first.iter_days().take_while(|d| *d <= last) {
            if !self.recurrence.applies_on(date) {
                continue;
            }
            let Some(open) = self.open_window_on(date) else {
                continue;
            };
            self.fill_open_window(&open, range, &mut slots);
        }
        slots
    }

    fn open_window_on(&self, date: NaiveDate) -> Option<TimeWindow> {
        let start = resolve_local(self.timezone, date.and_time(self.open_from))?;
        let end = resolve_local(self.timezone, date.and_time(self.open_until))?;
        TimeWindow::new(start, end).ok()
    }

    fn fill_open_window(&self, open: &TimeWindow, range: &TimeWindow, out: &mut Vec<Slot>) {
        let (before, length, after) = (self.buffer_before(), self.slot_duration(), self.buffer_after());
        let mut cursor = open.start();
        while cursor + before + length + after <= open.end() {
            let start = cursor + before;
            let end = start + length;
            if let Ok(window) = TimeWindow::new(start, end) {
                if range.contains(&window) {
                    out.push(Slot::new(window, window.padded(before, after)));
                }
            }
            cursor = end + after;
        }
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::out_of_range(
            field,
            i64::from(min),
            i64::from(max),
            i64::from(value),
        ));
    }
    Ok(())
}

/// Maps a local wall-clock time to UTC. Ambiguous times (DST fall-back)
/// resolve to the earlier instant; nonexistent times (DST spring-forward)
/// move forward by an hour.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("owner-1").unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, m, 0).unwrap()
    }

    fn day_range(y: i32, mo: u32, d: u32) -> TimeWindow {
        TimeWindow::new(utc(y, mo, d, 0, 0), utc(y, mo, d, 0, 0) + Duration::days(1)).unwrap()
    }

    #[test]
    fn rejects_inverted_daily_window() {
        let result = AvailabilityRule::new(owner(), Recurrence::daily(), hm(17, 0), hm(9, 0), 30);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_slot_length() {
        let result = AvailabilityRule::new(owner(), Recurrence::daily(), hm(9, 0), hm(17, 0), 1);
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn rejects_empty_weekly_recurrence() {
        let result = AvailabilityRule::new(
            owner(),
            Recurrence::Weekly { days: vec![] },
            hm(9, 0),
            hm(17, 0),
            30,
        );
        assert!(result.is_err());
    }

    #[test]
    fn expands_back_to_back_slots_without_buffers() {
        let rule = AvailabilityRule::new(owner(), Recurrence::daily(), hm(9, 0), hm(17, 0), 30).unwrap();
        let slots = rule.expand(&day_range(2030, 3, 4));

        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].window().start(), utc(2030, 3, 4, 9, 0));
        assert_eq!(slots[1].window().start(), utc(2030, 3, 4, 9, 30));
        assert_eq!(slots[15].window().end(), utc(2030, 3, 4, 17, 0));
    }

    #[test]
    fn buffers_space_out_slots_and_fit_inside_open_window() {
        let rule = AvailabilityRule::new(owner(), Recurrence::daily(), hm(9, 0), hm(11, 0), 30)
            .unwrap()
            .with_buffers(10, 20)
            .unwrap();
        let slots = rule.expand(&day_range(2030, 3, 4));

        // footprints: 09:00-10:00, 10:00-11:00
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].window().start(), utc(2030, 3, 4, 9, 10));
        assert_eq!(slots[0].footprint().start(), utc(2030, 3, 4, 9, 0));
        assert_eq!(slots[0].footprint().end(), utc(2030, 3, 4, 10, 0));
        assert_eq!(slots[1].window().start(), utc(2030, 3, 4, 10, 10));
    }

    #[test]
    fn weekly_rule_skips_other_days() {
        // 2030-03-04 is a Monday
        let rule = AvailabilityRule::new(
            owner(),
            Recurrence::Weekly { days: vec![Weekday::Tue] },
            hm(9, 0),
            hm(10, 0),
            30,
        )
        .unwrap();
        assert!(rule.expand(&day_range(2030, 3, 4)).is_empty());
        assert_eq!(rule.expand(&day_range(2030, 3, 5)).len(), 2);
    }

    #[test]
    fn date_range_rule_is_bounded() {
        let from = NaiveDate::from_ymd_opt(2030, 3, 5).unwrap();
        let to = NaiveDate::from_ymd_opt(2030, 3, 6).unwrap();
        let rule = AvailabilityRule::new(
            owner(),
            Recurrence::DateRange { from, to, days: vec![] },
            hm(9, 0),
            hm(10, 0),
            60,
        )
        .unwrap();
        let week = TimeWindow::new(utc(2030, 3, 4, 0, 0), utc(2030, 3, 11, 0, 0)).unwrap();
        let slots = rule.expand(&week);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].window().start(), utc(2030, 3, 5, 9, 0));
        assert_eq!(slots[1].window().start(), utc(2030, 3, 6, 9, 0));
    }

    #[test]
    fn local_hours_are_normalized_to_utc() {
        let rule = AvailabilityRule::new(owner(), Recurrence::daily(), hm(9, 0), hm(10, 0), 60)
            .unwrap()
            .with_timezone(chrono_tz::America::New_York);
        // July: New York is UTC-4
        let range = TimeWindow::new(utc(2030, 7, 1, 0, 0), utc(2030, 7, 2, 0, 0)).unwrap();
        let slots = rule.expand(&range);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].window().start(), utc(2030, 7, 1, 13, 0));
    }

    #[test]
    fn slots_partially_outside_range_are_dropped() {
        let rule = AvailabilityRule::new(owner(), Recurrence::daily(), hm(9, 0), hm(12, 0), 60).unwrap();
        let range = TimeWindow::new(utc(2030, 3, 4, 9, 30), utc(2030, 3, 4, 12, 0)).unwrap();
        let starts: Vec<_> = rule.expand(&range).iter().map(|s| s.window().start()).collect();
        assert_eq!(starts, vec![utc(2030, 3, 4, 10, 0), utc(2030, 3, 4, 11, 0)]);
    }

    #[test]
    fn rule_round_trips_through_yaml() {
        let yaml = r#"
id: 6f1c6a8e-4a4e-4c8e-9a34-3f1b2d5c7e90
owner_id: ada
recurrence:
  kind: weekly
  days: [Mon, Wed]
open_from: "09:00:00"
open_until: "12:00:00"
timezone: Europe/Berlin
slot_minutes: 45
buffer_after_minutes: 15
"#;
        let rule: AvailabilityRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(rule.buffer_before_minutes, 0);
        assert!(rule.validate().is_ok());
    }
}
