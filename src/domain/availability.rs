//! Mentor availability calendar.
//!
//! A mentor offers one-hour slots per calendar date. Each slot is either
//! absent (not offered), open (`true` on the wire) or booked (`"booked"`).
//! Slots only move forward: absent -> open -> booked. The mentor editor can
//! open and close free slots but never touches a booked one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::{macros::format_description, Date, Duration, OffsetDateTime};

const BOOKED: &str = "booked";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time slot `{0}`, expected a one-hour label such as \"09 - 10\"")]
    InvalidInterval(String),

    #[error("invalid availability value `{value}` for {date} {interval}")]
    InvalidSlotValue {
        date: String,
        interval: String,
        value: String,
    },

    #[error("the slot {date} {interval} is not open for booking")]
    SlotNotOpen { date: Date, interval: Interval },

    #[error("the slot {date} {interval} is already booked")]
    SlotBooked { date: Date, interval: Interval },

    #[error("{0} is in the past")]
    InPast(String),
}

/// Parse an ISO calendar date (`2025-05-01`).
pub fn parse_date(raw: &str) -> Result<Date, AvailabilityError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AvailabilityError::InvalidDate(raw.to_string()))
}

pub fn format_date(date: Date) -> String {
    // Formatting a plain year-month-day description cannot fail for a valid Date.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// One of the 24 fixed one-hour intervals of a day, labelled `"HH - HH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval(u8);

impl Interval {
    pub fn from_start_hour(hour: u8) -> Option<Self> {
        (hour < 24).then_some(Self(hour))
    }

    pub fn start_hour(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Interval> {
        (0..24).map(Interval)
    }

    pub fn label(self) -> String {
        format!("{:02} - {:02}", self.0, self.0 + 1)
    }

    /// Start and end of this interval on `date`, always in UTC.
    ///
    /// Fails when the end falls past the last representable date.
    pub fn window(self, date: Date) -> Result<(OffsetDateTime, OffsetDateTime), AvailabilityError> {
        let start = date
            .midnight()
            .assume_utc()
            .checked_add(Duration::hours(i64::from(self.0)));
        match start.and_then(|start| Some((start, start.checked_add(Duration::HOUR)?))) {
            Some(window) => Ok(window),
            None => Err(AvailabilityError::InvalidDate(format!("{} {}", format_date(date), self))),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02} - {:02}", self.0, self.0 + 1)
    }
}

impl FromStr for Interval {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AvailabilityError::InvalidInterval(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start: u8 = start.trim().parse().map_err(|_| invalid())?;
        let end: u8 = end.trim().parse().map_err(|_| invalid())?;
        if start >= 24 || end != start + 1 {
            return Err(invalid());
        }
        Ok(Self(start))
    }
}

impl Serialize for Interval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Open,
    Booked,
}

impl SlotStatus {
    fn to_value(self) -> Value {
        match self {
            SlotStatus::Open => Value::Bool(true),
            SlotStatus::Booked => Value::String(BOOKED.to_string()),
        }
    }
}

/// `true` for open, `"booked"` for booked, as in the stored map.
impl Serialize for SlotStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

type RawAvailability = BTreeMap<String, BTreeMap<String, Value>>;

/// The full availability calendar of one mentor.
///
/// Serialized as `{"2025-05-01": {"10 - 11": true, "11 - 12": "booked"}}`.
/// `false` and `null` are accepted on input and mean "not offered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAvailability", into = "RawAvailability")]
pub struct AvailabilityMap {
    days: BTreeMap<Date, BTreeMap<Interval, SlotStatus>>,
}

impl AvailabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn status(&self, date: Date, interval: Interval) -> Option<SlotStatus> {
        self.days.get(&date)?.get(&interval).copied()
    }

    /// Intervals of `date` that can still be booked.
    pub fn open_intervals(&self, date: Date) -> Vec<Interval> {
        self.days
            .get(&date)
            .map(|day| {
                day.iter()
                    .filter(|(_, status)| **status == SlotStatus::Open)
                    .map(|(interval, _)| *interval)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dates offered for booking: those whose midnight (UTC) lies after `now`.
    pub fn future_dates(&self, now: OffsetDateTime) -> Vec<Date> {
        self.days
            .keys()
            .filter(|date| date.midnight().assume_utc() > now)
            .copied()
            .collect()
    }

    /// Mark an open slot as booked. Anything other than an open slot,
    /// including a date the mentor never offered, is rejected and leaves the
    /// map untouched.
    pub fn mark_booked(&mut self, date: Date, interval: Interval) -> Result<(), AvailabilityError> {
        match self.days.get_mut(&date).and_then(|day| day.get_mut(&interval)) {
            Some(status @ SlotStatus::Open) => {
                *status = SlotStatus::Booked;
                Ok(())
            }
            _ => Err(AvailabilityError::SlotNotOpen { date, interval }),
        }
    }

    /// Copy of this map with one slot booked.
    pub fn with_booked(&self, date: Date, interval: Interval) -> Result<Self, AvailabilityError> {
        let mut next = self.clone();
        next.mark_booked(date, interval)?;
        Ok(next)
    }

    /// Flip a single slot between not offered and open. Returns the new status.
    pub fn toggle(
        &mut self,
        date: Date,
        interval: Interval,
        now: OffsetDateTime,
    ) -> Result<Option<SlotStatus>, AvailabilityError> {
        let (start, _) = interval.window(date)?;
        if start < now {
            return Err(AvailabilityError::InPast(format!("{} {}", format_date(date), interval)));
        }

        if self.status(date, interval) == Some(SlotStatus::Booked) {
            return Err(AvailabilityError::SlotBooked { date, interval });
        }

        let day = self.days.entry(date).or_default();
        let next = if day.remove(&interval).is_some() {
            None
        } else {
            day.insert(interval, SlotStatus::Open);
            Some(SlotStatus::Open)
        };

        if day.is_empty() {
            self.days.remove(&date);
        }
        Ok(next)
    }

    /// Apply the mentor's edit of a whole day.
    ///
    /// Booked slots and intervals that already started keep their current
    /// value regardless of the edit.
    pub fn apply_day_edit(
        &mut self,
        date: Date,
        edits: &BTreeMap<Interval, bool>,
        now: OffsetDateTime,
    ) -> Result<(), AvailabilityError> {
        if date < now.date() {
            return Err(AvailabilityError::InPast(format_date(date)));
        }

        let mut windows = BTreeMap::new();
        for interval in edits.keys() {
            windows.insert(*interval, interval.window(date)?);
        }

        let day = self.days.entry(date).or_default();
        for (interval, open) in edits {
            if day.get(interval) == Some(&SlotStatus::Booked) {
                continue;
            }
            let started = windows.get(interval).is_some_and(|(start, _)| *start < now);
            if started {
                continue;
            }
            if *open {
                day.insert(*interval, SlotStatus::Open);
            } else {
                day.remove(interval);
            }
        }

        if day.is_empty() {
            self.days.remove(&date);
        }
        Ok(())
    }
}

impl TryFrom<RawAvailability> for AvailabilityMap {
    type Error = AvailabilityError;

    fn try_from(raw: RawAvailability) -> Result<Self, Self::Error> {
        let mut days = BTreeMap::new();
        for (raw_date, raw_day) in raw {
            let date = parse_date(&raw_date)?;
            let mut day = BTreeMap::new();
            for (raw_interval, value) in raw_day {
                let interval: Interval = raw_interval.parse()?;
                let status = match &value {
                    Value::Bool(true) => SlotStatus::Open,
                    Value::String(s) if s == BOOKED => SlotStatus::Booked,
                    Value::Bool(false) | Value::Null => continue,
                    other => {
                        return Err(AvailabilityError::InvalidSlotValue {
                            date: raw_date.clone(),
                            interval: raw_interval.clone(),
                            value: other.to_string(),
                        });
                    }
                };
                day.insert(interval, status);
            }
            if !day.is_empty() {
                days.insert(date, day);
            }
        }
        Ok(Self { days })
    }
}

impl From<AvailabilityMap> for RawAvailability {
    fn from(map: AvailabilityMap) -> Self {
        map.days
            .into_iter()
            .map(|(date, day)| {
                let slots = day
                    .into_iter()
                    .map(|(interval, status)| (interval.label(), status.to_value()))
                    .collect();
                (format_date(date), slots)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn map(value: Value) -> AvailabilityMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn interval_labels_cover_the_day() {
        let labels: Vec<String> = Interval::all().map(Interval::label).collect();
        assert_eq!(labels.len(), 24);
        assert_eq!(labels[0], "00 - 01");
        assert_eq!(labels[9], "09 - 10");
        assert_eq!(labels[23], "23 - 24");
    }

    #[test]
    fn interval_rejects_malformed_labels() {
        for bad in ["10 - 12", "24 - 25", "ten - eleven", "10", "", "11 - 10"] {
            assert!(bad.parse::<Interval>().is_err(), "{bad} should not parse");
        }
        assert_eq!("10-11".parse::<Interval>().unwrap().start_hour(), 10);
    }

    #[test]
    fn window_is_one_hour_in_utc() {
        let interval: Interval = "10 - 11".parse().unwrap();
        let (start, end) = interval.window(date!(2025 - 05 - 01)).unwrap();
        assert_eq!(start, datetime!(2025-05-01 10:00 UTC));
        assert_eq!(end, datetime!(2025-05-01 11:00 UTC));
    }

    #[test]
    fn last_interval_ends_at_next_midnight() {
        let interval: Interval = "23 - 24".parse().unwrap();
        let (_, end) = interval.window(date!(2025 - 05 - 01)).unwrap();
        assert_eq!(end, datetime!(2025-05-02 00:00 UTC));
    }

    #[test]
    fn last_representable_date_has_no_closing_window() {
        let date = parse_date("9999-12-31").unwrap();
        let last: Interval = "23 - 24".parse().unwrap();
        let now = datetime!(2025-05-01 10:00 UTC);

        assert!(matches!(last.window(date), Err(AvailabilityError::InvalidDate(_))));
        assert!("22 - 23".parse::<Interval>().unwrap().window(date).is_ok());

        let mut availability = AvailabilityMap::new();
        assert!(matches!(
            availability.toggle(date, last, now),
            Err(AvailabilityError::InvalidDate(_))
        ));
        let edits = BTreeMap::from([("22 - 23".parse().unwrap(), true), (last, true)]);
        assert!(matches!(
            availability.apply_day_edit(date, &edits, now),
            Err(AvailabilityError::InvalidDate(_))
        ));
        assert!(availability.is_empty());
    }

    #[test]
    fn booking_an_open_slot_marks_only_that_slot() {
        let availability = map(json!({
            "2025-05-01": { "10 - 11": true, "11 - 12": true },
            "2025-05-02": { "09 - 10": true }
        }));
        let booked = availability
            .with_booked(date!(2025 - 05 - 01), "10 - 11".parse().unwrap())
            .unwrap();

        assert_eq!(
            serde_json::to_value(&booked).unwrap(),
            json!({
                "2025-05-01": { "10 - 11": "booked", "11 - 12": true },
                "2025-05-02": { "09 - 10": true }
            })
        );
    }

    #[test]
    fn booking_requires_an_open_slot() {
        let mut availability = map(json!({ "2025-05-01": { "10 - 11": "booked" } }));
        let before = availability.clone();

        let booked_again =
            availability.mark_booked(date!(2025 - 05 - 01), "10 - 11".parse().unwrap());
        assert!(matches!(booked_again, Err(AvailabilityError::SlotNotOpen { .. })));

        let never_offered =
            availability.mark_booked(date!(2025 - 05 - 01), "12 - 13".parse().unwrap());
        assert!(matches!(never_offered, Err(AvailabilityError::SlotNotOpen { .. })));

        let unknown_date =
            availability.mark_booked(date!(2025 - 06 - 01), "12 - 13".parse().unwrap());
        assert!(matches!(unknown_date, Err(AvailabilityError::SlotNotOpen { .. })));

        assert_eq!(availability, before);
    }

    #[test]
    fn false_and_null_mean_not_offered() {
        let availability = map(json!({
            "2025-05-01": { "10 - 11": false, "11 - 12": null, "12 - 13": true },
            "2025-05-02": { "09 - 10": false }
        }));
        assert_eq!(
            serde_json::to_value(&availability).unwrap(),
            json!({ "2025-05-01": { "12 - 13": true } })
        );
    }

    #[test]
    fn rejects_unknown_slot_values() {
        let err = serde_json::from_value::<AvailabilityMap>(json!({
            "2025-05-01": { "10 - 11": "maybe" }
        }));
        assert!(err.is_err());

        let err = serde_json::from_value::<AvailabilityMap>(json!({
            "01/05/2025": { "10 - 11": true }
        }));
        assert!(err.is_err());
    }

    #[test]
    fn toggle_flips_free_slots_and_refuses_booked_ones() {
        let now = datetime!(2025-04-30 12:00 UTC);
        let day = date!(2025 - 05 - 01);
        let mut availability = map(json!({ "2025-05-01": { "11 - 12": "booked" } }));

        let ten: Interval = "10 - 11".parse().unwrap();
        assert_eq!(availability.toggle(day, ten, now).unwrap(), Some(SlotStatus::Open));
        assert_eq!(availability.toggle(day, ten, now).unwrap(), None);

        let eleven: Interval = "11 - 12".parse().unwrap();
        assert!(matches!(
            availability.toggle(day, eleven, now),
            Err(AvailabilityError::SlotBooked { .. })
        ));
        assert_eq!(availability.status(day, eleven), Some(SlotStatus::Booked));
    }

    #[test]
    fn toggle_refuses_past_slots() {
        let now = datetime!(2025-05-01 10:30 UTC);
        let mut availability = AvailabilityMap::new();
        let result = availability.toggle(date!(2025 - 05 - 01), "10 - 11".parse().unwrap(), now);
        assert!(matches!(result, Err(AvailabilityError::InPast(_))));
        assert!(availability.is_empty());
    }

    #[test]
    fn day_edit_keeps_booked_and_started_slots() {
        let now = datetime!(2025-05-01 10:30 UTC);
        let day = date!(2025 - 05 - 01);
        let mut availability = map(json!({
            "2025-05-01": { "09 - 10": true, "12 - 13": "booked", "14 - 15": true }
        }));

        let edits: BTreeMap<Interval, bool> = [
            ("09 - 10", false),
            ("12 - 13", false),
            ("14 - 15", false),
            ("15 - 16", true),
        ]
        .into_iter()
        .map(|(label, open)| (label.parse().unwrap(), open))
        .collect();

        availability.apply_day_edit(day, &edits, now).unwrap();

        assert_eq!(
            serde_json::to_value(&availability).unwrap(),
            json!({
                "2025-05-01": { "09 - 10": true, "12 - 13": "booked", "15 - 16": true }
            })
        );
    }

    #[test]
    fn day_edit_refuses_past_dates() {
        let now = datetime!(2025-05-02 08:00 UTC);
        let mut availability = AvailabilityMap::new();
        let result = availability.apply_day_edit(date!(2025 - 05 - 01), &BTreeMap::new(), now);
        assert!(matches!(result, Err(AvailabilityError::InPast(_))));
    }

    #[test]
    fn future_dates_and_open_intervals() {
        let availability = map(json!({
            "2025-04-30": { "10 - 11": true },
            "2025-05-01": { "10 - 11": true, "11 - 12": "booked", "08 - 09": true }
        }));
        let now = datetime!(2025-04-30 09:00 UTC);
        assert_eq!(availability.future_dates(now), vec![date!(2025 - 05 - 01)]);

        let open: Vec<String> = availability
            .open_intervals(date!(2025 - 05 - 01))
            .into_iter()
            .map(Interval::label)
            .collect();
        assert_eq!(open, vec!["08 - 09", "10 - 11"]);
    }
}
