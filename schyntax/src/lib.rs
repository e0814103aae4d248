//! schyntax — a compact syntax for recurring schedules.
//!
//! A schedule is one or more groups of constraints on the date, day of month,
//! day of week, hour, minute and second. Each group matches the instants that
//! satisfy all of its constraints; a schedule matches the instants any of its
//! groups match.
//!
//! # Examples
//!
//! ```
//! use jiff::civil::date;
//! use schyntax::Schedule;
//!
//! let schedule: Schedule = "hour(9..17), minute(0)".parse().unwrap();
//! let reference = date(2023, 3, 1).at(8, 30, 0, 0);
//!
//! assert_eq!(schedule.next_from(reference).unwrap(), date(2023, 3, 1).at(9, 0, 0, 0));
//! assert_eq!(schedule.previous_from(reference).unwrap(), date(2023, 2, 28).at(17, 0, 0, 0));
//! println!("{}", schedule); // "{hours(9..17), minutes(0), seconds(0)}"
//! ```

pub mod calendar;
pub mod display;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod model;
pub mod parser;

pub use error::ScheduleError;
pub use model::{DateValue, ExprKind, Group, Range, Rules};

use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::Zoned;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// A parsed schedule: the source text and its compiled groups.
///
/// Groups are immutable once parsed, so a `Schedule` can be shared freely
/// across threads and queried concurrently.
#[derive(Debug, Clone)]
pub struct Schedule {
    source: String,
    groups: Vec<Group>,
}

impl Schedule {
    /// Parse a schedule expression.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let groups = parser::parse(input)?;
        tracing::debug!(source = input, groups = groups.len(), "compiled schedule");
        Ok(Self {
            source: input.to_string(),
            groups,
        })
    }

    /// Whether `input` is a valid schedule expression.
    pub fn validate(input: &str) -> bool {
        parser::parse(input).is_ok()
    }

    /// The next instant strictly after the current UTC wall-clock time.
    pub fn next(&self) -> Result<DateTime, ScheduleError> {
        self.next_from(now())
    }

    /// The latest instant at or before the current UTC wall-clock time.
    pub fn previous(&self) -> Result<DateTime, ScheduleError> {
        self.previous_from(now())
    }

    /// The next instant strictly after `after`.
    pub fn next_from(&self, after: DateTime) -> Result<DateTime, ScheduleError> {
        eval::next_from(self, after)
    }

    /// The latest instant at or before `at_or_before`.
    pub fn previous_from(&self, at_or_before: DateTime) -> Result<DateTime, ScheduleError> {
        eval::previous_from(self, at_or_before)
    }

    /// Check if a datetime (to the second) matches this schedule.
    pub fn matches(&self, datetime: DateTime) -> bool {
        eval::matches(self, datetime)
    }

    /// The expression this schedule was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled groups, in order of appearance.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
}

fn now() -> DateTime {
    Zoned::now().with_time_zone(TimeZone::UTC).datetime()
}

/// Two schedules are equal when they compile to the same groups, however
/// they were written.
impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

impl Eq for Schedule {}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("source", &self.source)?;
        map.serialize_entry("groups", &self.groups)?;
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Deserialize from the expression string
        let s = String::deserialize(deserializer)?;
        Schedule::parse(&s).map_err(serde::de::Error::custom)
    }
}
