use std::fmt;

use crate::model::{DateValue, ExprKind, Group, Range, Rules};
use crate::Schedule;

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{}/{}/{}", year, self.month, self.day),
            None => write!(f, "{}/{}", self.month, self.day),
        }
    }
}

impl<T: fmt::Display + PartialEq> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end && !self.half_open && self.interval == 1 {
            return write!(f, "{}", self.start);
        }
        let op = if self.half_open { "..<" } else { ".." };
        write!(f, "{}{}{}", self.start, op, self.end)?;
        if self.interval > 1 {
            write!(f, "%{}", self.interval)?;
        }
        Ok(())
    }
}

/// Writes `name(a, b, !c)` for a non-empty rule set, preceded by a separator
/// unless it is the first expression of the group.
fn write_rules<T: fmt::Display + PartialEq>(
    f: &mut fmt::Formatter<'_>,
    kind: ExprKind,
    rules: &Rules<T>,
    first: &mut bool,
) -> fmt::Result {
    if rules.is_empty() {
        return Ok(());
    }
    if !*first {
        f.write_str(", ")?;
    }
    *first = false;

    write!(f, "{}(", kind.as_str())?;
    let args = rules
        .include
        .iter()
        .map(|r| (false, r))
        .chain(rules.exclude.iter().map(|r| (true, r)));
    for (i, (excluded, range)) in args.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if excluded {
            f.write_str("!")?;
        }
        write!(f, "{range}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        f.write_str("{")?;
        write_rules(f, ExprKind::Dates, &self.dates, &mut first)?;
        write_rules(f, ExprKind::DaysOfMonth, &self.days_of_month, &mut first)?;
        write_rules(f, ExprKind::DaysOfWeek, &self.days_of_week, &mut first)?;
        write_rules(f, ExprKind::Hours, &self.hours, &mut first)?;
        write_rules(f, ExprKind::Minutes, &self.minutes, &mut first)?;
        write_rules(f, ExprKind::Seconds, &self.seconds, &mut first)?;
        f.write_str("}")
    }
}

/// The canonical form: every group braced, implied defaults spelled out.
/// Parsing it yields the same compiled schedule.
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Schedule;

    fn canonical(input: &str) -> String {
        Schedule::parse(input).unwrap().to_string()
    }

    #[test]
    fn test_implied_defaults_are_spelled_out() {
        assert_eq!(canonical("hour(9..17)"), "{hours(9..17), minutes(0), seconds(0)}");
        assert_eq!(canonical("dom(1)"), "{dom(1), hours(0), minutes(0), seconds(0)}");
    }

    #[test]
    fn test_ranges_and_intervals() {
        assert_eq!(canonical("min(5..<10%2, 30)"), "{minutes(5..<10%2, 30), seconds(0)}");
        // wildcard compiles to the full domain
        assert_eq!(canonical("sec(*%15)"), "{seconds(0..59%15)}");
        // a start with an interval runs to the end of the domain
        assert_eq!(canonical("hour(6%4)"), "{hours(6..23%4), minutes(0), seconds(0)}");
    }

    #[test]
    fn test_exclusions_follow_inclusions() {
        assert_eq!(
            canonical("hour(!12, 9..17)"),
            "{hours(9..17, !12), minutes(0), seconds(0)}"
        );
    }

    #[test]
    fn test_dates_and_days_of_week() {
        assert_eq!(
            canonical("dates(12/24..1/2), dow(mon)"),
            "{dates(12/24..1/2), dow(2), hours(0), minutes(0), seconds(0)}"
        );
        assert_eq!(
            canonical("date(2020/2/29)"),
            "{dates(2020/2/29), hours(0), minutes(0), seconds(0)}"
        );
    }

    #[test]
    fn test_multiple_groups() {
        assert_eq!(
            canonical("{min(0)}, {sec(30)}"),
            "{minutes(0), seconds(0)}, {seconds(30)}"
        );
    }

    #[test]
    fn test_canonical_form_reparses_to_same_groups() {
        for input in [
            "hour(22..3), min(*%7)",
            "dom(-1..-3), dow(!sat, !sun)",
            "date(2/29..3/31%2)",
            "{hours(8..<12)}, {dates(2019/1/1..2019/3/1%3)}",
            "sec(!*%3)",
        ] {
            let first = Schedule::parse(input).unwrap();
            let second = Schedule::parse(&first.to_string()).unwrap();
            assert_eq!(first.groups(), second.groups(), "{input}");
        }
    }
}
