// Hand-rolled recursive descent parser for schyntax expressions.
//
// program    = ( group | expression ) { [","] ( group | expression ) } EOF
// group      = "{" expression { [","] expression } "}"
// expression = word "(" argument { [","] argument } ")"
// argument   = ["!"] ( "*" | value [ (".." | "..<") value ] ) [ "%" integer ]
// value      = integer | day_of_week_word | date
// date       = integer "/" integer [ "/" integer ]

use crate::calendar::{days_in_month, DEFAULT_LEAP_YEAR};
use crate::error::{ScheduleError, Span};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::model::{
    day_of_week_literal, DateValue, ExprKind, Group, Range, Rules, MAX_YEAR, MIN_YEAR,
};

const EMPTY_SCHEDULE: &str = "schedule must contain at least one expression";

/// An argument as written, before it is compiled into a [`Range`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Argument<T> {
    excluded: bool,
    value: ArgValue<T>,
    interval: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArgValue<T> {
    Wildcard,
    Range {
        start: T,
        end: Option<T>,
        half_open: bool,
    },
}

impl<T: Copy> Argument<T> {
    /// Compile into a range over the domain `min..=max`.
    ///
    /// A single value with an interval runs to the end of the domain, so
    /// `minute(5%10)` means 5, 15, ..., 55 rather than just 5.
    fn compile(&self, min: T, max: T) -> Range<T> {
        let interval = self.interval.unwrap_or(1);
        match self.value {
            ArgValue::Wildcard => Range::new(min, max, false, interval),
            ArgValue::Range {
                start,
                end: Some(end),
                half_open,
            } => Range::new(start, end, half_open, interval),
            ArgValue::Range {
                start, end: None, ..
            } if self.interval.is_some() => Range::new(start, max, false, interval),
            ArgValue::Range {
                start, end: None, ..
            } => Range::single(start),
        }
    }
}

/// Parser state: a lazy token stream with one token of lookahead.
struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    next: Token<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
            next: Token::end_of_input(input),
        }
    }

    // --- Basic parse utils ---

    /// Move to the next token and return the previous lookahead.
    fn advance(&mut self) -> Result<Token<'a>, ScheduleError> {
        let upcoming = match self.lexer.next() {
            Some(tok) => tok?,
            None => Token::end_of_input(self.input),
        };
        Ok(std::mem::replace(&mut self.next, upcoming))
    }

    fn is_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>, ScheduleError> {
        if self.is_next(kind) {
            self.advance()
        } else {
            Err(self.wrong_token(&[kind]))
        }
    }

    fn optional(&mut self, kind: TokenKind) -> Result<Option<Token<'a>>, ScheduleError> {
        if self.is_next(kind) {
            self.advance().map(Some)
        } else {
            Ok(None)
        }
    }

    fn error(&self, message: String, span: Span) -> ScheduleError {
        ScheduleError::syntax(message, span, self.input)
    }

    fn wrong_token(&self, expected: &[TokenKind]) -> ScheduleError {
        let names: Vec<&str> = expected.iter().map(|k| k.describe()).collect();
        let expected = match names.as_slice() {
            [one] => one.to_string(),
            many => format!("one of {}", many.join(", ")),
        };
        self.error(
            format!(
                "unexpected {} at index {}, expected {expected}",
                self.next.kind.describe(),
                self.next.span.start
            ),
            self.next.span,
        )
    }

    fn integer(&self, tok: &Token<'a>) -> Result<i64, ScheduleError> {
        tok.text
            .parse()
            .map_err(|_| self.error(format!("integer {} is out of range", tok.text), tok.span))
    }

    // --- Grammar productions ---

    fn parse_program(&mut self) -> Result<Vec<Group>, ScheduleError> {
        let mut groups = Vec::new();
        // All loose expressions share one group, placed where the first one appears.
        let mut loose: Option<usize> = None;

        while !self.is_next(TokenKind::EndOfInput) {
            match self.next.kind {
                TokenKind::OpenBrace => groups.push(self.parse_group()?),
                TokenKind::Word => {
                    let index = *loose.get_or_insert_with(|| {
                        groups.push(Group::default());
                        groups.len() - 1
                    });
                    self.parse_expression(&mut groups[index])?;
                }
                _ => return Err(self.wrong_token(&[TokenKind::OpenBrace, TokenKind::Word])),
            }
            self.optional(TokenKind::Comma)?;
        }

        if groups.is_empty() {
            return Err(ScheduleError::invalid_schedule(EMPTY_SCHEDULE));
        }

        for group in &mut groups {
            group.apply_implied_defaults();
        }
        Ok(groups)
    }

    fn parse_group(&mut self) -> Result<Group, ScheduleError> {
        let mut group = Group::default();
        self.expect(TokenKind::OpenBrace)?;

        if self.is_next(TokenKind::CloseBrace) {
            return Err(ScheduleError::invalid_schedule(EMPTY_SCHEDULE));
        }

        while !self.is_next(TokenKind::CloseBrace) {
            self.parse_expression(&mut group)?;
            self.optional(TokenKind::Comma)?;
        }

        self.expect(TokenKind::CloseBrace)?;
        Ok(group)
    }

    fn parse_expression(&mut self, group: &mut Group) -> Result<(), ScheduleError> {
        let name = self.expect(TokenKind::Word)?;
        let kind = ExprKind::from_alias(name.text).ok_or_else(|| {
            self.error(
                format!("expression type '{}' is not supported", name.text),
                name.span,
            )
        })?;

        self.expect(TokenKind::OpenParen)?;

        loop {
            match kind {
                ExprKind::Dates => self.parse_date_argument(&mut group.dates)?,
                ExprKind::DaysOfMonth => {
                    self.parse_integer_argument(kind, (1, 31), &mut group.days_of_month)?
                }
                ExprKind::DaysOfWeek => {
                    self.parse_integer_argument(kind, (1, 7), &mut group.days_of_week)?
                }
                ExprKind::Hours => self.parse_integer_argument(kind, (0, 23), &mut group.hours)?,
                ExprKind::Minutes => {
                    self.parse_integer_argument(kind, (0, 59), &mut group.minutes)?
                }
                ExprKind::Seconds => {
                    self.parse_integer_argument(kind, (0, 59), &mut group.seconds)?
                }
            }

            self.optional(TokenKind::Comma)?;
            if self.is_next(TokenKind::CloseParen) {
                break;
            }
        }

        self.expect(TokenKind::CloseParen)?;
        Ok(())
    }

    fn parse_date_argument(&mut self, rules: &mut Rules<DateValue>) -> Result<(), ScheduleError> {
        let arg = self.parse_argument(Self::parse_date, check_date_range)?;
        let last = match arg.value {
            ArgValue::Range { start, .. } => DateValue::last(start.is_full()),
            ArgValue::Wildcard => DateValue::last(false),
        };
        rules.push(arg.compile(DateValue::first(), last), arg.excluded);
        Ok(())
    }

    /// Parse one integer argument over the inclusive domain `min..=max`.
    fn parse_integer_argument(
        &mut self,
        kind: ExprKind,
        (min, max): (i32, i32),
        rules: &mut Rules<i32>,
    ) -> Result<(), ScheduleError> {
        let arg = self.parse_argument(|p| p.parse_integer_value(kind, min, max), |_, _| None)?;
        rules.push(arg.compile(min, max), arg.excluded);
        Ok(())
    }

    fn parse_argument<T: Copy + PartialEq>(
        &mut self,
        mut value: impl FnMut(&mut Self) -> Result<T, ScheduleError>,
        check_range: fn(&T, &T) -> Option<&'static str>,
    ) -> Result<Argument<T>, ScheduleError> {
        let first = self.next.span;

        let excluded = self.optional(TokenKind::Not)?.is_some();

        let value = if self.optional(TokenKind::Wildcard)?.is_some() {
            ArgValue::Wildcard
        } else {
            self.parse_range(&mut value, check_range)?
        };

        let interval = match self.optional(TokenKind::Interval)? {
            Some(_) => Some(self.parse_interval()?),
            None => None,
        };

        if value == ArgValue::Wildcard && excluded && interval.is_none() {
            return Err(self.error(
                "wildcards can't be excluded with '!' unless they have an interval (%)".into(),
                first,
            ));
        }

        Ok(Argument {
            excluded,
            value,
            interval,
        })
    }

    fn parse_range<T: Copy + PartialEq>(
        &mut self,
        value: &mut impl FnMut(&mut Self) -> Result<T, ScheduleError>,
        check_range: fn(&T, &T) -> Option<&'static str>,
    ) -> Result<ArgValue<T>, ScheduleError> {
        let first = self.next.span;
        let start = value(self)?;

        let half_open = if self.optional(TokenKind::RangeInclusive)?.is_some() {
            Some(false)
        } else if self.optional(TokenKind::RangeHalfOpen)?.is_some() {
            Some(true)
        } else {
            None
        };

        let Some(half_open) = half_open else {
            return Ok(ArgValue::Range {
                start,
                end: None,
                half_open: false,
            });
        };

        let end = value(self)?;
        if half_open && start == end {
            return Err(self.error(
                "start and end values of a half-open range cannot be equal".into(),
                first,
            ));
        }
        if let Some(message) = check_range(&start, &end) {
            return Err(self.error(message.into(), first));
        }

        Ok(ArgValue::Range {
            start,
            end: Some(end),
            half_open,
        })
    }

    fn parse_interval(&mut self) -> Result<u32, ScheduleError> {
        let tok = self.expect(TokenKind::Integer)?;
        let interval = self.integer(&tok)?;
        if interval <= 0 {
            return Err(self.error(format!("{interval} is not a valid interval"), tok.span));
        }
        u32::try_from(interval)
            .map_err(|_| self.error(format!("interval {interval} is too large"), tok.span))
    }

    fn parse_integer_value(
        &mut self,
        kind: ExprKind,
        min: i32,
        max: i32,
    ) -> Result<i32, ScheduleError> {
        if kind == ExprKind::DaysOfWeek && self.is_next(TokenKind::Word) {
            return self.parse_day_of_week();
        }
        if !self.is_next(TokenKind::Integer) {
            return Err(if kind == ExprKind::DaysOfWeek {
                self.wrong_token(&[TokenKind::Integer, TokenKind::Word])
            } else {
                self.wrong_token(&[TokenKind::Integer])
            });
        }

        let tok = self.advance()?;
        let value = self.integer(&tok)?;
        let in_domain = |v: i64| (i64::from(min)..=i64::from(max)).contains(&v);

        if in_domain(value) || (kind.allows_negative() && value < 0 && in_domain(-value)) {
            // Bounded by the domain check above.
            Ok(value as i32)
        } else {
            Err(self.error(
                format!("value cannot be {value}: must be between {min} and {max}"),
                tok.span,
            ))
        }
    }

    fn parse_day_of_week(&mut self) -> Result<i32, ScheduleError> {
        let tok = self.expect(TokenKind::Word)?;
        day_of_week_literal(tok.text).ok_or_else(|| {
            self.error(
                format!("unknown integer or day-of-week literal '{}'", tok.text),
                tok.span,
            )
        })
    }

    fn parse_date(&mut self) -> Result<DateValue, ScheduleError> {
        let first = self.next.span;

        let a = self.expect(TokenKind::Integer)?;
        self.expect(TokenKind::Slash)?;
        let b = self.expect(TokenKind::Integer)?;
        let c = match self.optional(TokenKind::Slash)? {
            Some(_) => Some(self.expect(TokenKind::Integer)?),
            None => None,
        };

        let (year, month, day) = match c {
            Some(c) => (Some(self.integer(&a)?), self.integer(&b)?, self.integer(&c)?),
            None => (None, self.integer(&a)?, self.integer(&b)?),
        };

        let year = match year {
            Some(y) if !(i64::from(MIN_YEAR)..=i64::from(MAX_YEAR)).contains(&y) => {
                return Err(self.error(
                    format!("year {y} is not valid: must be between {MIN_YEAR} and {MAX_YEAR}"),
                    first,
                ));
            }
            Some(y) => Some(y as i16),
            None => None,
        };

        if !(1..=12).contains(&month) {
            return Err(self.error(
                format!("month {month} is not valid: must be between 1 and 12"),
                first,
            ));
        }
        let month = month as i8;

        // Without a year, validate against a leap year so 2/29 is allowed.
        let days = days_in_month(year.unwrap_or(DEFAULT_LEAP_YEAR), month).unwrap_or(31);
        if !(1..=i64::from(days)).contains(&day) {
            return Err(self.error(
                format!("{day} is not a valid day for the month specified: must be between 1 and {days}"),
                first,
            ));
        }

        Ok(DateValue {
            year,
            month,
            day: day as i8,
        })
    }
}

/// Date ranges must not mix full and partial dates, and full ranges must run forward.
fn check_date_range(start: &DateValue, end: &DateValue) -> Option<&'static str> {
    if !start.is_full() && !end.is_full() {
        return None;
    }
    if start.is_full() != end.is_full() {
        return Some("cannot mix full and partial dates in a date range");
    }
    if start > end {
        return Some("end date of range is before the start date");
    }
    None
}

/// Parse a schyntax program into its groups, with implied defaults applied.
pub fn parse(input: &str) -> Result<Vec<Group>, ScheduleError> {
    let mut parser = Parser::new(input);
    // Prime the lookahead.
    parser.advance()?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> Group {
        let groups = parse(input).unwrap();
        assert_eq!(groups.len(), 1, "expected one group for '{input}'");
        groups.into_iter().next().unwrap()
    }

    fn syntax_index(input: &str) -> usize {
        match parse(input) {
            Err(ScheduleError::Syntax { span, .. }) => span.start,
            other => panic!("expected syntax error for '{input}', got {other:?}"),
        }
    }

    fn is_invalid_schedule(input: &str) -> bool {
        matches!(parse(input), Err(ScheduleError::InvalidSchedule { .. }))
    }

    #[test]
    fn test_hours_range_with_defaults() {
        let g = single("hour(9..17)");
        assert_eq!(g.hours.include, vec![Range::new(9, 17, false, 1)]);
        assert_eq!(g.minutes.include, vec![Range::single(0)]);
        assert_eq!(g.seconds.include, vec![Range::single(0)]);
        assert!(g.days_of_week.is_empty());
    }

    #[test]
    fn test_minutes_only_pins_seconds() {
        let g = single("min(*%15)");
        assert_eq!(g.minutes.include, vec![Range::new(0, 59, false, 15)]);
        assert_eq!(g.seconds.include, vec![Range::single(0)]);
        assert!(g.hours.is_empty());
    }

    #[test]
    fn test_interval_without_end_runs_to_max() {
        let g = single("minute(10%15)");
        assert_eq!(g.minutes.include, vec![Range::new(10, 59, false, 15)]);
    }

    #[test]
    fn test_half_open_range() {
        let g = single("sec(0..<30)");
        assert_eq!(g.seconds.include, vec![Range::new(0, 30, true, 1)]);
        assert!(g.minutes.is_empty());
    }

    #[test]
    fn test_exclusions() {
        let g = single("hours(*, !12), min(!*%3)");
        assert_eq!(g.hours.include, vec![Range::new(0, 23, false, 1)]);
        assert_eq!(g.hours.exclude, vec![Range::single(12)]);
        assert_eq!(g.minutes.exclude, vec![Range::new(0, 59, false, 3)]);
        assert_eq!(g.seconds.include, vec![Range::single(0)]);
    }

    #[test]
    fn test_day_of_week_names() {
        let g = single("dow(mon..fri, SU, thurs)");
        assert_eq!(
            g.days_of_week.include,
            vec![
                Range::new(2, 6, false, 1),
                Range::single(1),
                Range::single(5)
            ]
        );
        assert_eq!(g.hours.include, vec![Range::single(0)]);
    }

    #[test]
    fn test_negative_day_of_month() {
        let g = single("dom(-1, -7..-1, 1..-10)");
        assert_eq!(
            g.days_of_month.include,
            vec![
                Range::single(-1),
                Range::new(-7, -1, false, 1),
                Range::new(1, -10, false, 1)
            ]
        );
    }

    #[test]
    fn test_negative_only_for_day_of_month() {
        assert_eq!(syntax_index("hour(-1)"), 5);
        assert_eq!(syntax_index("dom(-32)"), 4);
        assert_eq!(syntax_index("dom(0)"), 4);
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(syntax_index("dow(0)"), 4);
        assert_eq!(syntax_index("dow(8)"), 4);
        assert_eq!(syntax_index("hours(24)"), 6);
        assert_eq!(syntax_index("minutes(60)"), 8);
        assert_eq!(syntax_index("seconds(1..60)"), 11);
        assert_eq!(syntax_index("dom(32)"), 4);
        assert_eq!(syntax_index("min(99999999999999999999)"), 4);
    }

    #[test]
    fn test_dates_partial_and_full() {
        let g = single("dates(12/24..1/2, 2020/3/1)");
        assert_eq!(
            g.dates.include,
            vec![
                Range::new(DateValue::partial(12, 24), DateValue::partial(1, 2), false, 1),
                Range::single(DateValue::full(2020, 3, 1)),
            ]
        );
        assert_eq!(g.hours.include, vec![Range::single(0)]);
    }

    #[test]
    fn test_date_wildcard_and_interval() {
        let g = single("date(*%7)");
        assert_eq!(
            g.dates.include,
            vec![Range::new(
                DateValue::partial(1, 1),
                DateValue::partial(12, 31),
                false,
                7
            )]
        );

        let g = single("date(3/1%2)");
        assert_eq!(g.dates.include[0].end, DateValue::partial(12, 31));

        let g = single("date(2020/3/1%2)");
        assert_eq!(g.dates.include[0].end, DateValue::full(2200, 12, 31));
    }

    #[test]
    fn test_leap_day_validation() {
        assert_eq!(syntax_index("date(2015/2/29)"), 5);
        assert!(parse("date(2000/2/29)").is_ok());
        assert!(parse("date(2/29)").is_ok());
        assert_eq!(syntax_index("date(2/30)"), 5);
        assert_eq!(syntax_index("date(13/1)"), 5);
        assert_eq!(syntax_index("date(4/31)"), 5);
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(syntax_index("date(1899/1/1)"), 5);
        assert_eq!(syntax_index("date(2201/1/1)"), 5);
        assert!(parse("date(1900/1/1..2200/12/31)").is_ok());
    }

    #[test]
    fn test_date_range_validation() {
        // mixed full and partial
        assert_eq!(syntax_index("date(2020/1/1..2/1)"), 5);
        assert_eq!(syntax_index("date(1/1..2020/2/1)"), 5);
        // full range running backwards
        assert_eq!(syntax_index("date(2021/1/1..2020/1/1)"), 5);
        // partial ranges may wrap
        assert!(parse("date(12/1..1/1)").is_ok());
    }

    #[test]
    fn test_half_open_equal_endpoints() {
        assert_eq!(syntax_index("hour(5..<5)"), 5);
        assert_eq!(syntax_index("date(1/1..<1/1)"), 5);
        assert!(parse("hour(5..5)").is_ok());
    }

    #[test]
    fn test_excluded_wildcard_requires_interval() {
        assert_eq!(syntax_index("min(!*)"), 4);
        assert!(parse("min(!*%3)").is_ok());
    }

    #[test]
    fn test_invalid_intervals() {
        assert_eq!(syntax_index("min(*%0)"), 6);
        assert_eq!(syntax_index("min(*%-5)"), 6);
        assert_eq!(syntax_index("min(*%)"), 6);
    }

    #[test]
    fn test_unknown_expression() {
        assert_eq!(syntax_index("hour(1) month(2)"), 8);
    }

    #[test]
    fn test_unknown_day_literal() {
        assert_eq!(syntax_index("dow(funday)"), 4);
        // words are only valid for day of week
        assert_eq!(syntax_index("hour(mon)"), 5);
    }

    #[test]
    fn test_empty_schedules_are_structural() {
        assert!(is_invalid_schedule(""));
        assert!(is_invalid_schedule(" "));
        assert!(is_invalid_schedule("{}"));
        assert!(is_invalid_schedule("hour(1), {}"));
    }

    #[test]
    fn test_unclosed_constructs_are_syntax_errors() {
        assert_eq!(syntax_index("hour(1"), 6);
        assert_eq!(syntax_index("{hour(1)"), 8);
        assert_eq!(syntax_index("hour()"), 5);
        assert_eq!(syntax_index("hour"), 4);
        assert_eq!(syntax_index("(hour(1))"), 0);
    }

    #[test]
    fn test_groups_and_commas() {
        let groups = parse("{hour(1)}, {hour(2) min(3)} {sec(4),}").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].minutes.include, vec![Range::single(3)]);
        assert_eq!(groups[2].seconds.include, vec![Range::single(4)]);
    }

    #[test]
    fn test_loose_expressions_merge_across_groups() {
        let groups = parse("hour(5) {min(1)} minute(10)").unwrap();
        assert_eq!(groups.len(), 2);
        // the loose group sits where the first loose expression appeared
        assert_eq!(groups[0].hours.include, vec![Range::single(5)]);
        assert_eq!(groups[0].minutes.include, vec![Range::single(10)]);
        assert_eq!(groups[1].minutes.include, vec![Range::single(1)]);
        assert!(groups[1].hours.is_empty());
    }

    #[test]
    fn test_repeated_expression_accumulates() {
        let g = single("hour(1) hour(3..4)");
        assert_eq!(
            g.hours.include,
            vec![Range::single(1), Range::new(3, 4, false, 1)]
        );
    }

    #[test]
    fn test_each_kind_fills_its_own_rules() {
        let g = single("date(3/1) dom(2) dow(4) hour(5) min(6) sec(7)");
        assert_eq!(g.dates.include.len(), 1);
        assert_eq!(g.days_of_month.include, vec![Range::single(2)]);
        assert_eq!(g.days_of_week.include, vec![Range::single(4)]);
        assert_eq!(g.hours.include, vec![Range::single(5)]);
        assert_eq!(g.minutes.include, vec![Range::single(6)]);
        assert_eq!(g.seconds.include, vec![Range::single(7)]);

        let g = single("dom(!-1) sec(*%20)");
        assert_eq!(g.days_of_month.exclude, vec![Range::single(-1)]);
        assert!(g.days_of_month.include.is_empty());
        assert_eq!(g.seconds.include, vec![Range::new(0, 59, false, 20)]);
        assert!(g.hours.is_empty() && g.minutes.is_empty() && g.days_of_week.is_empty());
    }

    #[test]
    fn test_argument_compile() {
        let arg = Argument {
            excluded: false,
            value: ArgValue::Range {
                start: 5,
                end: None,
                half_open: false,
            },
            interval: None,
        };
        assert_eq!(arg.compile(0, 59), Range::single(5));

        let arg = Argument {
            interval: Some(10),
            ..arg
        };
        assert_eq!(arg.compile(0, 59), Range::new(5, 59, false, 10));
    }

    #[test]
    fn test_lexer_error_surfaces_through_parser() {
        assert_eq!(syntax_index("hour(1) & min(2)"), 8);
    }

    #[test]
    fn test_wrong_token_message() {
        let err = parse("hour(1..)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected ')' at index 8, expected integer"
        );
        let err = parse("dow(,)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected ',' at index 4, expected one of integer, word"
        );
    }

    #[test]
    fn test_rules_type_is_shared() {
        let g = single("dom(1)");
        let rules: &Rules<i32> = &g.days_of_month;
        assert_eq!(rules.include.len(), 1);
    }
}
