use std::fmt;

/// Characters of context shown before the error offset in [`ScheduleError::display_rich`].
const CONTEXT_BEFORE: usize = 20;
/// Characters of context shown after the error offset.
const CONTEXT_AFTER: usize = 30;

/// Byte range within the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// All errors produced by schyntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ScheduleError {
    /// Malformed input, or a value that is not allowed where it appears.
    #[error("{message}")]
    Syntax {
        message: String,
        span: Span,
        input: String,
    },

    /// The input parsed but contains no expressions.
    #[error("{message}")]
    InvalidSchedule { message: String },

    /// A query searched its whole window without finding a matching instant.
    #[error("no valid time found for schedule '{input}'")]
    ValidTimeNotFound { input: String },
}

impl ScheduleError {
    pub fn syntax(message: impl Into<String>, span: Span, input: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
            input: input.into(),
        }
    }

    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            message: message.into(),
        }
    }

    pub fn valid_time_not_found(input: impl Into<String>) -> Self {
        Self::ValidTimeNotFound {
            input: input.into(),
        }
    }

    /// Offset of the offending token for syntax errors.
    ///
    /// Every token the grammar accepts is ASCII, so the byte offset is also
    /// the character offset.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Syntax { span, .. } => Some(span.start),
            _ => None,
        }
    }

    /// The schedule text the error refers to, when there is one.
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::Syntax { input, .. } | Self::ValidTimeNotFound { input } => Some(input),
            Self::InvalidSchedule { .. } => None,
        }
    }

    /// Format a rich error with a caret under the offending character.
    pub fn display_rich(&self) -> String {
        match self {
            Self::Syntax {
                message,
                span,
                input,
            } => format_span_error(message, span, input),
            other => format!("error: {other}"),
        }
    }
}

fn format_span_error(message: &str, span: &Span, input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let offset = input
        .get(..span.start)
        .map_or(chars.len(), |head| head.chars().count());

    let from = offset.saturating_sub(CONTEXT_BEFORE);
    let to = (offset + CONTEXT_AFTER).min(chars.len());
    let window: String = chars[from..to]
        .iter()
        .map(|&c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    let mut out = format!("error: {message}\n");
    out.push_str(&format!("  {window}\n"));
    out.push_str(&" ".repeat(offset - from + 2));
    out.push('^');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rich_caret_points_at_offset() {
        let err = ScheduleError::syntax("bad", Span::new(5, 6), "hour(x)");
        let rendered = err.display_rich();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "error: bad");
        assert_eq!(lines[1], "  hour(x)");
        assert_eq!(lines[2], "       ^");
    }

    #[test]
    fn test_rich_window_is_clipped() {
        let input = format!("{}hour(x){}", "a".repeat(40), "b".repeat(40));
        let err = ScheduleError::syntax("bad", Span::new(45, 46), input);
        let rendered = err.display_rich();
        let lines: Vec<&str> = rendered.lines().collect();
        // 20 chars before, 30 after
        assert_eq!(lines[1].len(), 2 + 50);
        assert_eq!(lines[2].len(), 2 + 20 + 1);
        assert!(lines[2].ends_with('^'));
    }

    #[test]
    fn test_rich_at_end_of_input() {
        let err = ScheduleError::syntax("unexpected end", Span::new(5, 5), "hour(");
        let rendered = err.display_rich();
        assert!(rendered.ends_with("       ^"));
    }

    #[test]
    fn test_non_syntax_errors_render_single_line() {
        let err = ScheduleError::invalid_schedule("schedule must contain at least one expression");
        assert_eq!(
            err.display_rich(),
            "error: schedule must contain at least one expression"
        );
        assert_eq!(err.index(), None);
    }
}
