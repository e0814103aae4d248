use crate::error::{ScheduleError, Span};

/// Token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw text of the token as it appears in the input.
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// The end-of-input marker, positioned just past the last character.
    pub fn end_of_input(input: &'a str) -> Self {
        Self {
            kind: TokenKind::EndOfInput,
            text: "",
            span: Span::new(input.len(), input.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Never produced by [`Lexer`]; the parser synthesizes it once the lexer is exhausted.
    EndOfInput,

    // Operators
    RangeInclusive,
    RangeHalfOpen,
    Interval,
    Not,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Slash,
    Comma,
    Wildcard,

    // Alpha-numeric
    Word,
    Integer,
}

impl TokenKind {
    /// Human-readable name used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::EndOfInput => "end of input",
            Self::RangeInclusive => "'..'",
            Self::RangeHalfOpen => "'..<'",
            Self::Interval => "'%'",
            Self::Not => "'!'",
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::OpenBrace => "'{'",
            Self::CloseBrace => "'}'",
            Self::Slash => "'/'",
            Self::Comma => "','",
            Self::Wildcard => "'*'",
            Self::Word => "word",
            Self::Integer => "integer",
        }
    }
}

/// Operators, tried in order. `..<` must precede `..` since the latter is a prefix.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("..<", TokenKind::RangeHalfOpen),
    ("..", TokenKind::RangeInclusive),
    ("%", TokenKind::Interval),
    ("!", TokenKind::Not),
    ("(", TokenKind::OpenParen),
    (")", TokenKind::CloseParen),
    ("{", TokenKind::OpenBrace),
    ("}", TokenKind::CloseBrace),
    ("/", TokenKind::Slash),
    (",", TokenKind::Comma),
    ("*", TokenKind::Wildcard),
];

/// Lazy tokenizer over a schedule string.
///
/// Yields tokens until the input is exhausted. The first unrecognized
/// character produces an error, after which the iterator is finished.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            failed: false,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b' ' | b'\t' | b'\r' | b'\n')
        {
            self.pos += 1;
        }
    }

    fn token(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let start = self.pos;
        self.pos += len;
        Token {
            kind,
            text: &self.input[start..self.pos],
            span: Span::new(start, self.pos),
        }
    }

    fn lex_operator(&mut self) -> Option<Token<'a>> {
        let rest = &self.input[self.pos..];
        OPERATORS
            .iter()
            .find(|(symbol, _)| rest.starts_with(symbol))
            .map(|&(symbol, kind)| self.token(kind, symbol.len()))
    }

    /// `[A-Za-z]+` ending on a word boundary.
    fn lex_word(&mut self) -> Option<Token<'a>> {
        let len = self.run_length(self.pos, |b| b.is_ascii_alphabetic());
        if len == 0 || !self.at_boundary(self.pos + len) {
            return None;
        }
        Some(self.token(TokenKind::Word, len))
    }

    /// `-?[0-9]+` ending on a word boundary.
    fn lex_integer(&mut self) -> Option<Token<'a>> {
        let sign = usize::from(self.bytes.get(self.pos) == Some(&b'-'));
        let digits = self.run_length(self.pos + sign, |b| b.is_ascii_digit());
        let len = sign + digits;
        if digits == 0 || !self.at_boundary(self.pos + len) {
            return None;
        }
        Some(self.token(TokenKind::Integer, len))
    }

    fn run_length(&self, from: usize, accept: impl Fn(u8) -> bool) -> usize {
        self.bytes
            .get(from..)
            .map_or(0, |rest| rest.iter().take_while(|&&b| accept(b)).count())
    }

    /// A word boundary: end of input, or a character that cannot continue a word.
    fn at_boundary(&self, at: usize) -> bool {
        match self.input[at..].chars().next() {
            Some(c) => !(c.is_alphanumeric() || c == '_'),
            None => true,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ScheduleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.skip_whitespace();
        if self.pos >= self.bytes.len() {
            return None;
        }

        let token = self
            .lex_operator()
            .or_else(|| self.lex_word())
            .or_else(|| self.lex_integer());

        match token {
            Some(tok) => Some(Ok(tok)),
            None => {
                self.failed = true;
                let start = self.pos;
                let width = self.input[start..].chars().next().map_or(1, char::len_utf8);
                Some(Err(ScheduleError::syntax(
                    format!("syntax error near: {}", &self.input[start..]),
                    Span::new(start, start + width),
                    self.input,
                )))
            }
        }
    }
}
