// ABOUTME: Character-level lexer producing one token per call with line/column tracking

use crate::token::{Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("invalid character '{ch}' at line {line}, column {column}")]
    UnexpectedChar { ch: char, line: u32, column: u32 },

    #[error("unterminated string at line {line}, column {column}")]
    UnterminatedString { line: u32, column: u32 },

    #[error("too many decimal points in number at line {line}, column {column}")]
    TooManyDecimalPoints { line: u32, column: u32 },

    #[error("expected '!=' after '!' at line {line}, column {column}")]
    LoneBang { line: u32, column: u32 },
}

/// Reads the source character-by-character and emits tokens on demand.
///
/// Positions are 1-based; a newline advances the line and resets the column.
/// Once the input is exhausted every further call returns an `Eof` token.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    /// Comments run from `//` or `#` to the end of the line.
    fn skip_comment(&mut self) {
        while self.current().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// Lexes a number run: digits with at most one decimal point.
    ///
    /// A leading `.` is normalized to `0.` and a trailing `.` to `.0` before
    /// conversion, so `.5` and `42.` are valid literals.
    fn number(&mut self, line: u32, column: u32) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut decimal_points = 0;

        while let Some(ch) = self.current() {
            if ch == '.' {
                decimal_points += 1;
                if decimal_points > 1 {
                    return Err(LexError::TooManyDecimalPoints {
                        line: self.line,
                        column: self.column,
                    });
                }
            } else if !ch.is_ascii_digit() {
                break;
            }
            text.push(ch);
            self.advance();
        }

        if text.starts_with('.') {
            text.insert(0, '0');
        }
        if text.ends_with('.') {
            text.push('0');
        }

        // The run is digits with at most one '.', so this cannot fail.
        let value: f64 = text.parse().expect("digit run failed to parse");
        Ok(Token::new(TokenKind::Number(value), line, column))
    }

    /// Lexes a string delimited by `'` or `"`. Content is taken verbatim up
    /// to the matching quote; there is no escape processing.
    fn string(&mut self, quote: char, line: u32, column: u32) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(Token::new(TokenKind::Str(text), line, column));
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
                None => return Err(LexError::UnterminatedString { line, column }),
            }
        }
    }

    /// Lexes an identifier or keyword. Keyword matching is case-insensitive;
    /// identifiers preserve their case.
    fn identifier(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !ch.is_ascii_alphanumeric() && ch != '_' {
                break;
            }
            text.push(ch);
            self.advance();
        }

        match TokenKind::keyword(&text.to_ascii_lowercase()) {
            Some(kind) => Token::new(kind, line, column),
            None => Token::new(TokenKind::Ident(text), line, column),
        }
    }

    /// Emits exactly one token, or the `Eof` sentinel once exhausted.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();

            let (line, column) = (self.line, self.column);
            let ch = match self.current() {
                Some(ch) => ch,
                None => return Ok(Token::new(TokenKind::Eof, line, column)),
            };

            if ch == '#' {
                self.skip_comment();
                continue;
            }
            if ch == '/' && self.peek() == Some('/') {
                self.skip_comment();
                continue;
            }

            if ch.is_ascii_digit() {
                return self.number(line, column);
            }
            if ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.number(line, column);
            }
            if ch == '\'' || ch == '"' {
                return self.string(ch, line, column);
            }
            if ch.is_ascii_alphabetic() || ch == '_' {
                return Ok(self.identifier(line, column));
            }

            self.advance();
            let kind = match ch {
                '.' => TokenKind::Dot,
                '+' => TokenKind::Plus,
                '-' => {
                    if self.current() == Some('>') {
                        self.advance();
                        TokenKind::Arrow
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '%' => TokenKind::Percent,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '=' => {
                    if self.current() == Some('=') {
                        self.advance();
                        TokenKind::Eq
                    } else {
                        TokenKind::Assign
                    }
                }
                '!' => {
                    if self.current() == Some('=') {
                        self.advance();
                        TokenKind::Ne
                    } else {
                        return Err(LexError::LoneBang { line, column });
                    }
                }
                '<' => {
                    if self.current() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.current() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                _ => return Err(LexError::UnexpectedChar { ch, line, column }),
            };
            return Ok(Token::new(kind, line, column));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token().expect("lex error");
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn test_numbers_are_floats() {
        assert_eq!(
            lex_all("42 3.5"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_number_normalization() {
        assert_eq!(lex_all(".5")[0], TokenKind::Number(0.5));
        assert_eq!(lex_all("42.")[0], TokenKind::Number(42.0));
    }

    #[test]
    fn test_too_many_decimal_points() {
        let mut lexer = Lexer::new("1.2.3");
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::TooManyDecimalPoints { .. })
        ));
    }

    #[test]
    fn test_minus_before_digit_stays_separate() {
        assert_eq!(
            lex_all("-3"),
            vec![TokenKind::Minus, TokenKind::Number(3.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_strings_both_quotes_no_escapes() {
        assert_eq!(lex_all("'hi'")[0], TokenKind::Str("hi".to_string()));
        assert_eq!(lex_all("\"hi\"")[0], TokenKind::Str("hi".to_string()));
        // Backslashes are verbatim content.
        assert_eq!(lex_all(r"'a\nb'")[0], TokenKind::Str(r"a\nb".to_string()));
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        let mut lexer = Lexer::new("x = 'oops");
        lexer.next_token().unwrap(); // x
        lexer.next_token().unwrap(); // =
        match lexer.next_token() {
            Err(LexError::UnterminatedString { line, column }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 5);
            }
            other => panic!("expected unterminated string error, got {:?}", other),
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(lex_all("IF")[0], TokenKind::If);
        assert_eq!(lex_all("While")[0], TokenKind::While);
        assert_eq!(lex_all("parallel")[0], TokenKind::Parallel);
    }

    #[test]
    fn test_identifiers_preserve_case() {
        assert_eq!(lex_all("FooBar")[0], TokenKind::Ident("FooBar".to_string()));
        assert_eq!(lex_all("_x1")[0], TokenKind::Ident("_x1".to_string()));
    }

    #[test]
    fn test_operators_and_arrow() {
        assert_eq!(
            lex_all("== != <= >= -> = < >"),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Arrow,
                TokenKind::Assign,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lone_bang_is_an_error() {
        let mut lexer = Lexer::new("!x");
        assert!(matches!(lexer.next_token(), Err(LexError::LoneBang { .. })));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            lex_all("1 // trailing\n2"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            lex_all("# whole line\n7"),
            vec![TokenKind::Number(7.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let mut lexer = Lexer::new("a = 1;\n  b = 2;");
        let a = lexer.next_token().unwrap();
        assert_eq!((a.line, a.column), (1, 1));
        lexer.next_token().unwrap(); // =
        let one = lexer.next_token().unwrap();
        assert_eq!((one.line, one.column), (1, 5));
        lexer.next_token().unwrap(); // ;
        let b = lexer.next_token().unwrap();
        assert_eq!((b.line, b.column), (2, 3));
    }

    #[test]
    fn test_lines_never_decrease() {
        let mut lexer = Lexer::new("a\nb\n\nc d\ne");
        let mut last_line = 0;
        loop {
            let token = lexer.next_token().unwrap();
            assert!(token.line >= last_line);
            last_line = token.line;
            if token.kind == TokenKind::Eof {
                break;
            }
        }
    }

    #[test]
    fn test_eof_is_repeatable() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }
}
