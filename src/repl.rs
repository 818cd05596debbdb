// ABOUTME: REPL helper that keeps reading lines until braces balance

use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline_derive::{Completer, Helper, Highlighter, Hinter};

/// Editor helper for the interactive prompt. Input is held open across
/// lines until every `{` and `(` outside a string literal is matched, so
/// block statements can be typed naturally.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper;

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if is_balanced(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

/// True once all braces and parentheses are closed and no string literal is
/// left open. Comments are ignored to the end of their line.
fn is_balanced(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match in_string {
            Some(quote) => {
                if ch == quote {
                    in_string = None;
                }
            }
            None => match ch {
                '\'' | '"' => in_string = Some(ch),
                '#' => skip_line(&mut chars),
                '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
                '{' | '(' => depth += 1,
                '}' | ')' => depth -= 1,
                _ => {}
            },
        }
    }

    depth <= 0 && in_string.is_none()
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars>) {
    for ch in chars.by_ref() {
        if ch == '\n' {
            break;
        }
    }
}
