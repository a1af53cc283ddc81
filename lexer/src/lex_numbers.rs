use core::errors::LexerErrorKind::{DuplicateDecimalPoint, TrailingDecimalPoint};
use core::tokens::{Token, TokenKind};

use crate::Lexer;

impl<'a> Lexer<'a> {
  /// Scans a numeric literal: digits with at most one `.`. A trailing `.`
  /// (no digit after it) or a second `.` are both fatal lex errors.
  pub(super) fn make_number_token(&mut self) -> Token<'a> {
    let mut has_period = false;

    loop {
      if self.is_at_end() {
        break;
      }

      match self.peek_char() {
        b'0'..=b'9' => {
          self.advance_char();
        }
        b'.' => {
          if has_period {
            return self.fail(DuplicateDecimalPoint);
          }
          has_period = true;
          self.advance_char();
          if !self.peek_char().is_ascii_digit() {
            return self.fail(TrailingDecimalPoint);
          }
        }
        _ => break,
      }
    }

    self.make(TokenKind::Number)
  }
}
