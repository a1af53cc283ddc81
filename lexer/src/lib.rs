//! One-token-lookahead lexer. Produces a stream of typed tokens from a
//! single source buffer that is never re-read; tokens are slices into that
//! buffer.

mod lex_numbers;
mod lex_strings;

use core::errors::LexerErrorKind;
use core::tokens::{Token, TokenKind};

/// Scans `src` for tokens. The lexer treats the source as an 8-bit byte
/// stream: non-ASCII bytes fall through to the `Operator` catch-all, same
/// as any other run of symbol characters.
pub struct Lexer<'a> {
  source: &'a [u8],
  text: &'a str,
  /// Index of the next unread byte.
  cursor: usize,
  /// Index of the first byte of the token currently being scanned.
  token_start: usize,
  line: usize,
  error: Option<LexerErrorKind>,
  primed: bool,
  current: Token<'a>,
  next: Token<'a>,
}

impl<'a> Lexer<'a> {
  pub fn new(src: &'a str) -> Self {
    let mut lexer = Lexer {
      source: src.as_bytes(),
      text: src,
      cursor: 0,
      token_start: 0,
      line: 1,
      error: None,
      primed: false,
      current: Token::eof(1),
      next: Token::eof(1),
    };
    lexer.advance();
    lexer
  }

  /// The token the caller is currently positioned on.
  pub fn current(&self) -> &Token<'a> {
    &self.current
  }

  /// The token after `current`, without consuming it.
  pub fn peek(&self) -> &Token<'a> {
    &self.next
  }

  /// The first lexical error encountered, if any. Once set, this never
  /// changes: the lexer latches the first error.
  pub fn error(&self) -> Option<LexerErrorKind> {
    self.error
  }

  pub fn line(&self) -> usize {
    self.current.line
  }

  /// Advances the lookahead window by one token. On the very first call
  /// this primes both `current` and `next` so that one-token lookahead is
  /// always available from the start.
  pub fn advance(&mut self) {
    if !self.primed {
      self.primed = true;
      self.current = self.scan_token();
      self.next = self.scan_token();
    } else {
      self.current = self.next;
      self.next = self.scan_token();
    }
  }

  fn is_at_end(&self) -> bool {
    self.cursor >= self.source.len()
  }

  fn peek_char(&self) -> u8 {
    if self.is_at_end() {
      0
    } else {
      self.source[self.cursor]
    }
  }

  fn peek_char_at(&self, offset: usize) -> u8 {
    let idx = self.cursor + offset;
    if idx >= self.source.len() {
      0
    } else {
      self.source[idx]
    }
  }

  fn advance_char(&mut self) -> u8 {
    let c = self.peek_char();
    self.cursor += 1;
    c
  }

  fn lexeme(&self) -> &'a str {
    &self.text[self.token_start..self.cursor]
  }

  fn make(&self, kind: TokenKind) -> Token<'a> {
    Token { lexeme: self.lexeme(), kind, line: self.line }
  }

  /// Latches the first error and clamps the cursor to end-of-source so all
  /// further scans return `Eof` tokens.
  fn fail(&mut self, err: LexerErrorKind) -> Token<'a> {
    if self.error.is_none() {
      self.error = Some(err);
    }
    self.cursor = self.source.len();
    Token::eof(self.line)
  }

  fn skip_whitespace_and_comments(&mut self) -> Option<Token<'a>> {
    loop {
      if self.is_at_end() {
        return None;
      }

      match self.peek_char() {
        b' ' | b'\r' | b'\t' => {
          self.advance_char();
        }
        b'\n' => {
          self.advance_char();
          self.line += 1;
        }
        b'/' if self.peek_char_at(1) == b'/' => {
          while !self.is_at_end() && self.peek_char() != b'\n' {
            self.advance_char();
          }
        }
        b'/' if self.peek_char_at(1) == b'*' => {
          self.advance_char();
          self.advance_char();
          let mut closed = false;
          while !self.is_at_end() {
            if self.peek_char() == b'*' && self.peek_char_at(1) == b'/' {
              self.advance_char();
              self.advance_char();
              closed = true;
              break;
            }
            if self.peek_char() == b'\n' {
              self.line += 1;
            }
            self.advance_char();
          }
          if !closed {
            self.token_start = self.cursor;
            return Some(self.fail(LexerErrorKind::UnterminatedComment));
          }
        }
        _ => return None,
      }
    }
  }

  /// Runs the recognition cascade described in the design document and
  /// returns the next token.
  fn scan_token(&mut self) -> Token<'a> {
    if let Some(err_tok) = self.skip_whitespace_and_comments() {
      return err_tok;
    }

    self.token_start = self.cursor;

    if self.is_at_end() {
      return Token::eof(self.line);
    }

    let c = self.peek_char();

    if c == b'"' {
      self.advance_char();
      return self.make_string_token();
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      while !self.is_at_end() && (self.peek_char().is_ascii_alphanumeric() || self.peek_char() == b'_') {
        self.advance_char();
      }
      return self.make(TokenKind::KeyVar);
    }

    if c.is_ascii_digit() || (c == b'.' && self.peek_char_at(1).is_ascii_digit()) {
      return self.make_number_token();
    }

    if c == b'{' || c == b'}' || c == b'[' || c == b']' {
      self.advance_char();
      return self.make(TokenKind::Brackets);
    }

    if c == b'(' || c == b')' {
      self.advance_char();
      return self.make(TokenKind::Parenthesis);
    }

    if c == b',' {
      self.advance_char();
      return self.make(TokenKind::ArgDelim);
    }

    if c == b';' {
      self.advance_char();
      return self.make(TokenKind::EndStatement);
    }

    // Anything else is a maximal run of operator characters.
    while !self.is_at_end() && is_operator_char(self.peek_char()) {
      self.advance_char();
    }
    if self.cursor == self.token_start {
      // A single, otherwise-unclassified byte; consume it so we make
      // forward progress and report it as an operator token.
      self.advance_char();
    }
    self.make(TokenKind::Operator)
  }
}

fn is_operator_char(c: u8) -> bool {
  !(c.is_ascii_alphanumeric()
    || c == b'_'
    || c == b' '
    || c == b'\r'
    || c == b'\t'
    || c == b'\n'
    || c == b'"'
    || c == b'{'
    || c == b'}'
    || c == b'['
    || c == b']'
    || c == b'('
    || c == b')'
    || c == b','
    || c == b';')
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(src);
    let mut kinds = Vec::new();
    loop {
      let tok = *lexer.current();
      if tok.kind == TokenKind::Eof {
        break;
      }
      kinds.push(tok.kind);
      lexer.advance();
    }
    kinds
  }

  #[test]
  fn new_primes_current_and_peek_to_the_first_two_tokens() {
    let lexer = Lexer::new("function main");
    assert_eq!(lexer.current().lexeme, "function");
    assert_eq!(lexer.peek().lexeme, "main");
  }

  #[test]
  fn lexes_a_minimal_function_header() {
    let got = kinds("function exported main() {");
    assert_eq!(
      got,
      vec![
        TokenKind::KeyVar,
        TokenKind::KeyVar,
        TokenKind::KeyVar,
        TokenKind::Parenthesis,
        TokenKind::Parenthesis,
        TokenKind::Brackets,
      ]
    );
  }

  #[test]
  fn tracks_line_numbers_across_newlines() {
    let mut lexer = Lexer::new("a\nb\nc");
    assert_eq!(lexer.current().line, 1);
    lexer.advance();
    assert_eq!(lexer.current().line, 2);
    lexer.advance();
    assert_eq!(lexer.current().line, 3);
  }

  #[test]
  fn skips_line_and_block_comments() {
    let got = kinds("a // comment\n/* block */ b");
    assert_eq!(got, vec![TokenKind::KeyVar, TokenKind::KeyVar]);
  }

  #[test]
  fn unterminated_block_comment_latches_an_error() {
    let mut lexer = Lexer::new("/* never closed");
    assert_eq!(lexer.current().kind, TokenKind::Eof);
    assert!(lexer.error().is_some());
  }

  #[test]
  fn numbers_and_strings_carry_their_lexeme() {
    let mut lexer = Lexer::new(r#"3.5 "hi""#);
    assert_eq!(lexer.current().kind, TokenKind::Number);
    assert_eq!(lexer.current().lexeme, "3.5");
    lexer.advance();
    assert_eq!(lexer.current().kind, TokenKind::String);
  }

  #[test]
  fn maximal_munch_groups_multi_char_operators() {
    let got = kinds("a == b");
    assert_eq!(got, vec![TokenKind::KeyVar, TokenKind::Operator, TokenKind::KeyVar]);
    let mut lexer = Lexer::new("==");
    assert_eq!(lexer.current().lexeme, "==");
    lexer.advance();
    assert_eq!(lexer.current().kind, TokenKind::Eof);
  }
}
