//! Small parsing helpers shared between the lexer and compiler.

use std::num::ParseFloatError;

/// Parses a numeric literal lexeme (digits with at most one `.`) into a
/// Rust `f64`. The lexer has already rejected duplicate or trailing dots,
/// so this never needs to report those errors itself.
pub fn parse_number_lexeme(lexeme: &str) -> Result<f64, ParseFloatError> {
  lexeme.parse::<f64>()
}
