use std::any::Any;
use std::cell::RefCell;

use crate::HostObject;

pub const TYPE_TAG: &str = "LIBSTR.SB";

/// An incremental string builder, distinct from a plain `LIBSTR.STR` value
/// so natives can tell "a finished string" from "an accumulator still
/// being appended to" just from the tag.
#[derive(Debug)]
pub struct StrBuilderObject {
  buf: RefCell<String>,
}

impl StrBuilderObject {
  pub fn new() -> Self {
    StrBuilderObject { buf: RefCell::new(String::new()) }
  }

  pub fn with_capacity(capacity: usize) -> Self {
    StrBuilderObject { buf: RefCell::new(String::with_capacity(capacity)) }
  }

  pub fn append(&self, s: &str) {
    self.buf.borrow_mut().push_str(s);
  }

  pub fn reserve(&self, additional: usize) {
    self.buf.borrow_mut().reserve(additional);
  }

  pub fn build(&self) -> String {
    self.buf.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.buf.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.buf.borrow().is_empty()
  }
}

impl Default for StrBuilderObject {
  fn default() -> Self {
    Self::new()
  }
}

impl HostObject for StrBuilderObject {
  fn type_tag(&self) -> &'static str {
    TYPE_TAG
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn append_accumulates_across_calls() {
    let ws = StrBuilderObject::with_capacity(4);
    ws.append("foo");
    ws.append("bar");
    assert_eq!(ws.build(), "foobar");
    assert_eq!(ws.len(), 6);
  }

  #[test]
  fn new_builder_is_empty() {
    let ws = StrBuilderObject::new();
    assert!(ws.is_empty());
  }
}
