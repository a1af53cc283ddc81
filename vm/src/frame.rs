use objects::Value;

/// One activation record on the frame stack: the address to resume at when
/// the callee returns, and the flat slot array holding its arguments and
/// locals (arguments occupy the low slots, in declaration order).
///
/// The spec's C heritage uses `-1` as the "this is the outermost frame, stop
/// the VM when it returns" sentinel; `Option<usize>` is the idiomatic stand-in.
#[derive(Debug)]
pub struct Frame {
  pub return_address: Option<usize>,
  slots: Vec<Value>,
}

impl Frame {
  pub fn new(return_address: Option<usize>, total_slots: usize) -> Self {
    Frame { return_address, slots: vec![Value::Null; total_slots] }
  }

  pub fn get(&self, slot: usize) -> Option<&Value> {
    self.slots.get(slot)
  }

  pub fn set(&mut self, slot: usize, value: Value) -> bool {
    match self.slots.get_mut(slot) {
      Some(dest) => {
        *dest = value;
        true
      }
      None => false,
    }
  }

  pub fn total_slots(&self) -> usize {
    self.slots.len()
  }
}
