pub mod bytecode;
pub mod errors;
pub mod gxb;
pub mod tokens;
pub mod utils;

/// The current version of the interpreter.
pub const VERSION: &str = "0.1.0";

/// Maximum number of frames on the VM's frame stack.
pub const FRAMES_MAX: usize = 256;

/// Maximum number of arguments a native callback may receive.
pub const VM_MAX_NARGS: usize = 25;

/// String literal length must fit in the single byte `STR_PUSH` uses for its
/// length operand.
pub const GS_MAX_STRING_LEN: usize = 127;

/// Names longer than this cannot be carried in a `.gxb` function directory
/// entry (the on-disk `name_len` field is a `u8`).
pub const GS_MAX_FUNCTION_NAME_LEN: usize = 255;
