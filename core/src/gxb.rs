//! The on-disk bytecode container format (`.gxb`): a header, a directory of
//! exported functions, then the raw code buffer. See §6.2 of the design
//! document this crate implements.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::GS_MAX_FUNCTION_NAME_LEN;

/// Fixed-length ASCII marker identifying a file as gunderscript bytecode.
pub const GXB_MAGIC_LEN: usize = 16;
pub const GXB_MAGIC: &str = "GUNDERSCRIPTBC01";

/// Fixed-length ASCII build fingerprint. The instruction encoding is not
/// stabilized across builds, so a `.gxb` produced by one build can only be
/// loaded by the exact same build.
pub const GXB_BUILD_DATE_LEN: usize = 32;
pub const GXB_BUILD_FINGERPRINT: &str = concat!("gunderscript-", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub enum GxbError {
  Io(io::Error),
  NotABytecodeFile,
  BuildMismatch,
  Corrupted,
  FunctionNameTooLong,
  NoFunctions,
}

impl From<io::Error> for GxbError {
  fn from(e: io::Error) -> Self {
    GxbError::Io(e)
  }
}

impl fmt::Display for GxbError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GxbError::Io(e) => write!(f, "i/o error: {e}"),
      GxbError::NotABytecodeFile => write!(f, "not a gunderscript bytecode file"),
      GxbError::BuildMismatch => write!(f, "bytecode was built by a different runtime build"),
      GxbError::Corrupted => write!(f, "bytecode file is corrupted"),
      GxbError::FunctionNameTooLong => write!(f, "exported function name too long"),
      GxbError::NoFunctions => write!(f, "bytecode file exports no functions"),
    }
  }
}

/// A single entry in the exported-function directory. Non-exported
/// functions are never written to the directory; they remain reachable
/// only through calls made from an exported function.
#[derive(Debug, Clone)]
pub struct ExportedFunction {
  pub name: String,
  pub entry: i32,
  pub arg_count: i32,
  pub total_slots: i32,
  pub exported: bool,
}

fn fixed_ascii(s: &str, len: usize) -> Vec<u8> {
  let mut buf = vec![0u8; len];
  let bytes = s.as_bytes();
  let n = bytes.len().min(len);
  buf[..n].copy_from_slice(&bytes[..n]);
  buf
}

pub fn write_gxb<P: AsRef<Path>>(path: P, functions: &[ExportedFunction], code: &[u8]) -> Result<(), GxbError> {
  let mut file = File::create(path)?;

  file.write_all(&fixed_ascii(GXB_MAGIC, GXB_MAGIC_LEN))?;
  file.write_all(&fixed_ascii(GXB_BUILD_FINGERPRINT, GXB_BUILD_DATE_LEN))?;
  file.write_all(&(code.len() as u32).to_le_bytes())?;

  let exported: Vec<&ExportedFunction> = functions.iter().filter(|f| f.exported).collect();
  file.write_all(&(exported.len() as u32).to_le_bytes())?;

  for f in &exported {
    if f.name.len() >= GS_MAX_FUNCTION_NAME_LEN {
      return Err(GxbError::FunctionNameTooLong);
    }
    file.write_all(&[f.name.len() as u8])?;
    file.write_all(f.name.as_bytes())?;
    file.write_all(&f.entry.to_le_bytes())?;
    file.write_all(&f.arg_count.to_le_bytes())?;
    file.write_all(&f.total_slots.to_le_bytes())?;
    file.write_all(&[f.exported as u8])?;
  }

  file.write_all(code)?;
  Ok(())
}

pub fn read_gxb<P: AsRef<Path>>(path: P) -> Result<(Vec<ExportedFunction>, Vec<u8>), GxbError> {
  let mut file = File::open(path)?;

  let mut magic = [0u8; GXB_MAGIC_LEN];
  file.read_exact(&mut magic)?;
  if &magic[..GXB_MAGIC.len()] != GXB_MAGIC.as_bytes() {
    return Err(GxbError::NotABytecodeFile);
  }

  let mut build_date = [0u8; GXB_BUILD_DATE_LEN];
  file.read_exact(&mut build_date)?;
  if &build_date[..] != fixed_ascii(GXB_BUILD_FINGERPRINT, GXB_BUILD_DATE_LEN).as_slice() {
    return Err(GxbError::BuildMismatch);
  }

  let mut u32_buf = [0u8; 4];
  file.read_exact(&mut u32_buf)?;
  let bytecode_len = u32::from_le_bytes(u32_buf) as usize;

  file.read_exact(&mut u32_buf)?;
  let num_functions = u32::from_le_bytes(u32_buf);
  if num_functions < 1 {
    return Err(GxbError::NoFunctions);
  }

  let mut functions = Vec::with_capacity(num_functions as usize);
  for _ in 0..num_functions {
    let mut len_buf = [0u8; 1];
    file.read_exact(&mut len_buf)?;
    let name_len = len_buf[0] as usize;
    if name_len >= GS_MAX_FUNCTION_NAME_LEN {
      return Err(GxbError::Corrupted);
    }

    let mut name_buf = vec![0u8; name_len];
    file.read_exact(&mut name_buf)?;
    let name = String::from_utf8(name_buf).map_err(|_| GxbError::Corrupted)?;

    let mut i32_buf = [0u8; 4];
    file.read_exact(&mut i32_buf)?;
    let entry = i32::from_le_bytes(i32_buf);
    file.read_exact(&mut i32_buf)?;
    let arg_count = i32::from_le_bytes(i32_buf);
    file.read_exact(&mut i32_buf)?;
    let total_slots = i32::from_le_bytes(i32_buf);
    let mut bool_buf = [0u8; 1];
    file.read_exact(&mut bool_buf)?;
    let exported = bool_buf[0] != 0;

    functions.push(ExportedFunction { name, entry, arg_count, total_slots, exported });
  }

  let mut code = vec![0u8; bytecode_len];
  file.read_exact(&mut code)?;
  if code.len() != bytecode_len {
    return Err(GxbError::Corrupted);
  }

  Ok((functions, code))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_path(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir();
    dir.join(format!("gunderscript-gxb-test-{tag}-{:p}", &dir))
  }

  #[test]
  fn write_then_read_round_trips_exported_functions() {
    let path = scratch_path("round-trip");
    let functions = vec![
      ExportedFunction { name: "main".to_string(), entry: 0, arg_count: 0, total_slots: 2, exported: true },
      ExportedFunction { name: "helper".to_string(), entry: 10, arg_count: 1, total_slots: 1, exported: false },
    ];
    let code = vec![1, 2, 3, 4];

    write_gxb(&path, &functions, &code).unwrap();
    let (read_functions, read_code) = read_gxb(&path).unwrap();

    // only the exported entry survives the round trip.
    assert_eq!(read_functions.len(), 1);
    assert_eq!(read_functions[0].name, "main");
    assert_eq!(read_functions[0].total_slots, 2);
    assert_eq!(read_code, code);

    fs_remove(&path);
  }

  #[test]
  fn no_exported_functions_is_an_error() {
    let path = scratch_path("no-exports");
    let functions = vec![ExportedFunction { name: "hidden".to_string(), entry: 0, arg_count: 0, total_slots: 0, exported: false }];

    write_gxb(&path, &functions, &[]).unwrap();
    let err = read_gxb(&path).unwrap_err();
    assert!(matches!(err, GxbError::NoFunctions));

    fs_remove(&path);
  }

  #[test]
  fn rejects_a_file_without_the_magic_header() {
    let path = scratch_path("bad-magic");
    std::fs::write(&path, b"not bytecode").unwrap();

    let err = read_gxb(&path).unwrap_err();
    assert!(matches!(err, GxbError::NotABytecodeFile));

    fs_remove(&path);
  }

  fn fs_remove(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
  }
}
