use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;

pub const TYPE_TAG: &str = "SYS.FILE";

/// A host-owned file handle. `close` drops the underlying `File`;
/// subsequent operations must check [`FileObject::is_closed`] themselves
/// and raise `RuntimeErrorKind::FileClosed` (the object does not do this on
/// their behalf, matching how every other native-side type check works).
pub struct FileObject {
  file: RefCell<Option<File>>,
  path: String,
}

impl FileObject {
  pub fn new(file: File, path: impl Into<String>) -> Self {
    FileObject { file: RefCell::new(Some(file)), path: path.into() }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn is_closed(&self) -> bool {
    self.file.borrow().is_none()
  }

  pub fn close(&self) {
    self.file.borrow_mut().take();
  }

  pub fn with_file<R>(&self, f: impl FnOnce(&mut File) -> R) -> Option<R> {
    self.file.borrow_mut().as_mut().map(f)
  }
}

impl fmt::Debug for FileObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FileObject").field("path", &self.path).field("closed", &self.is_closed()).finish()
  }
}

use crate::HostObject;

impl HostObject for FileObject {
  fn type_tag(&self) -> &'static str {
    TYPE_TAG
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn scratch_path(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir();
    dir.join(format!("gunderscript-file-obj-test-{tag}-{:p}", &dir))
  }

  #[test]
  fn close_makes_with_file_return_none() {
    let path = scratch_path("close");
    let file = File::create(&path).unwrap();
    let obj = FileObject::new(file, path.to_string_lossy().into_owned());

    assert!(!obj.is_closed());
    obj.close();
    assert!(obj.is_closed());
    assert!(obj.with_file(|f| f.write_all(b"x")).is_none());

    let _ = std::fs::remove_file(&path);
  }
}
