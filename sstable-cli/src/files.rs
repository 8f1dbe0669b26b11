use std::{io, path::Path};

/// Thin re-export point for directory creation: [`std::fs::create_dir_all`] is already
/// a no-op when the directory exists, so `write`/`sort`/`merge` go through this one
/// call site rather than reaching into `std::fs` directly.
pub fn create_dir_all<P: AsRef<Path>>(path_dir: P) -> io::Result<()> {
  std::fs::create_dir_all(path_dir)
}
