//! Small I/O primitives shared by the entry, header, and index codecs, plus the
//! positioned-access traits that let [`crate::sstable::SSTable`] and
//! [`crate::writer::Writer`] dispatch on what their backing reader/writer can actually
//! do instead of assuming every backing is seekable.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Read};

/// Reads a fixed-size byte array from `r`, failing with [`Error::UnexpectedEof`] on a
/// short read instead of a partially filled buffer.
#[inline]
pub fn take_byte_array<const C: usize, R: Read + ?Sized>(r: &mut R) -> Result<[u8; C]> {
  let mut buf = [0; C];
  read_exact(r, &mut buf)?;
  Ok(buf)
}

/// Reads `len` bytes from `r` into a freshly allocated `Vec<u8>`.
#[inline]
pub fn take_byte_slice<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>> {
  let mut buf = vec![0; len];
  read_exact(r, &mut buf)?;
  Ok(buf)
}

/// Like [`Read::read_exact`], but maps the "ran out of bytes partway through a record"
/// case to [`Error::UnexpectedEof`] instead of leaking `io::ErrorKind::UnexpectedEof`
/// verbatim, so callers can match on our own taxonomy.
fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<()> {
  match r.read_exact(buf) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::UnexpectedEof),
    Err(e) => Err(Error::Io(e)),
  }
}

/// A backing that can be read from an arbitrary byte offset without disturbing any
/// other reader of the same backing. Implemented for [`File`] (via platform positioned
/// reads) and for in-memory byte slices.
///
/// This is the Rust analogue of Go's `io.ReaderAt`, and exists so that
/// [`crate::sstable::SSTable`] can share one backing across many concurrently-live
/// [`crate::cursor::Cursor`]s without a `RefCell`.
pub trait PositionedRead {
  fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl PositionedRead for File {
  fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
      use std::os::unix::fs::FileExt;
      FileExt::read_exact_at(self, buf, offset)
    }
    #[cfg(not(unix))]
    {
      use std::io::{Read, Seek, SeekFrom};
      let mut file = self.try_clone()?;
      file.seek(SeekFrom::Start(offset))?;
      file.read_exact(buf)
    }
  }
}

impl PositionedRead for [u8] {
  fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
    let start = offset as usize;
    let end = start
      .checked_add(buf.len())
      .filter(|&end| end <= self.len())
      .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of buffer"))?;
    buf.copy_from_slice(&self[start..end]);
    Ok(())
  }
}

impl PositionedRead for Vec<u8> {
  fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
    self.as_slice().read_at(buf, offset)
  }
}

/// A backing that can have bytes rewritten at an arbitrary offset. Used to finalise the
/// header at [`crate::writer::Writer::close`] time.
///
/// Implemented for [`File`] via platform positioned writes; in-memory sinks go through
/// [`crate::writer::SeekSink`] instead, since they're cheaply seekable.
pub trait PositionedWrite {
  fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<()>;
}

impl PositionedWrite for File {
  fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
      use std::os::unix::fs::FileExt;
      FileExt::write_all_at(self, buf, offset)
    }
    #[cfg(not(unix))]
    {
      use std::io::{Seek, SeekFrom};
      self.seek(SeekFrom::Start(offset))?;
      Write::write_all(self, buf)
    }
  }
}
