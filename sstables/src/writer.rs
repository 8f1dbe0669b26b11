//! Streams sorted entries into an SSTable, building the sparse index as it goes and
//! finalizing the header and index once the caller closes it.
//!
//! Finalizing requires rewriting the 16-byte header at offset 0 after the data and
//! index have already been written past it — a random-access operation that not every
//! backing can offer. [`RandomAccessSink`] is the capability dispatch for that single
//! operation: a seek-capable sink, a positioned-write sink, and a stream-only sink that
//! fails the moment `close` tries to use it.

use crate::byteio::PositionedWrite;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::index::{IndexBuilder, DEFAULT_MAX_BLOCK_LENGTH};
use std::io::{Seek, SeekFrom, Write};

/// A sink that can have its header patched in place after the rest of the file has
/// been written.
pub trait RandomAccessSink: Write {
  /// Overwrites the first `header.len()` bytes of the sink with `header`, without
  /// disturbing the current write position's eventual flush.
  fn patch_header(&mut self, header: &[u8]) -> Result<()>;
}

/// Wraps any `Write + Seek` sink (a [`std::fs::File`], an in-memory `Cursor<Vec<u8>>`).
pub struct SeekSink<W: Write + Seek>(pub W);

impl<W: Write + Seek> Write for SeekSink<W> {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.write(buf)
  }
  fn flush(&mut self) -> std::io::Result<()> {
    self.0.flush()
  }
}

impl<W: Write + Seek> RandomAccessSink for SeekSink<W> {
  fn patch_header(&mut self, header: &[u8]) -> Result<()> {
    let current = self.0.stream_position()?;
    self.0.seek(SeekFrom::Start(0))?;
    self.0.write_all(header)?;
    self.0.seek(SeekFrom::Start(current))?;
    Ok(())
  }
}

/// Wraps a sink that supports positioned writes without seeking (e.g. a [`std::fs::File`]
/// via `write_at` on Unix, used when the same handle might be written concurrently from
/// elsewhere and a shared cursor position would race).
pub struct PositionedSink<W: PositionedWrite + Write>(pub W);

impl<W: PositionedWrite + Write> Write for PositionedSink<W> {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.write(buf)
  }
  fn flush(&mut self) -> std::io::Result<()> {
    self.0.flush()
  }
}

impl<W: PositionedWrite + Write> RandomAccessSink for PositionedSink<W> {
  fn patch_header(&mut self, header: &[u8]) -> Result<()> {
    self.0.write_at(header, 0)?;
    Ok(())
  }
}

/// Wraps a `Write`-only, non-seekable sink (an unbuffered pipe, a socket). Finalizing
/// such a writer is always [`Error::NotRandomAccess`]: callers that only have a stream
/// to write to must either pre-reserve the header some other way, or route through
/// [`crate::recordio`] instead, which never needs one.
pub struct StreamSink<W: Write>(pub W);

impl<W: Write> Write for StreamSink<W> {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.write(buf)
  }
  fn flush(&mut self) -> std::io::Result<()> {
    self.0.flush()
  }
}

impl<W: Write> RandomAccessSink for StreamSink<W> {
  fn patch_header(&mut self, _header: &[u8]) -> Result<()> {
    Err(Error::NotRandomAccess)
  }
}

/// Configures block size for a new [`Writer`]. Defaults to
/// [`crate::index::DEFAULT_MAX_BLOCK_LENGTH`].
#[derive(Debug, Clone, Copy)]
pub struct WriterBuilder {
  max_block_length: u32,
}

impl Default for WriterBuilder {
  fn default() -> Self {
    WriterBuilder { max_block_length: DEFAULT_MAX_BLOCK_LENGTH }
  }
}

impl WriterBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn max_block_length(mut self, max_block_length: u32) -> Self {
    self.max_block_length = max_block_length;
    self
  }

  pub fn build<S: RandomAccessSink>(self, sink: S) -> Writer<S> {
    Writer::with_max_block_length(sink, self.max_block_length)
  }
}

/// Streams entries into an SSTable. Entries must arrive in non-decreasing key order
/// (duplicate keys are accepted); [`Writer::write`] rejects a key decrease with
/// [`Error::UnsortedKeys`].
pub struct Writer<S: RandomAccessSink> {
  sink: S,
  index: IndexBuilder,
  last_key: Option<Vec<u8>>,
  num_entries: u32,
  closed: bool,
  header_reserved: bool,
}

const PLACEHOLDER_HEADER: [u8; crate::header::HEADER_SIZE] = [0; crate::header::HEADER_SIZE];

impl<S: RandomAccessSink> Writer<S> {
  pub fn new(sink: S) -> Self {
    Self::with_max_block_length(sink, DEFAULT_MAX_BLOCK_LENGTH)
  }

  fn with_max_block_length(sink: S, max_block_length: u32) -> Self {
    Writer {
      sink,
      index: IndexBuilder::new(max_block_length, crate::header::HEADER_SIZE as u64),
      last_key: None,
      num_entries: 0,
      closed: false,
      header_reserved: false,
    }
  }

  /// Writes one entry. The first call reserves space for the header; every call
  /// thereafter must carry a key not strictly less than the previous one. Duplicate
  /// keys are accepted.
  pub fn write(&mut self, entry: Entry) -> Result<()> {
    if self.closed {
      return Err(Error::AlreadyClosed);
    }
    if !self.header_reserved {
      self.sink.write_all(&PLACEHOLDER_HEADER)?;
      self.header_reserved = true;
    }
    if let Some(last_key) = &self.last_key {
      if entry.key.as_slice() < last_key.as_slice() {
        return Err(Error::UnsortedKeys);
      }
    }

    let value_len: u32 = entry.value.len().try_into().map_err(|_| Error::TooLarge)?;
    self.index.push(&entry.key, value_len);
    self.last_key = Some(entry.key.clone());
    self.num_entries += 1;
    entry.write_to(&mut self.sink)
  }

  /// Appends the sparse index, patches in the final header, and flushes. Closing an
  /// empty writer still reserves and writes a valid zero-block header. Takes `&mut
  /// self` rather than consuming the writer so that a second `write` or `close` call
  /// observes [`Error::AlreadyClosed`] instead of being rejected by the borrow checker.
  pub fn close(&mut self) -> Result<()> {
    if self.closed {
      return Err(Error::AlreadyClosed);
    }
    if !self.header_reserved {
      self.sink.write_all(&PLACEHOLDER_HEADER)?;
      self.header_reserved = true;
    }
    self.closed = true;

    let index_offset = self.index.offset();
    let index = std::mem::take(&mut self.index).into_index();
    index.write_to(&mut self.sink)?;

    let header = Header::new(index.len() as u32, index_offset);
    self.sink.patch_header(&header.encode())?;
    self.sink.flush()?;
    log::debug!("closed sstable: {} entries, {} blocks", self.num_entries, header.num_blocks);
    Ok(())
  }
}

impl Default for IndexBuilder {
  fn default() -> Self {
    IndexBuilder::new(DEFAULT_MAX_BLOCK_LENGTH, crate::header::HEADER_SIZE as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sstable::SSTable;
  use std::io::Cursor as IoCursor;

  #[test]
  fn write_and_close_produces_readable_table() {
    let mut buf = Vec::new();
    {
      let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
      writer.write(Entry::new(b"a".to_vec(), b"1".to_vec())).unwrap();
      writer.write(Entry::new(b"b".to_vec(), b"2".to_vec())).unwrap();
      writer.close().unwrap();
    }

    let total_len = buf.len() as u64;
    let table = SSTable::open(buf, total_len).unwrap();
    assert_eq!(table.header().num_blocks, 1);

    let mut cursor = table.scan_from(None);
    assert_eq!(cursor.entry().unwrap().key, b"a".to_vec());
    cursor.next();
    assert_eq!(cursor.entry().unwrap().key, b"b".to_vec());
    cursor.next();
    assert!(cursor.done());
  }

  #[test]
  fn closing_empty_writer_produces_zero_block_header() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
    writer.close().unwrap();

    let total_len = buf.len() as u64;
    let table = SSTable::open(buf, total_len).unwrap();
    assert_eq!(table.header().num_blocks, 0);
  }

  #[test]
  fn out_of_order_key_is_rejected() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
    writer.write(Entry::new(b"b".to_vec(), vec![])).unwrap();
    assert!(matches!(writer.write(Entry::new(b"a".to_vec(), vec![])), Err(Error::UnsortedKeys)));
  }

  #[test]
  fn duplicate_key_is_accepted() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
    writer.write(Entry::new(b"a".to_vec(), b"1".to_vec())).unwrap();
    writer.write(Entry::new(b"a".to_vec(), b"2".to_vec())).unwrap();
    writer.close().unwrap();

    let total_len = buf.len() as u64;
    let table = SSTable::open(buf, total_len).unwrap();
    let mut cursor = table.scan_from(None);
    assert_eq!(cursor.entry().unwrap().value, b"1".to_vec());
    cursor.next();
    assert_eq!(cursor.entry().unwrap().value, b"2".to_vec());
    cursor.next();
    assert!(cursor.done());
  }

  #[test]
  fn writing_after_close_is_rejected() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
    writer.write(Entry::new(b"a".to_vec(), vec![])).unwrap();
    writer.close().unwrap();
    assert!(matches!(
      writer.write(Entry::new(b"b".to_vec(), vec![])),
      Err(Error::AlreadyClosed)
    ));
  }

  #[test]
  fn closing_twice_is_rejected() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(SeekSink(IoCursor::new(&mut buf)));
    writer.close().unwrap();
    assert!(matches!(writer.close(), Err(Error::AlreadyClosed)));
  }

  #[test]
  fn stream_sink_fails_to_finalize() {
    let mut out = Vec::new();
    let mut writer = Writer::new(StreamSink(&mut out));
    writer.write(Entry::new(b"a".to_vec(), vec![])).unwrap();
    assert!(matches!(writer.close(), Err(Error::NotRandomAccess)));
  }

  #[test]
  fn positioned_sink_finalizes_without_seeking() {
    let file = tempfile::tempfile().unwrap();
    let mut writer = Writer::new(PositionedSink(file));
    writer.write(Entry::new(b"a".to_vec(), b"1".to_vec())).unwrap();
    writer.write(Entry::new(b"b".to_vec(), b"2".to_vec())).unwrap();
    writer.close().unwrap();
  }
}
