//! Forward iteration over a byte range of a backing reader.
//!
//! A [`Cursor`] is the single abstraction every read path in this crate produces and
//! consumes: [`crate::sstable::SSTable::scan_from`], [`crate::recordio::record_io_reader`],
//! and the external sort ([`crate::sort::sort_run`], [`crate::sort::merge`]) all operate
//! purely in terms of this trait, never the concrete backing underneath it.

use crate::byteio::PositionedRead;
use crate::entry::Entry;
use crate::error::Error;
use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;

/// A single-pass forward iterator over entries in file order.
///
/// `entry()` and `next()` are split, rather than folded into a single
/// `Iterator::next`, so that repeated calls to `entry()` without an intervening
/// `next()` return the same value — callers that need to peek before deciding whether
/// to advance (e.g. `scan_from`'s forward-filter, or the k-way merge's heap seeding)
/// rely on this.
///
/// A read failure mid-scan does not panic or propagate through `entry`/`next`/`done`;
/// the cursor simply reports itself done from that point on. Call [`Cursor::take_err`]
/// to distinguish "ran out of entries" from "the backing failed".
pub trait Cursor {
  /// Returns the entry at the current position, reading and caching it on first access.
  /// Returns `None` once the cursor is exhausted or has failed.
  fn entry(&mut self) -> Option<&Entry>;

  /// Advances past the current entry. If nothing has been read yet at this position,
  /// reads (and discards) it first, so that one `next()` always consumes exactly one
  /// entry.
  fn next(&mut self);

  /// True once there is no cached entry and no more bytes remain to read.
  fn done(&mut self) -> bool;

  /// Returns and clears any I/O or format error encountered while reading. `None` if
  /// the cursor is simply exhausted.
  fn take_err(&mut self) -> Option<Error>;
}

/// A cursor that is always immediately done. Returned by `scan_from` when a
/// stream-only [`crate::sstable::SSTable`] has already been scanned once, or when an
/// `open`/`scan_from` call fails to parse far enough to build a real cursor.
pub struct DoneCursor {
  err: Option<Error>,
}

impl DoneCursor {
  pub fn new() -> Self {
    DoneCursor { err: None }
  }

  pub fn from_error(err: Error) -> Self {
    DoneCursor { err: Some(err) }
  }
}

impl Default for DoneCursor {
  fn default() -> Self {
    Self::new()
  }
}

impl Cursor for DoneCursor {
  fn entry(&mut self) -> Option<&Entry> {
    None
  }

  fn next(&mut self) {}

  fn done(&mut self) -> bool {
    true
  }

  fn take_err(&mut self) -> Option<Error> {
    self.err.take()
  }
}

/// A cursor over `[offset, end_offset)` of a shared positioned-read backing. Used by
/// [`crate::sstable::SSTable`]'s positioned-read (`ReadAt`-capable) open path, where
/// many cursors can be alive over the same backing at once.
pub struct BlockCursor<R: PositionedRead> {
  reader: Rc<R>,
  offset: u64,
  end_offset: u64,
  cache: Option<Entry>,
  err: Option<Error>,
}

impl<R: PositionedRead> BlockCursor<R> {
  pub fn new(reader: Rc<R>, offset: u64, end_offset: u64) -> Self {
    BlockCursor { reader, offset, end_offset, cache: None, err: None }
  }
}

impl<R: PositionedRead> Cursor for BlockCursor<R> {
  fn entry(&mut self) -> Option<&Entry> {
    if self.cache.is_none() && self.err.is_none() && self.offset < self.end_offset {
      match Entry::read_at(self.reader.as_ref(), self.offset) {
        Ok(entry) => {
          self.offset += entry.size();
          self.cache = Some(entry);
        }
        Err(e) => self.err = Some(e),
      }
    }
    self.cache.as_ref()
  }

  fn next(&mut self) {
    if self.cache.is_none() {
      self.entry();
    }
    self.cache = None;
  }

  fn done(&mut self) -> bool {
    self.entry();
    self.cache.is_none()
  }

  fn take_err(&mut self) -> Option<Error> {
    self.err.take()
  }
}

/// A cursor over `[offset, end_offset)` of a single-pass `Read` stream, consumed
/// sequentially and never sought. Used by stream-only `SSTable` opens and by
/// [`crate::recordio::record_io_reader`].
pub struct StreamCursor<R: Read> {
  reader: Rc<RefCell<Option<R>>>,
  offset: u64,
  end_offset: u64,
  cache: Option<Entry>,
  err: Option<Error>,
}

impl<R: Read> StreamCursor<R> {
  pub fn new(reader: R, end_offset: u64) -> Self {
    StreamCursor {
      reader: Rc::new(RefCell::new(Some(reader))),
      offset: 0,
      end_offset,
      cache: None,
      err: None,
    }
  }
}

impl<R: Read> Cursor for StreamCursor<R> {
  fn entry(&mut self) -> Option<&Entry> {
    if self.cache.is_none() && self.err.is_none() && self.offset < self.end_offset {
      let mut slot = self.reader.borrow_mut();
      match slot.as_mut() {
        Some(reader) => match Entry::read_from(reader) {
          Ok(entry) => {
            self.offset += entry.size();
            self.cache = Some(entry);
          }
          Err(e) => self.err = Some(e),
        },
        None => self.err = Some(Error::UnexpectedEof),
      }
    }
    self.cache.as_ref()
  }

  fn next(&mut self) {
    if self.cache.is_none() {
      self.entry();
    }
    self.cache = None;
  }

  fn done(&mut self) -> bool {
    self.entry();
    self.cache.is_none()
  }

  fn take_err(&mut self) -> Option<Error> {
    self.err.take()
  }
}

/// Advances `cursor` while it has an entry whose key is strictly less than `key`. Shared
/// by every `scan_from` implementation in [`crate::sstable`].
pub fn advance_while_less_than(cursor: &mut dyn Cursor, key: &[u8]) {
  while !cursor.done() {
    match cursor.entry() {
      Some(entry) if entry.key.as_slice() < key => cursor.next(),
      _ => break,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode_all(entries: &[Entry]) -> Vec<u8> {
    let mut buf = Vec::new();
    for e in entries {
      e.write_to(&mut buf).unwrap();
    }
    buf
  }

  #[test]
  fn block_cursor_visits_entries_in_order() {
    let entries = vec![Entry::new(b"a".to_vec(), b"1".to_vec()), Entry::new(b"b".to_vec(), b"2".to_vec())];
    let data = Rc::new(encode_all(&entries));
    let len = data.len() as u64;
    let mut cursor = BlockCursor::new(data, 0, len);

    assert_eq!(cursor.entry(), Some(&entries[0]));
    assert_eq!(cursor.entry(), Some(&entries[0]), "repeated entry() without next() is stable");
    cursor.next();
    assert_eq!(cursor.entry(), Some(&entries[1]));
    cursor.next();
    assert!(cursor.done());
    assert!(cursor.take_err().is_none());
  }

  #[test]
  fn stream_cursor_visits_entries_in_order() {
    let entries = vec![Entry::new(b"x".to_vec(), b"1".to_vec()), Entry::new(b"y".to_vec(), b"2".to_vec())];
    let data = encode_all(&entries);
    let len = data.len() as u64;
    let mut cursor = StreamCursor::new(data.as_slice(), len);

    assert_eq!(cursor.entry(), Some(&entries[0]));
    cursor.next();
    assert_eq!(cursor.entry(), Some(&entries[1]));
    cursor.next();
    assert!(cursor.done());
  }

  #[test]
  fn done_cursor_is_always_done() {
    let mut cursor = DoneCursor::new();
    assert!(cursor.done());
    assert_eq!(cursor.entry(), None);
  }

  #[test]
  fn advance_while_less_than_stops_at_first_match() {
    let entries = vec![
      Entry::new(b"a".to_vec(), vec![]),
      Entry::new(b"b".to_vec(), vec![]),
      Entry::new(b"c".to_vec(), vec![]),
    ];
    let data = Rc::new(encode_all(&entries));
    let len = data.len() as u64;
    let mut cursor = BlockCursor::new(data, 0, len);

    advance_while_less_than(&mut cursor, b"c");
    assert_eq!(cursor.entry().map(|e| e.key.clone()), Some(b"c".to_vec()));
  }
}
