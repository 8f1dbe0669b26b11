//! Opens an SSTable file and serves ordered scans from it.
//!
//! Per the design note on polymorphism over backing I/O: the three capability classes a
//! backing reader might offer (positioned reads, seek, sequential-only) produce
//! genuinely different `scan_from` semantics, so they're modeled as three distinct
//! types rather than one type erasing the capability at runtime.

use crate::byteio::PositionedRead;
use crate::cursor::{advance_while_less_than, BlockCursor, Cursor, DoneCursor, StreamCursor};
use crate::error::{Error, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::index::Index;
use std::cell::Cell;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

/// An SSTable opened over a backing that supports positioned reads (e.g. [`std::fs::File`]
/// on Unix, or an in-memory buffer). The common case: many cursors can be produced from
/// one open table, and they may be alive concurrently.
pub struct SSTable<R: PositionedRead> {
  reader: Rc<R>,
  header: Header,
  index: Index,
}

impl<R: PositionedRead + 'static> SSTable<R> {
  /// Reads the header at offset 0, then the index starting at `header.index_offset`,
  /// continuing to `total_len`.
  pub fn open(reader: R, total_len: u64) -> Result<Self> {
    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_at(&mut header_buf, 0)?;
    let header = Header::decode(&header_buf)?;
    if header.index_offset < HEADER_SIZE as u64 || header.index_offset > total_len {
      return Err(Error::Malformed("index_offset out of range".into()));
    }

    let index_len = (total_len - header.index_offset) as usize;
    let mut index_buf = vec![0u8; index_len];
    reader.read_at(&mut index_buf, header.index_offset)?;
    let index = Index::decode_all(&index_buf)?;
    log::debug!("opened sstable: {} blocks, index_offset {}", header.num_blocks, header.index_offset);

    Ok(SSTable { reader: Rc::new(reader), header, index })
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  pub fn index(&self) -> &Index {
    &self.index
  }

  /// Returns a cursor over every entry from `key` (inclusive) onward, or from the start
  /// of the data region if `key` is `None`.
  pub fn scan_from(&self, key: Option<&[u8]>) -> Box<dyn Cursor> {
    let key = match key {
      None => return Box::new(BlockCursor::new(Rc::clone(&self.reader), HEADER_SIZE as u64, self.header.index_offset)),
      Some(key) => key,
    };

    // A `None` from `find` means the key is smaller than every indexed key; start at
    // the first block anyway and let the forward filter below fall through every entry
    // in it, per the "smallest key fallback" design note.
    let block = self.index.find(key).unwrap_or(0);
    let start_offset = self.index.get(block).map(|e| e.block_offset).unwrap_or(HEADER_SIZE as u64);

    let mut cursor = BlockCursor::new(Rc::clone(&self.reader), start_offset, self.header.index_offset);
    advance_while_less_than(&mut cursor, key);
    Box::new(cursor)
  }
}

/// An SSTable opened over a `Read + Seek` backing that does not support positioned
/// reads directly (e.g. most non-Unix file handles, or a `BufReader`). Every cursor
/// produced from one `SSTable` shares the single underlying reader and must not be
/// used concurrently with another.
pub struct SeekSSTable<R: Read + Seek> {
  reader: Rc<std::cell::RefCell<R>>,
  header: Header,
  index: Index,
}

impl<R: Read + Seek + 'static> SeekSSTable<R> {
  pub fn open(mut reader: R) -> Result<Self> {
    reader.seek(SeekFrom::Start(0))?;
    let header = Header::read_from(&mut reader)?;

    reader.seek(SeekFrom::Start(header.index_offset))?;
    let index = Index::read_from(&mut reader)?;

    Ok(SeekSSTable { reader: Rc::new(std::cell::RefCell::new(reader)), header, index })
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  pub fn index(&self) -> &Index {
    &self.index
  }

  pub fn scan_from(&self, key: Option<&[u8]>) -> Result<Box<dyn Cursor>> {
    let start_offset = match key {
      None => HEADER_SIZE as u64,
      Some(key) => {
        let block = self.index.find(key).unwrap_or(0);
        self.index.get(block).map(|e| e.block_offset).unwrap_or(HEADER_SIZE as u64)
      }
    };
    self.reader.borrow_mut().seek(SeekFrom::Start(start_offset))?;

    let mut cursor = SeekBlockCursor {
      reader: Rc::clone(&self.reader),
      offset: start_offset,
      end_offset: self.header.index_offset,
      cache: None,
      err: None,
    };
    if let Some(key) = key {
      advance_while_less_than(&mut cursor, key);
    }
    Ok(Box::new(cursor))
  }
}

/// Backs a [`SeekSSTable`] cursor: seeks the shared reader to its own `offset` before
/// every read, since other cursors sharing the same reader may have moved it.
struct SeekBlockCursor<R: Read + Seek> {
  reader: Rc<std::cell::RefCell<R>>,
  offset: u64,
  end_offset: u64,
  cache: Option<crate::entry::Entry>,
  err: Option<Error>,
}

impl<R: Read + Seek> Cursor for SeekBlockCursor<R> {
  fn entry(&mut self) -> Option<&crate::entry::Entry> {
    if self.cache.is_none() && self.err.is_none() && self.offset < self.end_offset {
      let mut reader = self.reader.borrow_mut();
      let result = reader.seek(SeekFrom::Start(self.offset)).map_err(Error::from).and_then(|_| crate::entry::Entry::read_from(&mut *reader));
      match result {
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

/// An SSTable opened over a single-pass `Read` stream with no seek and no positioned
/// read. Only the header can be parsed; the index stays empty, and exactly one
/// sequential forward scan is permitted.
pub struct StreamSSTable<R: Read> {
  reader: Rc<std::cell::RefCell<Option<R>>>,
  header: Header,
  scanned: Cell<bool>,
}

impl<R: Read + 'static> StreamSSTable<R> {
  pub fn open(mut reader: R) -> Result<Self> {
    let header = Header::read_from(&mut reader)?;
    Ok(StreamSSTable {
      reader: Rc::new(std::cell::RefCell::new(Some(reader))),
      header,
      scanned: Cell::new(false),
    })
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  /// Returns a cursor on the first call; a [`DoneCursor`] on every call after that,
  /// since the underlying stream has already been consumed.
  pub fn scan_from(&self, key: Option<&[u8]>) -> Box<dyn Cursor> {
    if self.scanned.replace(true) {
      return Box::new(DoneCursor::new());
    }
    let reader = self.reader.borrow_mut().take().expect("scanned flag guards single use");
    let mut cursor = StreamCursor::new(reader, self.header.index_offset - HEADER_SIZE as u64);
    if let Some(key) = key {
      advance_while_less_than(&mut cursor, key);
    }
    Box::new(cursor)
  }
}
