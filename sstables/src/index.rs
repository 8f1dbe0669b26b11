//! The sparse block index: one [`IndexEntry`] per block, mapping the block's first key
//! to its byte range in the data region, plus the [`IndexBuilder`] the writer uses to
//! accumulate it while streaming entries.

use crate::entry::ENTRY_HEADER_SIZE;
use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Default block size boundary: a new block opens once the current one would exceed
/// this many bytes.
pub const DEFAULT_MAX_BLOCK_LENGTH: u32 = 64 * 1024;

/// Fixed framing overhead for one index entry, before its variable-length key.
const INDEX_ENTRY_HEADER_SIZE: usize = 16;

/// One entry of the sparse index: the first key of a block, and where that block lives
/// in the data region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
  pub key: Vec<u8>,
  pub block_offset: u64,
  pub block_length: u32,
}

impl IndexEntry {
  /// Total on-disk size: `16 + len(key)`.
  pub fn size(&self) -> u64 {
    INDEX_ENTRY_HEADER_SIZE as u64 + self.key.len() as u64
  }

  pub fn encode(&self) -> Result<Vec<u8>> {
    let key_len: u32 = self.key.len().try_into().map_err(|_| Error::TooLarge)?;
    let mut buf = Vec::with_capacity(self.size() as usize);
    buf.extend_from_slice(&key_len.to_be_bytes());
    buf.extend_from_slice(&self.block_offset.to_be_bytes());
    buf.extend_from_slice(&self.block_length.to_be_bytes());
    buf.extend_from_slice(&self.key);
    Ok(buf)
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
    w.write_all(&self.encode()?)?;
    Ok(())
  }

  pub fn decode(bytes: &[u8]) -> Result<IndexEntry> {
    if bytes.len() < INDEX_ENTRY_HEADER_SIZE {
      return Err(Error::Malformed(format!(
        "index entry buffer shorter than {INDEX_ENTRY_HEADER_SIZE} bytes"
      )));
    }
    let key_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let block_offset = u64::from_be_bytes(bytes[4..12].try_into().unwrap());
    let block_length = u32::from_be_bytes(bytes[12..16].try_into().unwrap());
    if bytes.len() != INDEX_ENTRY_HEADER_SIZE + key_len {
      return Err(Error::Malformed(format!(
        "index entry buffer length {} does not match key_len {key_len} + header",
        bytes.len()
      )));
    }
    Ok(IndexEntry { key: bytes[INDEX_ENTRY_HEADER_SIZE..].to_vec(), block_offset, block_length })
  }

  /// Reads one entry, or returns `None` if the stream is exhausted *before* the next
  /// entry starts. A stream that ends partway through the length prefix or the entry
  /// body is [`Error::UnexpectedEof`], not a clean `None`.
  fn read_from<R: Read>(r: &mut R) -> std::result::Result<Option<IndexEntry>, Error> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
      match r.read(&mut len_buf[filled..])? {
        0 if filled == 0 => return Ok(None),
        0 => return Err(Error::UnexpectedEof),
        n => filled += n,
      }
    }
    let key_len = u32::from_be_bytes(len_buf) as usize;
    let mut rest = take_byte_array_vec(r, INDEX_ENTRY_HEADER_SIZE - 4 + key_len)?;
    let mut full = len_buf.to_vec();
    full.append(&mut rest);
    Ok(Some(IndexEntry::decode(&full)?))
  }
}

fn take_byte_array_vec<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>> {
  let mut buf = vec![0u8; len];
  r.read_exact(&mut buf).map_err(|e| {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
      Error::UnexpectedEof
    } else {
      Error::Io(e)
    }
  })?;
  Ok(buf)
}

/// The sparse index: an ordered sequence of [`IndexEntry`], sorted ascending by key,
/// one per block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index(pub Vec<IndexEntry>);

impl Index {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, i: usize) -> Option<&IndexEntry> {
    self.0.get(i)
  }

  /// Returns the index of the entry whose key is the greatest key `<= target`, i.e. the
  /// block that would contain `target` if it is present. Returns `None` when `target` is
  /// smaller than every indexed key, or the index is empty.
  pub fn find(&self, target: &[u8]) -> Option<usize> {
    // `partition_point` finds the first entry whose key is strictly greater than
    // `target`; the block we want is the one just before it.
    let first_greater = self.0.partition_point(|e| e.key.as_slice() <= target);
    first_greater.checked_sub(1)
  }

  /// Reads index entries sequentially until EOF. EOF after at least one complete entry
  /// is not an error; EOF mid-entry is [`Error::Malformed`] via [`Error::UnexpectedEof`].
  pub fn read_from<R: Read>(r: &mut R) -> Result<Index> {
    let mut entries = Vec::new();
    while let Some(entry) = IndexEntry::read_from(r)? {
      entries.push(entry);
    }
    Ok(Index(entries))
  }

  /// Decodes a complete index region that has already been read into memory (the
  /// positioned-read and seek-capable `open` paths both do this, since they know the
  /// exact byte range up front).
  pub fn decode_all(bytes: &[u8]) -> Result<Index> {
    let mut cursor = std::io::Cursor::new(bytes);
    Index::read_from(&mut cursor)
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
    for entry in &self.0 {
      entry.write_to(w)?;
    }
    Ok(())
  }
}

/// Accumulates the sparse index as the writer streams entries, reproducing the
/// asymmetric block-length/offset bookkeeping of the original format exactly: the
/// split test compares `block_length + value_size`, ignoring the new entry's 8-byte
/// framing and key bytes, while both `block_length` and `offset` advance by the entry's
/// full on-disk size. This is a format invariant, not a bug; changing it would produce
/// files with a different block layout than every existing reader expects.
pub struct IndexBuilder {
  max_block_length: u32,
  offset: u64,
  index: Vec<IndexEntry>,
}

impl IndexBuilder {
  pub fn new(max_block_length: u32, start_offset: u64) -> Self {
    IndexBuilder { max_block_length, offset: start_offset, index: Vec::new() }
  }

  pub fn offset(&self) -> u64 {
    self.offset
  }

  /// Records one entry with the given key and value size, opening a new block first if
  /// the current block would overflow.
  pub fn push(&mut self, key: &[u8], value_size: u32) {
    let opens_new_block = match self.index.last() {
      None => true,
      Some(last) => (last.block_length as u64) + (value_size as u64) > self.max_block_length as u64,
    };
    if opens_new_block {
      self.index.push(IndexEntry { key: key.to_vec(), block_offset: self.offset, block_length: 0 });
    }
    let entry_size = ENTRY_HEADER_SIZE as u32 + key.len() as u32 + value_size;
    let last = self.index.last_mut().expect("push always leaves at least one block");
    last.block_length += entry_size;
    self.offset += entry_size as u64;
  }

  pub fn into_index(self) -> Index {
    Index(self.index)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn index_entry_encode_decode_round_trip() {
    let entry = IndexEntry { key: vec![1, 2, 3], block_offset: 16, block_length: 31 };
    let encoded = entry.encode().unwrap();
    assert_eq!(IndexEntry::decode(&encoded).unwrap(), entry);
  }

  #[test]
  fn index_entry_decode_rejects_length_mismatch() {
    let mut encoded = IndexEntry { key: vec![1], block_offset: 0, block_length: 0 }.encode().unwrap();
    encoded.pop();
    assert!(matches!(IndexEntry::decode(&encoded), Err(Error::Malformed(_))));
  }

  #[test]
  fn read_from_stops_cleanly_at_eof_between_entries() {
    let entries = vec![
      IndexEntry { key: vec![1], block_offset: 0, block_length: 10 },
      IndexEntry { key: vec![2], block_offset: 10, block_length: 20 },
    ];
    let mut bytes = Vec::new();
    for e in &entries {
      e.write_to(&mut bytes).unwrap();
    }
    let index = Index::read_from(&mut bytes.as_slice()).unwrap();
    assert_eq!(index.0, entries);
  }

  #[test]
  fn read_from_mid_entry_eof_is_an_error() {
    let mut bytes = IndexEntry { key: vec![1, 2], block_offset: 0, block_length: 10 }.encode().unwrap();
    bytes.truncate(bytes.len() - 1);
    assert!(Index::read_from(&mut bytes.as_slice()).is_err());
  }

  #[test]
  fn find_on_empty_index() {
    assert_eq!(Index::default().find(b"a"), None);
  }

  #[test]
  fn find_matches_spec_example() {
    let index = Index(vec![
      IndexEntry { key: vec![1, 2, 3], block_offset: 0, block_length: 60023 },
      IndexEntry { key: vec![2, 3, 4], block_offset: 60023, block_length: 30011 },
    ]);
    assert_eq!(index.find(&[1, 2]), None);
    assert_eq!(index.find(&[1, 2, 3]), Some(0));
    assert_eq!(index.find(&[1, 2, 3, 4]), Some(0));
    assert_eq!(index.find(&[2, 3, 4]), Some(1));
    assert_eq!(index.find(&[2, 3, 5]), Some(1));
  }

  #[test]
  fn builder_matches_sparse_index_split_example() {
    let mut builder = IndexBuilder::new(DEFAULT_MAX_BLOCK_LENGTH, 0);
    builder.push(&[1, 2, 3], 30_000);
    builder.push(&[1, 2, 3, 4], 30_000);
    builder.push(&[2, 3, 4], 30_000);
    let index = builder.into_index();

    assert_eq!(
      index.0,
      vec![
        IndexEntry { key: vec![1, 2, 3], block_offset: 0, block_length: 60023 },
        IndexEntry { key: vec![2, 3, 4], block_offset: 60023, block_length: 30011 },
      ]
    );
  }

  #[test]
  fn builder_opens_first_block_on_empty_index() {
    let mut builder = IndexBuilder::new(DEFAULT_MAX_BLOCK_LENGTH, 16);
    builder.push(b"a", 1);
    let index = builder.into_index();
    assert_eq!(index.0[0].block_offset, 16);
  }
}
