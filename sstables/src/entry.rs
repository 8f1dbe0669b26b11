//! The entry codec: `key_len:u32 | value_len:u32 | key_bytes | value_bytes`, all
//! integers big-endian. This is the only record type ever written to the data region of
//! an SSTable, and is also the sole content of a RecordIO stream.

use crate::byteio::{take_byte_array, take_byte_slice, PositionedRead};
use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Fixed framing overhead: a `u32` key length plus a `u32` value length.
pub const ENTRY_HEADER_SIZE: u64 = 8;

/// A key/value pair. Keys carry no structure of their own; ordering is lexicographic
/// over the raw bytes. Empty keys and empty values are legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub key: Vec<u8>,
  pub value: Vec<u8>,
}

impl Entry {
  pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
    Entry { key: key.into(), value: value.into() }
  }

  /// Total on-disk size of this entry: `8 + len(key) + len(value)`. Does not encode.
  pub fn size(&self) -> u64 {
    ENTRY_HEADER_SIZE + self.key.len() as u64 + self.value.len() as u64
  }

  /// Encodes this entry to its wire form. Fails with [`Error::TooLarge`] if either the
  /// key or the value is longer than `u32::MAX` bytes.
  pub fn encode(&self) -> Result<Vec<u8>> {
    let key_len: u32 = self.key.len().try_into().map_err(|_| Error::TooLarge)?;
    let value_len: u32 = self.value.len().try_into().map_err(|_| Error::TooLarge)?;

    let mut buf = Vec::with_capacity(ENTRY_HEADER_SIZE as usize + self.key.len() + self.value.len());
    buf.extend_from_slice(&key_len.to_be_bytes());
    buf.extend_from_slice(&value_len.to_be_bytes());
    buf.extend_from_slice(&self.key);
    buf.extend_from_slice(&self.value);
    Ok(buf)
  }

  /// Writes this entry's wire form to `w`.
  pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
    w.write_all(&self.encode()?)?;
    Ok(())
  }

  /// Decodes an entry from a complete, self-contained byte slice. Fails with
  /// [`Error::Malformed`] if `bytes` is shorter than 8 bytes or its length doesn't equal
  /// `8 + key_len + value_len`.
  pub fn decode(bytes: &[u8]) -> Result<Entry> {
    if bytes.len() < ENTRY_HEADER_SIZE as usize {
      return Err(Error::Malformed(format!("entry buffer shorter than {ENTRY_HEADER_SIZE} bytes")));
    }
    let key_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let value_len = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize;
    if bytes.len() != ENTRY_HEADER_SIZE as usize + key_len + value_len {
      return Err(Error::Malformed(format!(
        "entry buffer length {} does not match key_len {} + value_len {} + header",
        bytes.len(),
        key_len,
        value_len
      )));
    }
    let key = bytes[8..8 + key_len].to_vec();
    let value = bytes[8 + key_len..].to_vec();
    Ok(Entry { key, value })
  }

  /// Reads one entry from a sequential stream: the 8-byte length prefix, then exactly
  /// `key_len + value_len` payload bytes. A short read at any point is
  /// [`Error::UnexpectedEof`].
  pub fn read_from<R: Read>(r: &mut R) -> Result<Entry> {
    let key_len = u32::from_be_bytes(take_byte_array::<4, _>(r)?) as usize;
    let value_len = u32::from_be_bytes(take_byte_array::<4, _>(r)?) as usize;
    let key = take_byte_slice(r, key_len)?;
    let value = take_byte_slice(r, value_len)?;
    Ok(Entry { key, value })
  }

  /// Positioned variant of [`Entry::read_from`]: reads the length prefix at `offset`,
  /// then the whole record, without disturbing any other reader sharing the same
  /// backing.
  pub fn read_at<R: PositionedRead + ?Sized>(r: &R, offset: u64) -> Result<Entry> {
    let mut len_buf = [0u8; ENTRY_HEADER_SIZE as usize];
    r.read_at(&mut len_buf, offset).map_err(map_positioned_eof)?;
    let key_len = u32::from_be_bytes(len_buf[0..4].try_into().unwrap()) as usize;
    let value_len = u32::from_be_bytes(len_buf[4..8].try_into().unwrap()) as usize;

    let mut buf = vec![0u8; ENTRY_HEADER_SIZE as usize + key_len + value_len];
    r.read_at(&mut buf, offset).map_err(map_positioned_eof)?;
    Entry::decode(&buf)
  }
}

fn map_positioned_eof(e: std::io::Error) -> Error {
  if e.kind() == std::io::ErrorKind::UnexpectedEof {
    Error::UnexpectedEof
  } else {
    Error::Io(e)
  }
}
