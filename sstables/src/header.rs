//! The fixed 16-byte file preamble: `version:u32 | num_blocks:u32 | index_offset:u64`.

use crate::byteio::take_byte_array;
use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Number of bytes a [`Header`] occupies on disk.
pub const HEADER_SIZE: usize = 16;

/// Only version this crate writes, and the only one it accepts on read. See the
/// "Version field" design note: hardening to reject other versions at open time is
/// intentional, unlike the looser sources this format was distilled from.
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub version: u32,
  pub num_blocks: u32,
  pub index_offset: u64,
}

impl Header {
  pub fn new(num_blocks: u32, index_offset: u64) -> Self {
    Header { version: FORMAT_VERSION, num_blocks, index_offset }
  }

  pub fn encode(&self) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&self.version.to_be_bytes());
    buf[4..8].copy_from_slice(&self.num_blocks.to_be_bytes());
    buf[8..16].copy_from_slice(&self.index_offset.to_be_bytes());
    buf
  }

  /// Decodes a header from a slice that must be exactly [`HEADER_SIZE`] bytes long.
  /// Rejects any `version` other than [`FORMAT_VERSION`]: this crate has exactly one
  /// writer and one format generation, so there is no older layout to stay lenient for.
  pub fn decode(bytes: &[u8]) -> Result<Header> {
    if bytes.len() != HEADER_SIZE {
      return Err(Error::Malformed(format!("header is {} bytes, expected {HEADER_SIZE}", bytes.len())));
    }
    let version = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    if version != FORMAT_VERSION {
      return Err(Error::Malformed(format!("unsupported format version {version}, expected {FORMAT_VERSION}")));
    }
    Ok(Header {
      version,
      num_blocks: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
      index_offset: u64::from_be_bytes(bytes[8..16].try_into().unwrap()),
    })
  }

  pub fn read_from<R: Read>(r: &mut R) -> Result<Header> {
    Header::decode(&take_byte_array::<HEADER_SIZE, _>(r)?)
  }

  pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
    w.write_all(&self.encode())?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encode_matches_known_bytes() {
    let header = Header { version: 1, num_blocks: 2, index_offset: 3 };
    assert_eq!(
      header.encode(),
      [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 3]
    );
  }

  #[test]
  fn decode_round_trips_encode() {
    let header = Header { version: 2, num_blocks: 17, index_offset: 1_000_000 };
    assert_eq!(Header::decode(&header.encode()).unwrap(), header);
  }

  #[test]
  fn decode_rejects_wrong_length() {
    assert!(matches!(Header::decode(&[0; 15]), Err(Error::Malformed(_))));
    assert!(matches!(Header::decode(&[0; 17]), Err(Error::Malformed(_))));
  }

  #[test]
  fn new_always_writes_current_version() {
    assert_eq!(Header::new(5, 100).version, FORMAT_VERSION);
  }

  #[test]
  fn decode_rejects_unknown_version() {
    let header = Header { version: FORMAT_VERSION + 1, num_blocks: 0, index_offset: HEADER_SIZE as u64 };
    assert!(matches!(Header::decode(&header.encode()), Err(Error::Malformed(_))));
  }
}
