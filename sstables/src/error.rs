//! Error taxonomy for the storage engine.
//!
//! Every fallible operation in this crate returns [`Result`], which wraps a single
//! [`Error`] enum rather than a grab bag of `io::Error`s with ad-hoc messages. This
//! mirrors the error-enum-per-crate convention used across the storage engines in this
//! space: one variant per failure *kind*, not per call site.

use std::io;
use thiserror::Error;

/// Errors produced by the entry/header/index codecs, the writer, the reader, and the
/// external sort.
#[derive(Error, Debug)]
pub enum Error {
  /// A length prefix disagrees with the record it describes: a header is not exactly
  /// 16 bytes, an entry's `key_len + value_len` doesn't match the buffer it was decoded
  /// from, or an index entry's `key_len` doesn't match its trailing key bytes.
  #[error("malformed record: {0}")]
  Malformed(String),

  /// A stream ended inside a record whose length prefix had already been read.
  #[error("unexpected EOF reading record")]
  UnexpectedEof,

  /// [`crate::writer::Writer::write`] was called with a key strictly less than the
  /// previous key written.
  #[error("keys written out of order")]
  UnsortedKeys,

  /// An entry's key or value is longer than `u32::MAX` bytes.
  #[error("key or value exceeds maximum length of {}", u32::MAX)]
  TooLarge,

  /// [`crate::writer::Writer::close`] was called a second time.
  #[error("writer already closed")]
  AlreadyClosed,

  /// The writer's sink supports neither positioned writes nor seeking, so the header
  /// cannot be rewritten at `close`.
  #[error("sink does not support random access")]
  NotRandomAccess,

  /// Any underlying I/O failure, propagated with its original `io::Error`.
  #[error(transparent)]
  Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
