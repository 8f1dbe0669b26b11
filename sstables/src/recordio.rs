//! RecordIO: a header-less, index-less concatenation of entries. The canonical
//! ingest form for the external sort — unsorted input arrives as a RecordIO stream,
//! and each intermediate sorted run is itself written out through a [`crate::writer::Writer`]
//! rather than as RecordIO, since later stages need the sparse index to scan runs in
//! parallel during the merge.

use crate::cursor::{Cursor, StreamCursor};
use std::io::Read;

/// Wraps `stream` in a [`Cursor`] that reads entries sequentially until `total_size`
/// bytes have been consumed. `total_size` is the caller's responsibility to supply
/// accurately (e.g. the file size); there is no trailing marker to detect the end.
pub fn record_io_reader<R: Read + 'static>(stream: R, total_size: u64) -> Box<dyn Cursor> {
  Box::new(StreamCursor::new(stream, total_size))
}
