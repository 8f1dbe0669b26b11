pub mod byteio;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod header;
pub mod index;
pub mod recordio;
pub mod sort;
pub mod sstable;
pub mod writer;

pub use cursor::Cursor;
pub use entry::Entry;
pub use error::{Error, Result};
pub use header::Header;
pub use index::{Index, IndexEntry};
pub use recordio::record_io_reader;
pub use sort::{build_sstable, merge, shard_file_name, sort_run, SortConfig};
pub use sstable::{SSTable, SeekSSTable, StreamSSTable};
pub use writer::{PositionedSink, RandomAccessSink, SeekSink, StreamSink, Writer, WriterBuilder};
