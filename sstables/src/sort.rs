//! External merge sort: turns an arbitrarily large, unsorted [`crate::recordio`] stream
//! into one sorted SSTable by sorting bounded runs in memory, then merging the runs.

use crate::cursor::Cursor;
use crate::entry::Entry;
use crate::error::Result;
use crate::recordio::record_io_reader;
use crate::sstable::SSTable;
use crate::writer::{RandomAccessSink, SeekSink, Writer};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

/// Parameters for [`build_sstable`]: how large an in-memory run may grow before it's
/// flushed, and the filename prefix shared by every intermediate run file.
#[derive(Debug, Clone)]
pub struct SortConfig {
  pub max_run_bytes: u64,
  pub run_prefix: String,
}

impl SortConfig {
  pub fn new(max_run_bytes: u64, run_prefix: impl Into<String>) -> Self {
    SortConfig { max_run_bytes, run_prefix: run_prefix.into() }
  }
}

/// Formats a sharded output filename: `<prefix><i:05>-of-<n:05>`.
pub fn shard_file_name(prefix: &str, i: usize, n: usize) -> String {
  format!("{prefix}{i:05}-of-{n:05}")
}

/// Drains `source` into memory until the buffered entries' total on-disk size would
/// exceed `max_bytes` (or `source` runs out), sorts them stably by `(key, value)`, and
/// writes them out through `writer`. Returns the number of entries written.
///
/// A buffered run always contains at least one entry if `source` has any left: the
/// size check only stops *further* accumulation, it never discards the entry that
/// crossed the threshold.
pub fn sort_run<S: RandomAccessSink>(source: &mut dyn Cursor, max_bytes: u64, writer: Writer<S>) -> Result<usize> {
  let mut buffered: Vec<Entry> = Vec::new();
  let mut buffered_bytes: u64 = 0;

  while !source.done() {
    let entry = source.entry().expect("done() is false").clone();
    buffered_bytes += entry.size();
    buffered.push(entry);
    source.next();
    if buffered_bytes >= max_bytes {
      break;
    }
  }
  if let Some(err) = source.take_err() {
    return Err(err);
  }

  buffered.sort_by(|a, b| (a.key.as_slice(), a.value.as_slice()).cmp(&(b.key.as_slice(), b.value.as_slice())));

  let mut writer = writer;
  let count = buffered.len();
  for entry in buffered {
    writer.write(entry)?;
  }
  writer.close()?;
  Ok(count)
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
  key: Vec<u8>,
  value: Vec<u8>,
  source: usize,
}

/// Merges already-sorted `cursors` into one stream written out through `writer`, using
/// a k-way min-heap keyed by `(key, value)`, matching the ordering `sort_run` already
/// produces within one run. `source` only disambiguates two cursors holding an
/// identical `(key, value)` pair; it never overrides a value comparison. Every entry
/// from every cursor is emitted — duplicates across runs are preserved, not collapsed.
pub fn merge<S: RandomAccessSink>(mut cursors: Vec<Box<dyn Cursor>>, mut writer: Writer<S>) -> Result<()> {
  let mut heap = BinaryHeap::new();
  for (i, cursor) in cursors.iter_mut().enumerate() {
    seed(cursor.as_mut(), i, &mut heap)?;
  }

  while let Some(Reverse(top)) = heap.pop() {
    let cursor = &mut cursors[top.source];
    let entry = cursor.entry().expect("heap only holds live cursors").clone();
    writer.write(entry)?;
    cursor.next();
    seed(cursor.as_mut(), top.source, &mut heap)?;
  }

  writer.close()
}

fn seed(cursor: &mut dyn Cursor, source: usize, heap: &mut BinaryHeap<Reverse<HeapKey>>) -> Result<()> {
  match cursor.entry() {
    Some(entry) => {
      heap.push(Reverse(HeapKey { key: entry.key.clone(), value: entry.value.clone(), source }));
      Ok(())
    }
    None => match cursor.take_err() {
      Some(err) => Err(err),
      None => Ok(()),
    },
  }
}

/// Sorts an arbitrarily large RecordIO stream into one SSTable at `output_path`,
/// using `work_dir` to hold intermediate run files (removed once the merge completes).
pub fn build_sstable<R: Read + 'static>(
  source: R,
  source_size: u64,
  work_dir: &Path,
  config: &SortConfig,
  output_path: &Path,
) -> Result<()> {
  let mut input = record_io_reader(source, source_size);

  let mut run_paths: Vec<PathBuf> = Vec::new();
  while !input.done() {
    let provisional = work_dir.join(format!("{}.tmp{:05}", config.run_prefix, run_paths.len()));
    let run_writer = Writer::new(SeekSink(BufWriter::new(File::create(&provisional)?)));
    let written = sort_run(input.as_mut(), config.max_run_bytes, run_writer)?;
    if written == 0 {
      std::fs::remove_file(&provisional)?;
      break;
    }
    log::debug!("wrote run {} with {} entries", run_paths.len(), written);
    run_paths.push(provisional);
  }

  let n = run_paths.len();
  log::info!("sorted input into {n} runs, merging into {}", output_path.display());
  let mut final_paths = Vec::with_capacity(n);
  for (i, path) in run_paths.iter().enumerate() {
    let final_path = work_dir.join(shard_file_name(&config.run_prefix, i, n));
    std::fs::rename(path, &final_path)?;
    final_paths.push(final_path);
  }

  let mut cursors: Vec<Box<dyn Cursor>> = Vec::with_capacity(n);
  for path in &final_paths {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let table = SSTable::open(file, len)?;
    cursors.push(table.scan_from(None));
  }

  let out_writer = Writer::new(SeekSink(BufWriter::new(File::create(output_path)?)));
  merge(cursors, out_writer)?;

  for path in &final_paths {
    std::fs::remove_file(path)?;
  }
  Ok(())
}
