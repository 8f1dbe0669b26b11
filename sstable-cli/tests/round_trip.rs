use common_testing::{assert, setup};
use sstable_cli::{get_min_max, is_sorted_by, is_unique, outputs::format_entry, outputs::OutputFormat};
use sstables::{Entry, SSTable, SeekSink, Writer};
use std::fs::File;
use std::io;

fn setup_table(path: &str) -> io::Result<()> {
  setup::create_dir_all(".tmp")?;
  setup::remove_file(path)?;
  Ok(())
}

#[test]
fn writes_then_scans_a_table_round_trip() -> io::Result<()> {
  let _lock = setup::sequential();
  let path = ".tmp/round_trip_scan.sst";
  setup_table(path)?;

  {
    let mut writer = Writer::new(SeekSink(File::create(path)?));
    writer.write(Entry::new(b"a".to_vec(), b"1".to_vec())).unwrap();
    writer.write(Entry::new(b"b".to_vec(), b"2".to_vec())).unwrap();
    writer.write(Entry::new(b"c".to_vec(), b"3".to_vec())).unwrap();
    writer.close().unwrap();
  }

  let file = File::open(path)?;
  let len = file.metadata()?.len();
  let table = SSTable::open(file, len).unwrap();

  let mut cursor = table.scan_from(Some(b"b"));
  let mut lines = Vec::new();
  while let Some(entry) = cursor.entry() {
    lines.push(format_entry(&OutputFormat::Plain, &entry.key, &entry.value));
    cursor.next();
  }
  assert::equal(lines, vec!["b\t2".to_string(), "c\t3".to_string()]);
  Ok(())
}

#[test]
fn info_helpers_report_sortedness_over_an_index_with_two_blocks() -> io::Result<()> {
  let _lock = setup::sequential();
  let path = ".tmp/round_trip_info.sst";
  setup_table(path)?;

  // Large values force a block split, so the sparse index has more than one entry
  // to run `is_sorted_by`/`is_unique`/`get_min_max` over.
  {
    let mut writer = Writer::new(SeekSink(File::create(path)?));
    writer.write(Entry::new(b"a".to_vec(), vec![0u8; 40_000])).unwrap();
    writer.write(Entry::new(b"b".to_vec(), vec![0u8; 40_000])).unwrap();
    writer.close().unwrap();
  }

  let file = File::open(path)?;
  let len = file.metadata()?.len();
  let table = SSTable::open(file, len).unwrap();
  let index = table.index();
  assert::equal(index.len(), 2);

  let keys: Vec<&Vec<u8>> = (0..index.len()).map(|i| &index.get(i).unwrap().key).collect();
  assert!(is_sorted_by(&keys, |a, b| a < b));
  assert!(is_unique(&keys, |a, b| a == b));
  let (min, max) = get_min_max(&keys).unwrap();
  assert::equal((**min).clone(), b"a".to_vec());
  assert::equal((**max).clone(), b"b".to_vec());
  Ok(())
}
