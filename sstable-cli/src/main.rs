//! Manipulates SSTables
//!
//! # Examples
//!
//! ```zsh
//!   sstable-cli write -o table.sst a=1 b=2 c=3
//!   sstable-cli scan -i table.sst
//! ```

use colored::Colorize;
use sstable_cli::{
  cmds::{get_cli, Commands},
  files,
  outputs::{format_entry, OutputFormat},
  get_min_max, is_sorted_by, is_unique,
};
use sstables::{Entry, SSTable, SeekSink, SortConfig, Writer};
use std::fs::File;

const CONSOLE_CHECKMARK: &str = "\u{2714}";
const CONSOLE_CROSS: &str = "\u{2718}";

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    _ => log::LevelFilter::Debug,
  };
  env_logger::Builder::new().filter_level(level).init();
}

fn split_entry(raw: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
  raw.split_once('=').ok_or_else(|| format!("'{raw}' is not in key=value form").into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = get_cli();
  init_logging(cli.verbose);

  match cli.command {
    Some(Commands::Write { output, entries }) => {
      if let Some(dir) = output.parent() {
        files::create_dir_all(dir)?;
      }
      let mut writer = Writer::new(SeekSink(File::create(&output)?));
      for raw in &entries {
        let (key, value) = split_entry(raw)?;
        writer.write(Entry::new(key.as_bytes().to_vec(), value.as_bytes().to_vec()))?;
      }
      writer.close()?;
      println!("{} wrote {}", CONSOLE_CHECKMARK.green(), output.display());
    }

    Some(Commands::Scan { input, from, format }) => {
      let format: OutputFormat = format.parse()?;
      let file = File::open(&input)?;
      let len = file.metadata()?.len();
      let table = SSTable::open(file, len)?;
      let mut cursor = table.scan_from(from.as_deref().map(str::as_bytes));
      while let Some(entry) = cursor.entry() {
        println!("{}", format_entry(&format, &entry.key, &entry.value));
        cursor.next();
      }
      if let Some(err) = cursor.take_err() {
        return Err(err.into());
      }
    }

    Some(Commands::Info { input }) => {
      if !input.is_file() {
        println!("{} {} does not exist", CONSOLE_CROSS.red(), input.display());
        return Ok(());
      }
      let file_size = input.metadata()?.len();
      let file = File::open(&input)?;
      let table = SSTable::open(file, file_size)?;
      let header = table.header();
      let index = table.index();

      println!("file: {} {}\nsize: {file_size}", input.display(), CONSOLE_CHECKMARK.green());
      println!("version: {}\nblocks: {}\nindex_offset: {}", header.version, header.num_blocks, header.index_offset);

      if index.is_empty() {
        println!("index entries: 0");
      } else {
        let keys: Vec<&Vec<u8>> = (0..index.len()).map(|i| &index.get(i).unwrap().key).collect();
        let sorted = is_sorted_by(&keys, |a, b| a < b);
        let unique = is_unique(&keys, |a, b| a == b);
        let (min, max) = get_min_max(&keys).expect("index is non-empty");
        println!(
          "index entries: {}\nsorted: {sorted}\nunique: {unique}\nmin key: {:?}\nmax key: {:?}",
          index.len(),
          min,
          max,
        );
      }
    }

    Some(Commands::Sort { input, output, work_dir, max_run_bytes }) => {
      files::create_dir_all(&work_dir)?;
      let file = File::open(&input)?;
      let size = file.metadata()?.len();
      let config = SortConfig::new(max_run_bytes, "run-");
      sstables::build_sstable(file, size, &work_dir, &config, &output)?;
      println!("{} sorted {} into {}", CONSOLE_CHECKMARK.green(), input.display(), output.display());
    }

    Some(Commands::Merge { inputs, output }) => {
      let mut cursors = Vec::with_capacity(inputs.len());
      for input in &inputs {
        let file = File::open(input)?;
        let len = file.metadata()?.len();
        let table = SSTable::open(file, len)?;
        cursors.push(table.scan_from(None));
      }
      let writer = Writer::new(SeekSink(File::create(&output)?));
      sstables::merge(cursors, writer)?;
      println!("{} merged {} tables into {}", CONSOLE_CHECKMARK.green(), inputs.len(), output.display());
    }

    None => {}
  }

  Ok(())
}
