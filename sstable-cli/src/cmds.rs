use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Level of verbosity
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  #[command(subcommand)]
  pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
  /// Writes `key=value` pairs, given in ascending key order, into a new SSTable.
  Write {
    /// The SSTable to create
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Entries to write, each as `key=value`
    entries: Vec<String>,
  },
  /// Prints every entry in an SSTable, optionally starting from a key.
  Scan {
    /// The SSTable to read
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Skip entries with a key less than this one
    #[arg(short, long, value_name = "KEY")]
    from: Option<String>,

    /// Output format: plain, json, or csv
    #[arg(long, value_name = "FORMAT", default_value = "plain")]
    format: String,
  },
  /// Prints the header and sparse index summary of an SSTable.
  Info {
    /// The SSTable to inspect
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
  },
  /// Sorts a RecordIO stream of `key=value` pairs into an SSTable.
  Sort {
    /// The unsorted RecordIO input
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// The SSTable to produce
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Directory for intermediate sorted runs
    #[arg(short, long, value_name = "DIR", default_value = ".sstable-sort-tmp")]
    work_dir: PathBuf,

    /// Maximum size, in bytes, of an in-memory sorted run before it's flushed
    #[arg(short, long, value_name = "BYTES", default_value_t = 64 * 1024 * 1024)]
    max_run_bytes: u64,
  },
  /// Merges already-sorted SSTables into one.
  Merge {
    /// The SSTables to merge, in the order duplicate keys should resolve
    #[arg(short, long, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// The SSTable to produce
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
  },
}

pub fn get_cli() -> Cli {
  Cli::parse()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_write_with_multiple_entries() {
    let cli = Cli::try_parse_from(["sstable-cli", "write", "-o", "out.sst", "a=1", "b=2"]).unwrap();
    match cli.command {
      Some(Commands::Write { output, entries }) => {
        assert_eq!(output, PathBuf::from("out.sst"));
        assert_eq!(entries, vec!["a=1", "b=2"]);
      }
      _ => panic!("expected Write command"),
    }
  }

  #[test]
  fn scan_defaults_to_plain_format_with_no_from_key() {
    let cli = Cli::try_parse_from(["sstable-cli", "scan", "-i", "table.sst"]).unwrap();
    match cli.command {
      Some(Commands::Scan { input, from, format }) => {
        assert_eq!(input, PathBuf::from("table.sst"));
        assert_eq!(from, None);
        assert_eq!(format, "plain");
      }
      _ => panic!("expected Scan command"),
    }
  }

  #[test]
  fn sort_has_default_work_dir_and_max_run_bytes() {
    let cli = Cli::try_parse_from(["sstable-cli", "sort", "-i", "in.rio", "-o", "out.sst"]).unwrap();
    match cli.command {
      Some(Commands::Sort { work_dir, max_run_bytes, .. }) => {
        assert_eq!(work_dir, PathBuf::from(".sstable-sort-tmp"));
        assert_eq!(max_run_bytes, 64 * 1024 * 1024);
      }
      _ => panic!("expected Sort command"),
    }
  }

  #[test]
  fn merge_accepts_repeated_input_flag() {
    let cli = Cli::try_parse_from(["sstable-cli", "merge", "-i", "a.sst", "-i", "b.sst", "-o", "out.sst"]).unwrap();
    match cli.command {
      Some(Commands::Merge { inputs, output }) => {
        assert_eq!(inputs, vec![PathBuf::from("a.sst"), PathBuf::from("b.sst")]);
        assert_eq!(output, PathBuf::from("out.sst"));
      }
      _ => panic!("expected Merge command"),
    }
  }
}
