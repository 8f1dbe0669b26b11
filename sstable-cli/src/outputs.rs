//! Formats decoded entries for display; every scan command's output funnels through
//! here instead of hand-rolling `println!` per format at the call site.

use std::str::FromStr;

pub enum OutputFormat {
  Plain,
  Json,
  Csv,
}

impl FromStr for OutputFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "plain" => Ok(OutputFormat::Plain),
      "json" => Ok(OutputFormat::Json),
      "csv" => Ok(OutputFormat::Csv),
      other => Err(format!("unknown output format '{other}', expected plain, json, or csv")),
    }
  }
}

/// Renders one key/value pair as a single line in the given format. Keys and values
/// are rendered lossily as UTF-8 for display; the underlying entry bytes are
/// untouched.
pub fn format_entry(format: &OutputFormat, key: &[u8], value: &[u8]) -> String {
  let key = String::from_utf8_lossy(key);
  let value = String::from_utf8_lossy(value);
  match format {
    OutputFormat::Plain => format!("{key}\t{value}"),
    OutputFormat::Json => format!("{{\"{key}\": \"{value}\"}}"),
    OutputFormat::Csv => format!("{key},{value}"),
  }
}
