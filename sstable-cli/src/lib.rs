pub mod cmds;
pub mod files;
pub mod outputs;
pub mod util;

pub use util::{get_min_max, is_sorted_by, is_unique};
