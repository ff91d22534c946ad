/// Filesystem CSV transport with atomic writes.
pub mod fs;

pub use fs::{read_table, write_lines, write_table};
