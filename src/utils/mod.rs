//! Utility functions

pub mod fs;
pub mod hash;
pub mod time;

pub use hash::hash_file;
pub use time::{format_duration, now_utc, parse_datetime};
