pub mod file_io;
pub mod histogram;
pub mod image_utils;
pub mod lookup_table;
pub mod partition;
pub mod stopwatch;
