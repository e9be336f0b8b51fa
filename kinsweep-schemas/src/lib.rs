pub mod file_formats;
pub mod network;
pub mod sweep;
