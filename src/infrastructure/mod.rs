pub mod database;
pub mod json_file;
pub mod listener;
pub mod seed;
