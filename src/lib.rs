pub mod backup;
pub mod cores;
pub mod download;
pub mod error;
pub mod java;
pub mod mirrors;
pub mod models;
pub mod runner;
pub mod server_files;
pub mod storage;
pub mod tasks;

pub use error::{LauncherError, LauncherResult};
