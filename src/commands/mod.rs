pub mod agent;
pub mod completions;
pub mod config;
pub mod init;
pub mod simulate;
pub mod state;
