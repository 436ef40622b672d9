pub mod cli;
pub mod config;
pub mod decoder;
pub mod defaults;
pub mod dialect;
pub mod error;
pub mod estimate;
pub mod experiment;
pub mod export;
pub mod filter;
pub mod process;
pub mod process_cmd;
pub mod profile;
pub mod prune;
pub mod run_state;
pub mod stats;
pub mod summary;
