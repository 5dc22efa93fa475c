pub mod blocks;
pub mod cli;
pub mod config;
pub mod confluence;
pub mod contract;
pub mod error;
pub mod extract;
pub mod load_config;
pub mod notion;
pub mod storage;
pub mod synchronise;

pub use cli::{run, Cli, Commands};
