pub mod cli;
pub mod config;
pub mod extract;
pub mod record;
pub mod report;
pub mod runner;
pub mod stats;
pub mod task;
pub mod util;
pub mod webhook;
