#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod analyzer;
pub mod collector;
pub mod config;
pub mod executor;
pub mod outcome;
pub mod payload;
pub mod report;
pub mod reporter;
pub mod scheduler;
pub mod utils;
