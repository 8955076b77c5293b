// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod logging;
pub mod output;
pub mod schema;
pub mod value;
