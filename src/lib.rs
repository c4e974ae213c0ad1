pub mod cli;
pub mod clock;
pub mod config;
pub mod deploy;
pub mod domain;
pub mod error;
pub mod git;
pub mod prune;
pub mod scan;
pub mod store;
pub mod ui;
pub mod warning;

pub use error::{CloudPagesError, Result};
