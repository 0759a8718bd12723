//! Batch-develop a directory of photos with `rawtherapee-cli`, moving each
//! original and its processing profile out of the source directory as soon
//! as the converter has produced both outputs for it.

pub mod cli;
pub mod config;
pub mod conversion;
pub mod error;
pub mod logging;
pub mod processor;
pub mod progress;

pub use config::{FileConfig, RunSettings};
pub use error::{AppError, Result};
pub use processor::{Processor, RunSummary};
