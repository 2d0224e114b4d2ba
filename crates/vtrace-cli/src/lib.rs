//! # vtrace-cli
//!
//! Command-line front end for `vtrace-core`.
//!
//! Provides commands for:
//! - Laying out a vector-clock annotated log (`vtrace layout`)
//! - Listing an example catalog (`vtrace examples`)
//!
//! Every command writes through [`OutputFormat`], so each result can be
//! printed as a table or as JSON.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use catalog::{Catalog, CatalogEntry};
pub use cli::{CatalogArgs, Cli, Commands, Format, LayoutArgs};
pub use error::CliError;
pub use output::OutputFormat;
