//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`layout`] - Causal layout of a log file
//! - [`examples`] - Example catalog listing

pub mod examples;
pub mod layout;

pub use examples::ExamplesCommand;
pub use layout::LayoutCommand;
