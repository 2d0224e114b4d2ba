//! Examples command implementation.
//!
//! Lists the entries of an example catalog in display order.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, TableDisplay, truncate};

/// Handler for the examples command.
pub struct ExamplesCommand<'a> {
    catalog: Option<&'a Path>,
}

impl<'a> ExamplesCommand<'a> {
    /// Creates a new examples command handler.
    #[must_use]
    pub const fn new(catalog: Option<&'a Path>) -> Self {
        Self { catalog }
    }

    /// Executes the examples command.
    ///
    /// # Errors
    ///
    /// Returns error if no catalog is configured or it cannot be loaded.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<()> {
        let path = self.catalog.ok_or_else(|| {
            CliError::Config("no catalog given; pass --catalog or set VTRACE_CATALOG".into())
        })?;
        let catalog = Catalog::load(path)?;
        let list = ExampleList {
            examples: catalog.sorted().into_iter().cloned().collect(),
        };
        format.write(out, &list)
    }
}

/// Catalog entries in display order.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleList {
    /// Sorted entries.
    pub examples: Vec<CatalogEntry>,
}

impl TableDisplay for ExampleList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.examples.is_empty() {
            writeln!(writer, "No examples in catalog")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>5}  {:<24}  {:<24}  {}",
            "ORDER", "TITLE", "FILE", "PATTERN"
        )?;
        writeln!(writer, "{}", "─".repeat(96))?;
        for entry in &self.examples {
            writeln!(
                writer,
                "{:>5}  {:<24}  {:<24}  {}",
                entry.order,
                truncate(&entry.title, 24),
                truncate(&entry.filename, 24),
                truncate(&entry.format.pattern, 36)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} example(s)", self.examples.len())?;
        Ok(())
    }
}
