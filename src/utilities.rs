//! The csvmedkit utilities.
//!
//! Each utility is a clap argument struct that implements [`UniformReader`]
//! to obtain its input and [`Utility`] to produce output.

use std::path::Path;

use crate::error::Result;
use crate::io::{Input, Output, Source};

mod flatten;
mod header;
mod matching;
mod norm;
mod pivot;
mod rgrep;
mod sed;
mod slice;

pub use flatten::Flatten;
pub use header::Header;
pub use norm::Norm;
pub use pivot::Pivot;
pub use rgrep::Rgrep;
pub use sed::Sed;
pub use slice::Slice;

/// Settings shared by all utilities that are not about reading CSV.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    /// Number of the first column when reading or printing column numbers.
    pub column_offset: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self { column_offset: 1 }
    }
}

/// Obtain the column names and data rows of a source.
pub trait UniformReader {
    fn read_input(&self, source: Source) -> Result<Input> {
        Input::from_source(source)
    }
}

/// A command that reads CSV and writes results.
pub trait Utility: UniformReader {
    /// The input file named on the command line, if any.
    fn input_path(&self) -> Option<&Path>;

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()>;
}

/// Helpers for running utilities in tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::io::{Dialect, OutputFormat};

    /// Run `utility` over `input` and return what it wrote.
    pub fn run_csv<U: Utility>(utility: &U, ctx: Context, input: &str) -> Result<String> {
        run_with(utility, ctx, input, OutputFormat::Csv)
    }

    pub fn run_with<U: Utility>(
        utility: &U,
        ctx: Context,
        input: &str,
        format: OutputFormat,
    ) -> Result<String> {
        let source = Source::from_reader(Dialect::default(), std::io::Cursor::new(input.to_string()));
        let mut buf = Vec::new();
        {
            let mut output = Output::new(&mut buf, format);
            utility.execute(&ctx, source, &mut output)?;
        }
        Ok(String::from_utf8(buf).expect("utf-8 output"))
    }

    pub fn zero_based() -> Context {
        Context { column_offset: 0 }
    }
}
