//! csvmedkit: command-line utilities for cleaning, reshaping and inspecting
//! CSV data.
//!
//! The library holds the shared machinery: column and index resolution,
//! the aggregation mini-language, typed tables, and the CSV plumbing the
//! utilities in [`utilities`] are built on.

pub mod aggregate;
pub mod aggy;
pub mod ast;
pub mod columns;
pub mod error;
pub mod indexes;
pub mod io;
pub mod logging;
pub mod parser;
pub mod table;
pub mod text;
pub mod utilities;
