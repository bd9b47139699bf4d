//! Output formatting
//!
//! - `text`: results block printed to the console plus a summary log line
//! - `json`: machine-readable report file

pub mod json;
pub mod text;
