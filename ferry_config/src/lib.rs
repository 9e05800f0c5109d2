#![warn(clippy::unwrap_used)]

pub mod error;
pub mod parser;
pub mod settings;

pub use error::*;
pub use parser::*;
pub use settings::*;
