pub mod citation;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod traits;
pub mod types;

pub use error::{Error, ParseError, Result};
pub use types::{Entry, Metadata};
