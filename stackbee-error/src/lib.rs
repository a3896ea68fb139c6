//! # stackbee-error
//!
//! Unified error handling for stackbee.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. ParseFailed, DecodeFailed)
//! - **Context**: key/value pairs locating the cause, like a token position
//! - **Source**: io and JSON errors are wrapped, never leaked raw
//!
//! Arithmetic degeneracies (division by zero, stack underflow) are never
//! errors in stackbee: the evaluators absorb them into defined values.
//!
//! ## Usage
//!
//! ```rust
//! use stackbee_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ParseFailed, "unknown token 'pop'")
//!         .with_operation("opcode::parse")
//!         .with_context("token", "pop")
//!         .with_context("position", "3"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, stackbee_error::Error>`
//! - io and `serde_json` errors convert through `From`
//! - Same error handled once, subsequent layers only append context

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using stackbee Error
pub type Result<T> = std::result::Result<T, Error>;
