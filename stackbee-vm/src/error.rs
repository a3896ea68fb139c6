//! stackbee VM error types
//!
//! Re-exports stackbee-error and provides VM-specific conveniences.

pub use stackbee_error::{Error, ErrorKind, Result};

// =============================================================================
// VM-specific error constructors
// =============================================================================

/// Create a ParseFailed error for an unrecognized token
pub fn unknown_token(token: impl Into<String>, position: usize) -> Error {
    let token = token.into();
    Error::parse_failed(format!("unknown token '{}'", token))
        .with_operation("opcode::parse")
        .with_context("token", token)
        .with_context("position", position.to_string())
}

/// Create a ParseFailed error for a `bgtz` without a usable offset token
pub fn missing_offset(position: usize) -> Error {
    Error::parse_failed("bgtz must be followed by a non-negative integer offset")
        .with_operation("opcode::parse")
        .with_context("position", position.to_string())
}

/// Create a ParseFailed error for a malformed rational literal
pub fn invalid_rational(text: impl Into<String>) -> Error {
    let text = text.into();
    Error::parse_failed(format!("invalid rational '{}'", text))
        .with_operation("rational::parse")
        .with_context("text", text)
}

/// Create a DecodeFailed error for a character outside the hex alphabet
pub fn invalid_nibble(id: &str, position: usize) -> Error {
    Error::decode_failed(format!("invalid character in program id '{}'", id))
        .with_operation("hex::decode")
        .with_context("id", id)
        .with_context("position", position.to_string())
}

/// Create a DecodeFailed error for a trailing bgtz nibble with no offset
pub fn dangling_branch(id: &str) -> Error {
    Error::decode_failed(format!("program id '{}' ends with a bgtz missing its offset", id))
        .with_operation("hex::decode")
        .with_context("id", id)
}

/// Create an EncodeFailed error for an op outside the compact alphabet
pub fn unencodable(op: impl Into<String>, position: usize) -> Error {
    let op = op.into();
    Error::encode_failed(format!("'{}' has no compact encoding", op))
        .with_operation("hex::encode")
        .with_context("op", op)
        .with_context("position", position.to_string())
}
