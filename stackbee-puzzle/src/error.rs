//! Puzzle error constructors

pub use stackbee_vm::{Error, ErrorKind, Result};

/// Create a ConfigInvalid error when too few patterns have enough agreeing foils
pub fn too_few_groups(found: usize, needed: usize, difficulty: u32) -> Error {
    Error::config_invalid(
        "pool_size",
        format!(
            "only {} patterns at difficulty {} have enough foils agreeing on the example seeds, need {}",
            found, difficulty, needed
        ),
    )
    .with_operation("generator::generate")
    .with_context("found", found.to_string())
    .with_context("needed", needed.to_string())
}

/// Create a Cancelled error for a scan stopped by its progress callback
pub fn cancelled(scanned: u64) -> Error {
    Error::cancelled(format!("scan cancelled after {} candidates", scanned))
        .with_operation("generator::generate")
        .with_context("scanned", scanned.to_string())
}

/// Create a DecodeFailed error for a malformed problem ID
pub fn invalid_problem_id(reason: impl Into<String>) -> Error {
    Error::decode_failed(reason).with_operation("problem::decode")
}

/// Create an InvalidArgument error for a problem breaking its invariants
pub fn invalid_problem(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidArgument, reason).with_operation("problem::validate")
}

/// Create a TemplateInvalid error for a placeholder outside the allow-list or left unset
pub fn template_invalid(name: &str, reason: &str) -> Error {
    Error::new(
        ErrorKind::TemplateInvalid,
        format!("template variable '{}' {}", name, reason),
    )
    .with_operation("prompt::render")
    .with_context("variable", name)
}

/// Create a ResponseInvalid error for model output missing what we asked for
pub fn response_invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::ResponseInvalid, message).with_operation("prompt::parse")
}
