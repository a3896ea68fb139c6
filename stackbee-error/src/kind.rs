//! Error kinds for stackbee operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind to decide whether to show the message to the
/// user as-is (malformed input they can fix) or treat it as a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Invalid settings or generator parameters
    ConfigInvalid,
    /// A value breaks the invariants of the type it claims to be
    InvalidArgument,

    // program formats
    /// Malformed mnemonic program text
    ParseFailed,
    /// Malformed compact identifier (program hex or problem ID)
    DecodeFailed,
    /// Program cannot be expressed in the compact identifier form
    EncodeFailed,

    // generation and prompts
    /// The caller stopped an in-flight enumeration
    Cancelled,
    /// A prompt template referenced a variable outside the allow-list
    TemplateInvalid,
    /// A model response did not carry the expected marker
    ResponseInvalid,

    // io
    SerializationFailed,
    FileNotFound,
    IoFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::DecodeFailed => "DecodeFailed",
            ErrorKind::EncodeFailed => "EncodeFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::TemplateInvalid => "TemplateInvalid",
            ErrorKind::ResponseInvalid => "ResponseInvalid",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Check if the error comes from input the user can fix.
    ///
    /// These errors are surfaced verbatim instead of being reported as bugs.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ParseFailed
                | ErrorKind::DecodeFailed
                | ErrorKind::EncodeFailed
                | ErrorKind::ConfigInvalid
                | ErrorKind::TemplateInvalid
                | ErrorKind::InvalidArgument
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ParseFailed.to_string(), "ParseFailed");
        assert_eq!(ErrorKind::DecodeFailed.to_string(), "DecodeFailed");
    }

    #[test]
    fn test_is_user_correctable() {
        assert!(ErrorKind::ParseFailed.is_user_correctable());
        assert!(ErrorKind::DecodeFailed.is_user_correctable());
        assert!(ErrorKind::ConfigInvalid.is_user_correctable());
        assert!(!ErrorKind::SerializationFailed.is_user_correctable());
        assert!(!ErrorKind::Cancelled.is_user_correctable());
    }
}
