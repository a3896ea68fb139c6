//! # Compact program identifiers
//!
//! Every program within the enumeration bound has a short identifier made of
//! one hex nibble per op, so the generator can enumerate programs by counting
//! and a puzzle can be shared by its identifier.
//!
//! | nibble | op         | nibble | op      |
//! |--------|------------|--------|---------|
//! | `0-4`  | push 0..=4 | `a`    | `dup`   |
//! | `5`    | `+`        | `b`    | `swap`  |
//! | `6`    | `-`        | `c`    | `rot`   |
//! | `7`    | `*`        | `d`    | `unrot` |
//! | `8`    | `/`        | `e`    | `len`   |
//! | `9`    | `%`        | `f`    | `bgtz`, followed by an offset nibble |

use crate::error::{self, Result};
use crate::opcode::{Opcode, Program};
use crate::rational::Rational;

/// Largest literal with a single-nibble encoding
pub const MAX_LITERAL: i64 = 4;

/// Largest `bgtz` offset with a single-nibble encoding
pub const MAX_OFFSET: usize = 15;

/// Decode a compact identifier into a program.
///
/// Upper-case digits are accepted. Any other character, or an `f` with no
/// offset nibble after it, is a `DecodeFailed` error.
pub fn decode_identifier(id: &str) -> Result<Program> {
    let mut code = Vec::with_capacity(id.len());
    let mut nibbles = id.chars().enumerate();

    while let Some((position, c)) = nibbles.next() {
        let nibble = c.to_digit(16).ok_or_else(|| error::invalid_nibble(id, position))?;
        let op = match nibble {
            0..=4 => Opcode::push(nibble as i64),
            5 => Opcode::Add,
            6 => Opcode::Sub,
            7 => Opcode::Mul,
            8 => Opcode::Div,
            9 => Opcode::Mod,
            0xa => Opcode::Dup,
            0xb => Opcode::Swap,
            0xc => Opcode::Rot,
            0xd => Opcode::Unrot,
            0xe => Opcode::Len,
            _ => {
                let (position, c) = nibbles.next().ok_or_else(|| error::dangling_branch(id))?;
                let offset = c.to_digit(16).ok_or_else(|| error::invalid_nibble(id, position))?;
                Opcode::Bgtz { offset: offset as usize }
            }
        };
        code.push(op);
    }

    Ok(Program::new(code))
}

/// Encode a program as its compact identifier (lower-case).
///
/// Literals outside `0..=4` and offsets above 15 have no nibble and fail with
/// `EncodeFailed`.
pub fn encode_identifier(program: &Program) -> Result<String> {
    let mut id = String::with_capacity(program.len() + 2);
    for (position, op) in program.code.iter().enumerate() {
        let nibble = match op {
            Opcode::Push { value } => match value.to_integer() {
                Some(n) if (0..=MAX_LITERAL).contains(&n) => n as u32,
                _ => return Err(error::unencodable(op.to_string(), position)),
            },
            Opcode::Add => 5,
            Opcode::Sub => 6,
            Opcode::Mul => 7,
            Opcode::Div => 8,
            Opcode::Mod => 9,
            Opcode::Dup => 0xa,
            Opcode::Swap => 0xb,
            Opcode::Rot => 0xc,
            Opcode::Unrot => 0xd,
            Opcode::Len => 0xe,
            Opcode::Bgtz { offset } => {
                if *offset > MAX_OFFSET {
                    return Err(error::unencodable(op.to_string(), position));
                }
                id.push('f');
                *offset as u32
            }
        };
        // nibble < 16 on every arm
        if let Some(c) = char::from_digit(nibble, 16) {
            id.push(c);
        }
    }
    Ok(id)
}

/// The identifier enumerated at index `n`
pub fn enumerated_identifier(n: u64) -> String {
    format!("{n:x}")
}

/// Check whether a literal value has a nibble
pub fn is_encodable_literal(value: Rational) -> bool {
    matches!(value.to_integer(), Some(n) if (0..=MAX_LITERAL).contains(&n))
}

impl Program {
    /// Decode a program from its compact identifier
    pub fn from_hex(id: &str) -> Result<Self> {
        decode_identifier(id)
    }

    /// Encode this program as its compact identifier
    pub fn to_hex(&self) -> Result<String> {
        encode_identifier(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::opcode::parse;

    #[test]
    fn test_decode() {
        let program = decode_identifier("a29f4").unwrap();
        assert_eq!(program, parse("dup 2 % bgtz 4").unwrap());
    }

    #[test]
    fn test_decode_accepts_upper_case() {
        assert_eq!(decode_identifier("AF3").unwrap(), decode_identifier("af3").unwrap());
    }

    #[test]
    fn test_decode_invalid_character() {
        let err = decode_identifier("a2g").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailed);
        assert_eq!(err.context_value("position"), Some("2"));

        let err = decode_identifier("fz").unwrap_err();
        assert_eq!(err.context_value("position"), Some("1"));
    }

    #[test]
    fn test_decode_dangling_branch() {
        let err = decode_identifier("a2f").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailed);
    }

    #[test]
    fn test_encode() {
        let program = parse("dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +").unwrap();
        assert_eq!(encode_identifier(&program).unwrap(), "a29f5281f43715");
        assert_eq!(program.to_hex().unwrap(), "a29f5281f43715");
    }

    #[test]
    fn test_encode_rejects_out_of_bound() {
        let err = encode_identifier(&parse("5").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodeFailed);
        assert_eq!(err.context_value("op"), Some("5"));

        assert!(encode_identifier(&parse("1/2").unwrap()).is_err());
        assert!(encode_identifier(&parse("-1").unwrap()).is_err());
        assert!(encode_identifier(&parse("bgtz 16").unwrap()).is_err());
        assert!(encode_identifier(&parse("bgtz 15").unwrap()).is_ok());
    }

    #[test]
    fn test_encode_decode_encode_is_idempotent() {
        for id in ["", "0", "e5", "fa", "FFF0", "a29f5281f43715"] {
            let once = decode_identifier(id).unwrap().to_hex().unwrap();
            let twice = decode_identifier(&once).unwrap().to_hex().unwrap();
            assert_eq!(once, id.to_lowercase());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_enumerated_identifier() {
        assert_eq!(enumerated_identifier(0), "0");
        assert_eq!(enumerated_identifier(0xa29f), "a29f");
        assert!(is_encodable_literal(Rational::int(4)));
        assert!(!is_encodable_literal(Rational::int(5)));
    }
}
