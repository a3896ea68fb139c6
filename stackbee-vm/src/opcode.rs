//! # stackbee Opcodes
//!
//! The instruction set of the stackbee stack machine and its mnemonic text form.
//!
//! ## Text grammar
//! Tokens are separated by whitespace. A token is a rational literal, one of
//! the mnemonics `+ - * / % dup swap rot unrot len`, or `bgtz` followed by a
//! second token holding its non-negative jump offset. `bgtz k` skips the next
//! `k` token slots when the popped value is positive. A `bgtz` and its offset
//! fill two slots; a jump landing between them resumes at the op after the pair.

use crate::error::{self, Error, Result};
use crate::rational::Rational;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// stackbee Opcode - one instruction of the stack language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Opcode {
    /// Push a literal value
    Push { value: Rational },
    /// Duplicate the top value
    Dup,
    /// Swap the top two values
    Swap,
    /// Bring the third value from the top to the top
    Rot,
    /// Inverse of `Rot`: move the top value down to third place
    Unrot,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Push the current stack depth
    Len,
    /// Pop a value; if it is positive skip the next `offset` token slots
    Bgtz { offset: usize },
}

/// The binary arithmetic ops, shared by the concrete and symbolic interpreters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// Compute `lhs ⊖ rhs`, where `rhs` was the top of the stack
    pub fn apply(self, lhs: Rational, rhs: Rational) -> Rational {
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => lhs / rhs,
            BinOp::Mod => lhs % rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Mul)
    }
}

impl Opcode {
    /// Shorthand for a push of an integer literal
    pub fn push(value: i64) -> Self {
        Opcode::Push { value: Rational::int(value) }
    }

    /// The arithmetic op behind this opcode, if it is one
    pub fn binary(&self) -> Option<BinOp> {
        match self {
            Opcode::Add => Some(BinOp::Add),
            Opcode::Sub => Some(BinOp::Sub),
            Opcode::Mul => Some(BinOp::Mul),
            Opcode::Div => Some(BinOp::Div),
            Opcode::Mod => Some(BinOp::Mod),
            _ => None,
        }
    }

    /// Check if this opcode can change the instruction pointer
    pub fn is_branch(&self) -> bool {
        matches!(self, Opcode::Bgtz { .. })
    }

    /// Token slots the op fills in the text and hex forms
    pub fn width(&self) -> usize {
        match self {
            Opcode::Bgtz { .. } => 2,
            _ => 1,
        }
    }

    /// Mnemonic of the op, without operands
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Push { .. } => "push",
            Opcode::Dup => "dup",
            Opcode::Swap => "swap",
            Opcode::Rot => "rot",
            Opcode::Unrot => "unrot",
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Mod => "%",
            Opcode::Len => "len",
            Opcode::Bgtz { .. } => "bgtz",
        }
    }

    fn from_mnemonic(token: &str) -> Option<Self> {
        let op = match token {
            "+" => Opcode::Add,
            "-" => Opcode::Sub,
            "*" => Opcode::Mul,
            "/" => Opcode::Div,
            "%" => Opcode::Mod,
            "dup" => Opcode::Dup,
            "swap" => Opcode::Swap,
            "rot" => Opcode::Rot,
            "unrot" => Opcode::Unrot,
            "len" => Opcode::Len,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Push { value } => write!(f, "{}", value),
            Opcode::Bgtz { offset } => write!(f, "bgtz {}", offset),
            other => f.write_str(other.mnemonic()),
        }
    }
}

/// A program is an ordered sequence of opcodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    /// The opcodes that make up this program
    pub code: Vec<Opcode>,
}

impl Program {
    /// Create a new program
    pub fn new(code: Vec<Opcode>) -> Self {
        Self { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Parse the mnemonic text form
    pub fn parse(text: &str) -> Result<Self> {
        parse(text)
    }

    /// Render the mnemonic text form
    pub fn unparse(&self) -> String {
        unparse(self)
    }

    /// Op index where execution resumes after the `bgtz` at `at` skips
    /// `offset` slots. An index at or past the end means halt.
    pub fn branch_target(&self, at: usize, offset: usize) -> usize {
        let mut skipped = 0;
        let mut target = at + 1;
        while skipped < offset && target < self.code.len() {
            skipped += self.code[target].width();
            target += 1;
        }
        target
    }

    /// Numbered listing of the program, one op per line, with branch targets
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (i, op) in self.code.iter().enumerate() {
            match op {
                Opcode::Bgtz { offset } => {
                    let target = self.branch_target(i, *offset);
                    let target = if target >= self.code.len() {
                        "end".to_string()
                    } else {
                        target.to_string()
                    };
                    out.push_str(&format!("{:3} | {} → {}\n", i, op, target));
                }
                _ => out.push_str(&format!("{:3} | {}\n", i, op)),
            }
        }
        out
    }

    /// Pretty print the program to stdout
    pub fn pretty_print(&self) {
        println!("--- {} ---", self.unparse());
        println!("Opcodes: {}", self.code.len());
        println!();
        print!("{}", self.listing());
        println!();
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.code.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl From<Vec<Opcode>> for Program {
    fn from(code: Vec<Opcode>) -> Self {
        Program::new(code)
    }
}

/// Parse a program from its mnemonic text form in a single left-to-right pass.
///
/// An unrecognized token or a `bgtz` without a non-negative integer offset
/// is a `ParseFailed` error.
pub fn parse(text: &str) -> Result<Program> {
    let mut code = Vec::new();
    let mut tokens = text.split_whitespace().enumerate();

    while let Some((position, token)) = tokens.next() {
        if token == "bgtz" {
            let offset = tokens
                .next()
                .and_then(|(_, t)| t.parse::<usize>().ok())
                .ok_or_else(|| error::missing_offset(position))?;
            code.push(Opcode::Bgtz { offset });
        } else if let Some(op) = Opcode::from_mnemonic(token) {
            code.push(op);
        } else {
            let value = token
                .parse::<Rational>()
                .map_err(|_| error::unknown_token(token, position))?;
            code.push(Opcode::Push { value });
        }
    }

    Ok(Program { code })
}

/// Render a program in its mnemonic text form
pub fn unparse(program: &Program) -> String {
    program.to_string()
}
