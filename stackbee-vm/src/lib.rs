//! # stackbee VM
//!
//! A small stack machine whose programs define number sequences.
//!
//! ## Core Concepts
//! - **Rational**: exact fractions; degenerate arithmetic yields `0`
//! - **Opcodes**: push, stack shuffles, arithmetic, `len` and a forward `bgtz`
//! - **Formats**: a mnemonic text form and a compact hex identifier
//! - **Interpreter**: concrete execution that never fails
//! - **Symbolic interpreter**: input-free execution producing closed-form slots

pub mod error;
pub mod hex;
pub mod interpreter;
pub mod opcode;
pub mod rational;
pub mod stack;
pub mod symbolic;

pub use error::{Error, ErrorKind, Result};
pub use hex::{decode_identifier, encode_identifier, enumerated_identifier};
pub use interpreter::{evaluate, evaluate_traced, trace, ExecutionState, Interpreter, TraceStep};
pub use opcode::{parse, unparse, BinOp, Opcode, Program};
pub use rational::Rational;
pub use stack::Stack;
pub use symbolic::{
    evaluate_symbolic, evaluate_symbolic_traced, SymExpr, SymExprSet, SymbolicInterpreter,
    SymbolicStack, DEFAULT_ORIGIN_DEPTH,
};
