//! # stackbee puzzles
//!
//! Turns stackbee programs into "spot the pattern" puzzles:
//! 1. Every program up to the difficulty bound grows a sequence from each seed
//! 2. Programs are clustered by the sequences grown from the example seeds
//! 3. Each puzzle pairs one program with foils from its own cluster: they
//!    grow the same examples but a different primary sequence
//! 4. A puzzle travels as a short problem ID and renders into solver prompts
//!
//! All knobs live in an explicit [`Settings`] value.

pub mod error;
pub mod generator;
pub mod problem;
pub mod prompt;
pub mod sequence;
pub mod settings;

pub use error::{Error, ErrorKind, Result};
pub use generator::{generate_problem_set, is_provably_constant, resolve_problems, Progress};
pub use problem::{decode_problem, encode_problem, IncorrectChoice, Problem, PROBLEM_ID_VERSION};
pub use prompt::{
    checker_prompt, index_to_letters, letters_to_index, parse_choice, parse_marker,
    parse_verdict, render_template, solver_prompt, verifier_prompt, ChoiceLayout, PromptVar,
    PromptVars, Prompts,
};
pub use sequence::{extend_sequence, format_sequence, is_constant, Sequence};
pub use settings::{Settings, MAX_DIFFICULTY};
