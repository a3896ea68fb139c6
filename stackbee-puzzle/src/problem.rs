//! Puzzles and their portable IDs.
//!
//! A problem ID is the base64url (unpadded) encoding of a versioned JSON
//! array, so any puzzle can be shared as a single token and rebuilt exactly.

use crate::error::{self, Result};
use crate::sequence::{extend_sequence, Sequence};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use stackbee_vm::Program;
use std::collections::HashSet;

/// Layout version carried inside every problem ID
pub const PROBLEM_ID_VERSION: u32 = 1;

/// A foil: a sequence from a different program that grows the same examples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncorrectChoice {
    pub sequence: Sequence,
    /// Hex identifier of the program producing `sequence`
    pub source_program: String,
}

/// A multiple-choice "spot the pattern" puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Hex identifier of the pattern's program
    pub program: String,
    /// Number of leading seed terms in every sequence
    pub seed_len: usize,
    /// The pattern grown from the example seeds
    pub example_sequences: Vec<Sequence>,
    /// The pattern grown from the primary seed
    pub correct_sequence: Sequence,
    pub incorrect_choices: Vec<IncorrectChoice>,
}

#[derive(Serialize, Deserialize)]
struct WireProblem(u32, String, usize, Vec<Sequence>, Sequence, Vec<(Sequence, String)>);

impl Problem {
    /// Decode the pattern's program
    pub fn decode_program(&self) -> Result<Program> {
        Program::from_hex(&self.program)
    }

    /// Number of choices including the correct one
    pub fn choice_count(&self) -> usize {
        self.incorrect_choices.len() + 1
    }

    /// Check the puzzle invariants: equal lengths, pairwise distinct choices,
    /// every sequence reproduced by the program it claims to come from, and
    /// every foil's program growing the example sequences too.
    pub fn validate(&self) -> Result<()> {
        let program = self.decode_program()?;
        let len = self.correct_sequence.len();
        if len <= self.seed_len {
            return Err(error::invalid_problem(format!(
                "sequences have {} terms, not more than the {} seed terms",
                len, self.seed_len
            )));
        }

        let lengths_match = self.example_sequences.iter().all(|s| s.len() == len)
            && self.incorrect_choices.iter().all(|c| c.sequence.len() == len);
        if !lengths_match {
            return Err(error::invalid_problem("sequences differ in length"));
        }

        let mut seen = HashSet::new();
        seen.insert(&self.correct_sequence);
        for choice in &self.incorrect_choices {
            if !seen.insert(&choice.sequence) {
                return Err(error::invalid_problem(format!(
                    "duplicate choice {:?}",
                    choice.sequence
                )));
            }
        }

        for sequence in self.example_sequences.iter().chain([&self.correct_sequence]) {
            if !reproduces(&program, sequence, self.seed_len) {
                return Err(error::invalid_problem(format!(
                    "{:?} is not produced by program {}",
                    sequence, self.program
                )));
            }
        }

        for choice in &self.incorrect_choices {
            if choice.source_program == self.program {
                return Err(error::invalid_problem("a foil reuses the pattern's program"));
            }
            let source = Program::from_hex(&choice.source_program)?;
            if !reproduces(&source, &choice.sequence, self.seed_len) {
                return Err(error::invalid_problem(format!(
                    "{:?} is not produced by program {}",
                    choice.sequence, choice.source_program
                )));
            }
            let agrees = self
                .example_sequences
                .iter()
                .all(|example| reproduces(&source, example, self.seed_len));
            if !agrees {
                return Err(error::invalid_problem(format!(
                    "foil program {} disagrees with the example sequences",
                    choice.source_program
                )));
            }
        }

        Ok(())
    }

    /// Encode as a portable problem ID
    pub fn encode(&self) -> Result<String> {
        encode_problem(self)
    }

    /// Decode and validate a problem ID
    pub fn decode(id: &str) -> Result<Self> {
        decode_problem(id)
    }
}

fn reproduces(program: &Program, sequence: &[i64], seed_len: usize) -> bool {
    extend_sequence(program, &sequence[..seed_len], sequence.len(), i64::MAX).as_deref()
        == Some(sequence)
}

/// Encode a problem as its portable ID
pub fn encode_problem(problem: &Problem) -> Result<String> {
    let wire = WireProblem(
        PROBLEM_ID_VERSION,
        problem.program.clone(),
        problem.seed_len,
        problem.example_sequences.clone(),
        problem.correct_sequence.clone(),
        problem
            .incorrect_choices
            .iter()
            .map(|c| (c.sequence.clone(), c.source_program.clone()))
            .collect(),
    );
    let json = serde_json::to_vec(&wire)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a problem ID, rejecting anything that is not a valid problem
pub fn decode_problem(id: &str) -> Result<Problem> {
    let bytes = URL_SAFE_NO_PAD
        .decode(id.trim())
        .map_err(|e| error::invalid_problem_id(format!("not base64url: {}", e)))?;
    let wire: WireProblem = serde_json::from_slice(&bytes)
        .map_err(|e| error::invalid_problem_id(format!("not a problem record: {}", e)))?;

    let WireProblem(version, program, seed_len, example_sequences, correct_sequence, incorrect) = wire;
    if version != PROBLEM_ID_VERSION {
        return Err(error::invalid_problem_id(format!(
            "unsupported problem ID version {}",
            version
        ))
        .with_context("version", version.to_string()));
    }

    let problem = Problem {
        program,
        seed_len,
        example_sequences,
        correct_sequence,
        incorrect_choices: incorrect
            .into_iter()
            .map(|(sequence, source_program)| IncorrectChoice {
                sequence,
                source_program,
            })
            .collect(),
    };
    problem
        .validate()
        .map_err(|e| error::invalid_problem_id(e.message().to_string()))?;
    Ok(problem)
}
