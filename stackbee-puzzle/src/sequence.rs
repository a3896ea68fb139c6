//! Number sequences grown by a program.
//!
//! A program defines a sequence by being run on the terms so far: the top
//! of the final stack is the next term.

use stackbee_vm::{evaluate, Program, Rational};

/// Terms of a sequence, seed first
pub type Sequence = Vec<i64>;

/// Grow `seed` to `len` terms with `program`.
///
/// Returns `None` when a step leaves an empty stack, produces a fraction, or
/// produces a term whose magnitude exceeds `max_term`.
pub fn extend_sequence(program: &Program, seed: &[i64], len: usize, max_term: i64) -> Option<Sequence> {
    let mut terms: Vec<Rational> = seed.iter().map(|&t| Rational::int(t)).collect();
    let mut sequence = seed.to_vec();

    while sequence.len() < len {
        let stack = evaluate(program, &terms);
        let next = stack.last()?.to_integer()?;
        if next.unsigned_abs() > max_term.unsigned_abs() {
            return None;
        }
        terms.push(Rational::int(next));
        sequence.push(next);
    }

    Some(sequence)
}

/// Check whether every term after the seed is the same
pub fn is_constant(sequence: &[i64], seed_len: usize) -> bool {
    let generated = sequence.get(seed_len..).unwrap_or(&[]);
    generated.windows(2).all(|w| w[0] == w[1])
}

/// Space-separated terms, as shown to a solver
pub fn format_sequence(sequence: &[i64]) -> String {
    sequence
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
