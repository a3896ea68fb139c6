//! Prompt formatting for the solver hand-off.
//!
//! Templates are plain text with `{{NAME}}` placeholders drawn from a fixed
//! allow-list. Nothing in a template is evaluated; an unknown or unset name
//! is a `TemplateInvalid` error.

use crate::error::{self, Result};
use crate::problem::Problem;
use crate::sequence::format_sequence;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Choice label for `index`: `A`..`Z`, then `BA`, `BB`, ...
pub fn index_to_letters(index: usize) -> String {
    let mut digits = Vec::new();
    let mut n = index;
    loop {
        digits.push(LETTERS[n % 26] as char);
        n /= 26;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

/// Inverse of [`index_to_letters`]; `None` for an empty or non-letter label
pub fn letters_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |n, b| {
        let digit = LETTERS.iter().position(|&l| l == b)?;
        n.checked_mul(26)?.checked_add(digit)
    })
}

/// Where the correct sequence sits among the choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceLayout {
    pub correct_index: usize,
}

impl ChoiceLayout {
    pub fn new(correct_index: usize) -> Self {
        Self { correct_index }
    }

    /// Place the correct sequence uniformly at random
    pub fn random<R: Rng + ?Sized>(problem: &Problem, rng: &mut R) -> Self {
        Self::new(rng.gen_range(0..problem.choice_count()))
    }

    /// The choices in display order: foils in order, the correct sequence
    /// inserted at `correct_index`
    pub fn choices<'a>(&self, problem: &'a Problem) -> Vec<&'a [i64]> {
        let mut choices: Vec<&[i64]> = problem
            .incorrect_choices
            .iter()
            .map(|c| c.sequence.as_slice())
            .collect();
        let at = self.correct_index.min(choices.len());
        choices.insert(at, problem.correct_sequence.as_slice());
        choices
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }

    /// `(A) 1 2 3` lines, one per choice
    pub fn format_choices(&self, problem: &Problem) -> String {
        self.choices(problem)
            .iter()
            .enumerate()
            .map(|(i, seq)| format!("({}) {}", index_to_letters(i), format_sequence(seq)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The placeholders a template may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptVar {
    SeedLen,
    Examples,
    ExampleCount,
    Choices,
    Pattern,
    Choice,
}

impl PromptVar {
    pub const ALL: [PromptVar; 6] = [
        PromptVar::SeedLen,
        PromptVar::Examples,
        PromptVar::ExampleCount,
        PromptVar::Choices,
        PromptVar::Pattern,
        PromptVar::Choice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PromptVar::SeedLen => "SEED_LEN",
            PromptVar::Examples => "EXAMPLES",
            PromptVar::ExampleCount => "EXAMPLE_COUNT",
            PromptVar::Choices => "CHOICES",
            PromptVar::Pattern => "PATTERN",
            PromptVar::Choice => "CHOICE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Values bound to placeholders for one rendering
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    values: BTreeMap<PromptVar, String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, var: PromptVar, value: impl Into<String>) -> Self {
        self.values.insert(var, value.into());
        self
    }

    pub fn get(&self, var: PromptVar) -> Option<&str> {
        self.values.get(&var).map(String::as_str)
    }

    /// Bind each of `vars` to a stand-in value, for checking templates
    pub fn placeholders(vars: &[PromptVar]) -> Self {
        vars.iter()
            .fold(Self::new(), |acc, &var| acc.set(var, format!("<{}>", var.name())))
    }
}

/// Substitute every `{{NAME}}` in `template`.
///
/// An opening `{{` without a closing `}}` is left as written.
pub fn render_template(template: &str, vars: &PromptVars) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = rest[start + 2..start + 2 + len].trim();
        let var = PromptVar::from_name(name)
            .ok_or_else(|| error::template_invalid(name, "is not an allowed placeholder"))?;
        let value = vars
            .get(var)
            .ok_or_else(|| error::template_invalid(name, "is not available in this prompt"))?;
        out.push_str(value);
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Check that `template` only uses placeholders from `allowed`
pub fn check_template(template: &str, allowed: &[PromptVar]) -> Result<()> {
    render_template(template, &PromptVars::placeholders(allowed)).map(|_| ())
}

/// The three prompt templates of a solving round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Finds the pattern and picks a choice
    pub solver: String,
    /// Picks a choice given only the solver's pattern
    pub verifier: String,
    /// Judges whether one choice follows the pattern
    pub checker: String,
}

impl Prompts {
    pub const SOLVER_VARS: &'static [PromptVar] = &[
        PromptVar::SeedLen,
        PromptVar::Examples,
        PromptVar::ExampleCount,
        PromptVar::Choices,
    ];
    pub const VERIFIER_VARS: &'static [PromptVar] =
        &[PromptVar::SeedLen, PromptVar::Pattern, PromptVar::Choices];
    pub const CHECKER_VARS: &'static [PromptVar] = &[
        PromptVar::SeedLen,
        PromptVar::Pattern,
        PromptVar::Examples,
        PromptVar::Choice,
    ];
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            solver: "\
Each sequence below starts with {{SEED_LEN}} seed terms; every later term is computed \
from the terms before it by one hidden rule.

Here are {{EXAMPLE_COUNT}} sequences that follow the rule:
{{EXAMPLES}}

Which of these sequences follows the same rule?
{{CHOICES}}

Describe the rule on a line starting with PATTERN: and give your answer on a final line \
of the form MATCH: (X), or MATCH: NONE if no choice fits."
                .to_string(),
            verifier: "\
Each sequence below starts with {{SEED_LEN}} seed terms. Later terms follow this rule:
{{PATTERN}}

Which of these sequences follows the rule?
{{CHOICES}}

Give your answer on a final line of the form MATCH: (X), or MATCH: NONE if no choice fits."
                .to_string(),
            checker: "\
Each sequence below starts with {{SEED_LEN}} seed terms. Someone claims the later terms \
follow this rule:
{{PATTERN}}

It does hold for these sequences:
{{EXAMPLES}}

Does it also hold for this one?
{{CHOICE}}

Answer on a final line with ANSWER: YES or ANSWER: NO."
                .to_string(),
        }
    }
}

fn examples(problem: &Problem) -> String {
    problem
        .example_sequences
        .iter()
        .map(|s| format_sequence(s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the solver prompt for `problem`
pub fn solver_prompt(prompts: &Prompts, problem: &Problem, layout: &ChoiceLayout) -> Result<String> {
    let vars = PromptVars::new()
        .set(PromptVar::SeedLen, problem.seed_len.to_string())
        .set(PromptVar::Examples, examples(problem))
        .set(PromptVar::ExampleCount, problem.example_sequences.len().to_string())
        .set(PromptVar::Choices, layout.format_choices(problem));
    render_template(&prompts.solver, &vars)
}

/// Render the verifier prompt given the solver's stated pattern
pub fn verifier_prompt(
    prompts: &Prompts,
    problem: &Problem,
    layout: &ChoiceLayout,
    pattern: &str,
) -> Result<String> {
    let vars = PromptVars::new()
        .set(PromptVar::SeedLen, problem.seed_len.to_string())
        .set(PromptVar::Pattern, pattern)
        .set(PromptVar::Choices, layout.format_choices(problem));
    render_template(&prompts.verifier, &vars)
}

/// Render the checker prompt for the choice at `index`
pub fn checker_prompt(
    prompts: &Prompts,
    problem: &Problem,
    layout: &ChoiceLayout,
    pattern: &str,
    index: usize,
) -> Result<String> {
    let choices = layout.choices(problem);
    let choice = choices.get(index).ok_or_else(|| {
        error::response_invalid(format!(
            "choice ({}) does not exist",
            index_to_letters(index)
        ))
    })?;
    let vars = PromptVars::new()
        .set(PromptVar::SeedLen, problem.seed_len.to_string())
        .set(PromptVar::Pattern, pattern)
        .set(PromptVar::Examples, examples(problem))
        .set(PromptVar::Choice, format_sequence(choice));
    render_template(&prompts.checker, &vars)
}

/// The value of the last `MARKER: value` line in `output`
pub fn parse_marker(output: &str, marker: &str) -> Option<String> {
    let needle = format!("{}: ", marker);
    output.lines().rev().find_map(|line| {
        line.match_indices(&needle).find_map(|(at, _)| {
            let bounded = line[..at]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
            bounded.then(|| line[at + needle.len()..].to_string())
        })
    })
}

/// The choice index after `MATCH:`, or `None` for `MATCH: NONE`
pub fn parse_choice(output: &str) -> Result<Option<usize>> {
    let raw = parse_marker(output, "MATCH")
        .ok_or_else(|| error::response_invalid("expected a MATCH line"))?;
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_uppercase()).collect();
    if cleaned == "NONE" {
        return Ok(None);
    }
    letters_to_index(&cleaned).map(Some).ok_or_else(|| {
        error::response_invalid(format!("expected a choice like (A), (B), ...; got: {}", raw))
    })
}

/// Whether the checker answered `ANSWER: YES`
pub fn parse_verdict(output: &str) -> bool {
    parse_marker(output, "ANSWER").is_some_and(|a| a.trim() == "YES")
}
