//! Generator settings.
//!
//! Everything the generator and the prompt hand-off need is carried in one
//! explicit `Settings` value; there is no process-wide state.

use crate::error::{Error, Result};
use crate::problem::decode_problem;
use crate::prompt::{check_template, Prompts};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported difficulty; the scan covers `16^difficulty` identifiers
pub const MAX_DIFFICULTY: u32 = 7;

/// Settings for generating and presenting puzzles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enumeration bound: identifiers `0..16^difficulty` are scanned
    pub difficulty: u32,
    /// Number of problems to assemble
    pub pool_size: usize,
    /// Choices per problem, the correct one included
    pub choice_count: usize,
    /// Terms per sequence, seed terms included
    pub sequence_len: usize,
    /// Seed stacks; the first is the primary seed, the rest give the examples
    pub seeds: Vec<Vec<i64>>,
    /// Largest magnitude a generated term may have
    pub max_term: i64,
    /// Treat programs whose generated terms never change as degenerate
    pub skip_constant: bool,
    /// Pre-existing slots above the symbolic origin
    pub origin_depth: usize,
    /// Candidates scanned between progress checkpoints
    pub progress_interval: u64,
    /// Seed for choosing and ordering foils
    pub rng_seed: u64,
    /// A fixed problem ID to replay instead of generating
    pub problem: Option<String>,
    pub prompts: Prompts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: 4,
            pool_size: 16,
            choice_count: 4,
            sequence_len: 8,
            seeds: vec![vec![1, 2], vec![2, 1]],
            max_term: 10_000,
            skip_constant: true,
            origin_depth: 1,
            progress_interval: 4096,
            rng_seed: 0,
            problem: None,
            prompts: Prompts::default(),
        }
    }
}

impl Settings {
    /// Number of identifiers the generator scans
    pub fn enumeration_bound(&self) -> u64 {
        16u64.pow(self.difficulty)
    }

    /// Terms in every seed
    pub fn seed_len(&self) -> usize {
        self.seeds.first().map_or(0, Vec::len)
    }

    pub fn primary_seed(&self) -> &[i64] {
        self.seeds.first().map_or(&[], Vec::as_slice)
    }

    pub fn example_seeds(&self) -> &[Vec<i64>] {
        self.seeds.get(1..).unwrap_or(&[])
    }

    /// Check the settings, naming the offending field on failure
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(Error::config_invalid(
                "difficulty",
                format!("difficulty must be between 1 and {}", MAX_DIFFICULTY),
            ));
        }
        if self.pool_size == 0 {
            return Err(Error::config_invalid("pool_size", "pool_size must be at least 1"));
        }
        if self.choice_count < 2 {
            return Err(Error::config_invalid(
                "choice_count",
                "choice_count must be at least 2",
            ));
        }
        if self.seeds.len() < 2 {
            return Err(Error::config_invalid(
                "seeds",
                "need a primary seed and at least one example seed",
            ));
        }
        let seed_len = self.seed_len();
        if seed_len == 0 || self.seeds.iter().any(|s| s.len() != seed_len) {
            return Err(Error::config_invalid(
                "seeds",
                "seeds must be non-empty and all the same length",
            ));
        }
        if self.sequence_len <= seed_len {
            return Err(Error::config_invalid(
                "sequence_len",
                format!("sequence_len must exceed the seed length {}", seed_len),
            ));
        }
        if self.max_term < 1 {
            return Err(Error::config_invalid("max_term", "max_term must be positive"));
        }
        if self.origin_depth > seed_len {
            return Err(Error::config_invalid(
                "origin_depth",
                format!("origin_depth must not exceed the seed length {}", seed_len),
            ));
        }
        if self.progress_interval == 0 {
            return Err(Error::config_invalid(
                "progress_interval",
                "progress_interval must be at least 1",
            ));
        }
        if let Some(id) = &self.problem {
            decode_problem(id).map_err(|e| Error::config_invalid("problem", e.message()))?;
        }

        let templates = [
            ("prompts.solver", &self.prompts.solver, Prompts::SOLVER_VARS),
            ("prompts.verifier", &self.prompts.verifier, Prompts::VERIFIER_VARS),
            ("prompts.checker", &self.prompts.checker, Prompts::CHECKER_VARS),
        ];
        for (field, template, allowed) in templates {
            check_template(template, allowed)
                .map_err(|e| Error::config_invalid(field, e.message()))?;
        }

        Ok(())
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        let settings: Settings = serde_json::from_str(&json)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        Ok(())
    }
}
