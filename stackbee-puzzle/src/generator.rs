//! # Problem generator
//!
//! Scans every program identifier up to the difficulty bound and grows a
//! sequence from each seed. Programs are clustered by the sequences they
//! grow from the example seeds, and inside a cluster one program is kept per
//! distinct primary-seed sequence. Each puzzle takes one member as the
//! pattern and draws its foils from the same cluster: programs that agree
//! with the pattern on every example yet grow a different primary sequence.
//!
//! The scan is a plain loop with cooperative checkpoints: every
//! `progress_interval` candidates it awaits the caller's progress callback
//! and yields to the runtime. The callback can stop the scan by returning
//! `ControlFlow::Break`.

use crate::error::{self, Result};
use crate::problem::{decode_problem, IncorrectChoice, Problem};
use crate::sequence::{extend_sequence, is_constant, Sequence};
use crate::settings::Settings;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use stackbee_vm::{
    decode_identifier, enumerated_identifier, evaluate, Program, Rational, SymExpr,
    SymbolicInterpreter, SymbolicStack,
};
use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use tracing::{debug, info, trace};

/// Scan progress reported at each checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Identifiers examined so far
    pub scanned: u64,
    /// Identifiers in the whole scan
    pub total: u64,
    /// Distinct example-seed behaviours found so far
    pub groups: usize,
}

/// A usable program with its outputs
#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    /// Enumeration index, so smaller means simpler
    index: u64,
    primary: Sequence,
    examples: Vec<Sequence>,
}

/// Programs growing the same example sequences, the first found for each
/// distinct primary sequence
#[derive(Debug)]
struct Cluster {
    members: Vec<Candidate>,
}

impl Cluster {
    /// Keep `candidate` unless a simpler member already grows its primary sequence
    fn admit(&mut self, candidate: Candidate) -> bool {
        if self.members.iter().any(|m| m.primary == candidate.primary) {
            return false;
        }
        self.members.push(candidate);
        true
    }
}

/// Check whether the symbolic interpreter proves that the program's next
/// term is a literal or the previous term, so every generated term is the same.
pub fn is_provably_constant(program: &Program, origin_depth: usize) -> bool {
    let analysis = SymbolicInterpreter::new(program)
        .origin_depth(origin_depth)
        .run();
    top_is_constant(&analysis)
}

fn top_is_constant(analysis: &SymbolicStack) -> bool {
    let Some(top) = analysis.top_of_stack() else {
        return false;
    };
    match top.as_single() {
        Some(SymExpr::Lit(_)) => true,
        Some(SymExpr::Top(0)) => analysis.origin_depth() > 0,
        _ => false,
    }
}

/// Evaluate one candidate on every seed; `None` when it is unusable
fn evaluate_candidate(
    settings: &Settings,
    index: u64,
    id: &str,
    program: &Program,
) -> Option<Candidate> {
    let seed_len = settings.seed_len();
    let analysis = SymbolicInterpreter::new(program)
        .origin_depth(settings.origin_depth)
        .run();

    if cfg!(debug_assertions) {
        let bound = analysis.len_lower_bound();
        for seed in &settings.seeds {
            let initial: Vec<Rational> = seed.iter().map(|&t| Rational::int(t)).collect();
            let len = evaluate(program, &initial).len();
            debug_assert!(bound <= len, "{}: lower bound {} > length {}", id, bound, len);
        }
    }

    if settings.skip_constant && top_is_constant(&analysis) {
        trace!(id, "skipping provably constant program");
        return None;
    }

    let mut sequences = settings.seeds.iter().map(|seed| {
        extend_sequence(program, seed, settings.sequence_len, settings.max_term)
    });
    let Some(primary) = sequences.next().flatten() else {
        trace!(id, "skipping degenerate output on the primary seed");
        return None;
    };
    if settings.skip_constant && is_constant(&primary, seed_len) {
        trace!(id, "skipping constant sequence");
        return None;
    }
    let Some(examples) = sequences.collect::<Option<Vec<_>>>() else {
        trace!(id, "skipping degenerate output on an example seed");
        return None;
    };

    Some(Candidate {
        id: id.to_string(),
        index,
        primary,
        examples,
    })
}

/// Assemble the problem whose pattern is `cluster.members[pattern]`
fn build_problem(
    settings: &Settings,
    cluster: &Cluster,
    pattern: usize,
    rng: &mut StdRng,
) -> Problem {
    let correct = &cluster.members[pattern];

    let mut foils: Vec<&Candidate> = cluster
        .members
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != pattern)
        .map(|(_, c)| c)
        .collect();
    foils.shuffle(rng);
    foils.truncate(settings.choice_count - 1);

    Problem {
        program: correct.id.clone(),
        seed_len: settings.seed_len(),
        example_sequences: correct.examples.clone(),
        correct_sequence: correct.primary.clone(),
        incorrect_choices: foils
            .into_iter()
            .map(|c| IncorrectChoice {
                sequence: c.primary.clone(),
                source_program: c.id.clone(),
            })
            .collect(),
    }
}

/// Generate `settings.pool_size` problems.
///
/// `on_progress` is awaited every `settings.progress_interval` candidates and
/// once more when the scan completes. Returning `ControlFlow::Break(())` from
/// any of these reports, the final one included, stops with a `Cancelled`
/// error.
///
/// Fails with `ConfigInvalid` when fewer than `pool_size` programs have
/// `choice_count - 1` foils agreeing with them on the example seeds.
pub async fn generate_problem_set<F, Fut>(settings: &Settings, mut on_progress: F) -> Result<Vec<Problem>>
where
    F: FnMut(Progress) -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    settings.validate()?;

    let total = settings.enumeration_bound();
    info!(
        total,
        difficulty = settings.difficulty,
        seeds = settings.seeds.len(),
        "scanning programs"
    );

    let mut clusters: Vec<Cluster> = Vec::new();
    let mut by_examples: HashMap<Vec<Sequence>, usize> = HashMap::new();

    for n in 0..total {
        if n > 0 && n % settings.progress_interval == 0 {
            let progress = Progress {
                scanned: n,
                total,
                groups: clusters.len(),
            };
            debug!(scanned = n, groups = clusters.len(), "checkpoint");
            if on_progress(progress).await.is_break() {
                info!(scanned = n, "scan cancelled");
                return Err(error::cancelled(n));
            }
            tokio::task::yield_now().await;
        }

        let id = enumerated_identifier(n);
        let program = match decode_identifier(&id) {
            Ok(program) => program,
            Err(err) => {
                trace!(id = %id, error = %err, "skipping undecodable identifier");
                continue;
            }
        };

        let Some(candidate) = evaluate_candidate(settings, n, &id, &program) else {
            continue;
        };
        let slot = *by_examples
            .entry(candidate.examples.clone())
            .or_insert_with(|| {
                clusters.push(Cluster { members: Vec::new() });
                clusters.len() - 1
            });
        if !clusters[slot].admit(candidate) {
            trace!(id = %id, "skipping duplicate behaviour");
        }
    }

    let done = Progress {
        scanned: total,
        total,
        groups: clusters.len(),
    };
    if on_progress(done).await.is_break() {
        info!(scanned = total, "scan cancelled");
        return Err(error::cancelled(total));
    }

    // (cluster, member) pairs with enough foils, in discovery order
    let mut patterns: Vec<(usize, usize)> = clusters
        .iter()
        .enumerate()
        .filter(|(_, cluster)| cluster.members.len() >= settings.choice_count)
        .flat_map(|(c, cluster)| (0..cluster.members.len()).map(move |m| (c, m)))
        .collect();
    patterns.sort_by_key(|&(c, m)| clusters[c].members[m].index);

    if patterns.len() < settings.pool_size {
        return Err(error::too_few_groups(
            patterns.len(),
            settings.pool_size,
            settings.difficulty,
        ));
    }

    let mut rng = StdRng::seed_from_u64(settings.rng_seed);
    let start = patterns.len() - settings.pool_size;
    let problems: Vec<Problem> = patterns[start..]
        .iter()
        .map(|&(c, m)| build_problem(settings, &clusters[c], m, &mut rng))
        .collect();

    info!(
        groups = clusters.len(),
        patterns = patterns.len(),
        problems = problems.len(),
        "problem set ready"
    );
    Ok(problems)
}

/// The problems to present: the fixed `settings.problem` when one is set,
/// otherwise a freshly generated set.
pub async fn resolve_problems<F, Fut>(settings: &Settings, on_progress: F) -> Result<Vec<Problem>>
where
    F: FnMut(Progress) -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    match &settings.problem {
        Some(id) => {
            let problem = decode_problem(id)?;
            info!(program = %problem.program, "replaying fixed problem");
            Ok(vec![problem])
        }
        None => generate_problem_set(settings, on_progress).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::tests::sample_problem;
    use stackbee_vm::{parse, ErrorKind};
    use std::future::{ready, Ready};

    fn keep_going(_: Progress) -> Ready<ControlFlow<()>> {
        ready(ControlFlow::Continue(()))
    }

    fn small_settings() -> Settings {
        Settings {
            difficulty: 3,
            pool_size: 4,
            choice_count: 3,
            progress_interval: 1024,
            ..Settings::default()
        }
    }

    fn parse_hex(id: &str) -> Program {
        decode_identifier(id).unwrap()
    }

    #[test]
    fn test_provably_constant() {
        let constant = |text: &str, depth| is_provably_constant(&parse(text).unwrap(), depth);
        assert!(constant("3", 1));
        assert!(constant("dup", 1));
        assert!(constant("0 +", 1));
        assert!(constant("dup -", 1));
        assert!(!constant("+", 1));
        assert!(!constant("dup 1 -", 1));
        assert!(!constant("dup", 0));
        // one path leaves 2, the other 3
        assert!(!constant("bgtz 4 2 1 bgtz 1 3", 1));
    }

    #[test]
    fn test_pruned_programs_are_constant_concretely() {
        let settings = Settings::default();
        for text in ["dup", "0 +", "swap swap", "4", "dup dup * swap -"] {
            let program = parse(text).unwrap();
            if is_provably_constant(&program, settings.origin_depth) {
                let seq = extend_sequence(&program, &[3, 7], 6, 10_000).unwrap();
                assert!(is_constant(&seq, 2), "{text}: {seq:?}");
            }
        }
    }

    #[test]
    fn test_evaluate_candidate() {
        let settings = Settings::default();
        let fib = parse("+").unwrap();
        let candidate = evaluate_candidate(&settings, 5, "5", &fib).unwrap();
        assert_eq!(candidate.primary, vec![1, 2, 3, 5, 8, 13, 21, 34]);
        assert_eq!(candidate.examples.len(), 1);
        assert_eq!(candidate.examples[0], vec![2, 1, 3, 4, 7, 11, 18, 29]);

        // fractions on the primary seed
        assert!(evaluate_candidate(&settings, 8, "8", &parse("/").unwrap()).is_none());
        // literal pattern
        assert!(evaluate_candidate(&settings, 3, "3", &parse("3").unwrap()).is_none());
    }

    #[test]
    fn test_cluster_keeps_first_program_per_primary() {
        let settings = Settings::default();
        let candidate = |text: &str| {
            let program = parse(text).unwrap();
            let id = program.to_hex().unwrap();
            evaluate_candidate(&settings, u64::from_str_radix(&id, 16).unwrap(), &id, &program)
                .unwrap()
        };
        let mut cluster = Cluster { members: Vec::new() };
        assert!(cluster.admit(candidate("-")));
        assert!(cluster.admit(candidate("4 % -")));
        // `0 + -` behaves exactly like `-`
        assert!(!cluster.admit(candidate("0 + -")));
        assert_eq!(cluster.members.len(), 2);
        assert_eq!(cluster.members[0].id, "6");
    }

    #[test]
    fn test_generate_problem_set() {
        let settings = small_settings();
        let problems = tokio_test::block_on(generate_problem_set(&settings, keep_going)).unwrap();

        assert_eq!(problems.len(), settings.pool_size);
        for problem in &problems {
            problem.validate().unwrap();
            assert_eq!(problem.choice_count(), settings.choice_count);
            assert_eq!(problem.seed_len, 2);
            assert_eq!(problem.example_sequences.len(), 1);
            assert_eq!(problem.correct_sequence.len(), settings.sequence_len);
            assert_eq!(&problem.correct_sequence[..2], &[1, 2]);
            assert_eq!(decode_problem(&problem.encode().unwrap()).unwrap(), *problem);
        }

        let mut patterns: Vec<_> = problems.iter().map(|p| p.program.clone()).collect();
        patterns.sort();
        patterns.dedup();
        assert_eq!(patterns.len(), settings.pool_size);
    }

    #[test]
    fn test_foils_agree_on_every_example_seed() {
        let settings = Settings {
            choice_count: 4,
            ..small_settings()
        };
        let problems = tokio_test::block_on(generate_problem_set(&settings, keep_going)).unwrap();
        assert_eq!(problems.len(), settings.pool_size);

        for problem in &problems {
            assert_eq!(problem.choice_count(), 4);
            for foil in &problem.incorrect_choices {
                let source = parse_hex(&foil.source_program);
                assert_ne!(foil.sequence, problem.correct_sequence);
                for (seed, example) in settings.example_seeds().iter().zip(&problem.example_sequences) {
                    let grown = extend_sequence(&source, seed, settings.sequence_len, settings.max_term);
                    assert_eq!(grown.as_ref(), Some(example), "{} on {:?}", foil.source_program, seed);
                }
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let settings = small_settings();
        let first = tokio_test::block_on(generate_problem_set(&settings, keep_going)).unwrap();
        let second = tokio_test::block_on(generate_problem_set(&settings, keep_going)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_few_groups() {
        let settings = Settings {
            difficulty: 1,
            ..Settings::default()
        };
        let err = tokio_test::block_on(generate_problem_set(&settings, keep_going)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("field"), Some("pool_size"));
        assert_eq!(err.context_value("needed"), Some("16"));
    }

    #[test]
    fn test_invalid_settings_fail_before_scanning() {
        let settings = Settings {
            choice_count: 0,
            ..Settings::default()
        };
        let mut calls = 0;
        let err = tokio_test::block_on(generate_problem_set(&settings, |p| {
            calls += 1;
            keep_going(p)
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_progress_checkpoints() {
        let settings = small_settings();
        let mut reports = Vec::new();
        generate_problem_set(&settings, |p| {
            reports.push(p);
            ready(ControlFlow::Continue(()))
        })
        .await
        .unwrap();

        let scanned: Vec<u64> = reports.iter().map(|p| p.scanned).collect();
        assert_eq!(scanned, vec![1024, 2048, 3072, 4096]);
        assert!(reports.iter().all(|p| p.total == 4096));
        assert!(reports.windows(2).all(|w| w[0].groups <= w[1].groups));
    }

    #[tokio::test]
    async fn test_cancel_at_checkpoint() {
        let settings = Settings {
            progress_interval: 16,
            ..small_settings()
        };
        let err = generate_problem_set(&settings, |_| async { ControlFlow::Break(()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.context_value("scanned"), Some("16"));
    }

    #[tokio::test]
    async fn test_cancel_at_final_report() {
        let settings = small_settings();
        let err = generate_problem_set(&settings, |p: Progress| async move {
            if p.scanned == p.total {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.context_value("scanned"), Some("4096"));
    }

    #[tokio::test]
    async fn test_resolve_fixed_problem() {
        let problem = sample_problem();
        let settings = Settings {
            problem: Some(problem.encode().unwrap()),
            ..small_settings()
        };
        let mut calls = 0;
        let problems = resolve_problems(&settings, |p| {
            calls += 1;
            keep_going(p)
        })
        .await
        .unwrap();
        assert_eq!(problems, vec![problem]);
        assert_eq!(calls, 0);

        let generated = resolve_problems(&small_settings(), keep_going).await.unwrap();
        assert_eq!(generated.len(), 4);
    }
}
