//! # stackbee CLI
//!
//! Command-line access to the stackbee VM and puzzle generator.
//!
//! Usage:
//!   stackbee to-hex <program>
//!   stackbee from-hex <id>
//!   stackbee eval <program> [--stack <values>] [--trace]
//!   stackbee analyze <program> [--origin-depth <k>] [--trace]
//!   stackbee sequence <program> [--seed <values>] [--len <n>]
//!   stackbee generate [--settings <file>] [--difficulty <d>] [--pool-size <n>] [--json]
//!   stackbee problem <id> [--prompts] [--pattern <text>]
//!   stackbee grade <id> --response <file>
//!   stackbee settings [<file>]
//!
//! Examples:
//!   stackbee eval "dup rot +" --stack "1 1"
//!   stackbee analyze "dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +" --trace
//!   stackbee sequence "len 2 * 1 - 2 * * len 1 + /" --seed "1 1" --len 10
//!   stackbee generate --difficulty 3 --pool-size 4

use clap::{Parser, Subcommand};
use stackbee_puzzle::{
    checker_prompt, extend_sequence, format_sequence, index_to_letters, parse_choice,
    resolve_problems, solver_prompt, verifier_prompt, ChoiceLayout, Problem, Progress, Settings,
};
use stackbee_vm::{
    evaluate_traced, parse, Error, Opcode, Program, Rational, Result, SymbolicInterpreter,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackbee")]
#[command(author, version, about = "stackbee - stack programs and sequence puzzles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compact identifier of a program
    ToHex {
        /// Program in mnemonic form, e.g. "dup rot +"
        program: String,
    },
    /// Decode a compact identifier and list its ops
    FromHex {
        id: String,
    },
    /// Run a program on a concrete stack
    Eval {
        program: String,

        /// Initial stack, bottom first, e.g. "1 2 3/4"
        #[arg(short, long, default_value = "")]
        stack: String,

        /// Print the stack at every op boundary
        #[arg(short, long)]
        trace: bool,
    },
    /// Run a program symbolically
    Analyze {
        program: String,

        /// Pre-existing slots above the symbolic origin
        #[arg(short, long, default_value = "1")]
        origin_depth: usize,

        /// Print the symbolic stack at every op boundary
        #[arg(short, long)]
        trace: bool,
    },
    /// Grow a sequence from a seed
    Sequence {
        program: String,

        /// Seed terms, e.g. "1 1"
        #[arg(short, long, default_value = "1 2")]
        seed: String,

        /// Terms to produce, seed included
        #[arg(short, long, default_value = "10")]
        len: usize,

        /// Largest term magnitude before the sequence counts as degenerate
        #[arg(short, long, default_value = "1000000")]
        max_term: i64,
    },
    /// Generate a problem set
    Generate {
        /// Settings JSON file (defaults are used otherwise)
        #[arg(long)]
        settings: Option<PathBuf>,

        #[arg(short, long)]
        difficulty: Option<u32>,

        #[arg(short, long)]
        pool_size: Option<usize>,

        /// Print the problems as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a problem from its ID
    Problem {
        id: String,

        /// Settings JSON file providing prompt templates
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Position of the correct choice (0 = A)
        #[arg(long, default_value = "0")]
        slot: usize,

        /// Print the solver prompt
        #[arg(long)]
        prompts: bool,

        /// A stated pattern; prints the verifier and checker prompts for it
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Grade a solver response to a problem
    Grade {
        id: String,

        /// File holding the response text
        #[arg(short, long)]
        response: PathBuf,

        /// Position of the correct choice the prompt was rendered with
        #[arg(long, default_value = "0")]
        slot: usize,
    },
    /// Print default settings, or check and print a settings file
    Settings {
        file: Option<PathBuf>,
    },
}

fn parse_terms(text: &str) -> Result<Vec<i64>> {
    Rational::parse_list(text)?
        .into_iter()
        .map(|r| {
            r.to_integer()
                .ok_or_else(|| Error::parse_failed(format!("seed term {} is not an integer", r)))
        })
        .collect()
}

fn format_stack(stack: &[Rational]) -> String {
    let values: Vec<String> = stack.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(", "))
}

fn format_ops(ops: &[Opcode]) -> String {
    ops.iter().map(|op| op.to_string()).collect::<Vec<_>>().join(" ")
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => {
            let settings = Settings::load(path)?;
            settings.validate()?;
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

fn cmd_eval(program: &str, stack: &str, trace: bool) -> Result<()> {
    let program = parse(program)?;
    let initial = Rational::parse_list(stack)?;

    let result = evaluate_traced(&program, &initial, |remaining, stack| {
        if trace {
            println!("{:>32} | {}", format_ops(remaining), format_stack(stack));
        }
    });
    println!("{}", format_stack(&result));
    Ok(())
}

fn cmd_analyze(program: &str, origin_depth: usize, trace: bool) -> Result<()> {
    let program = parse(program)?;
    let result = SymbolicInterpreter::new(&program)
        .origin_depth(origin_depth)
        .run_traced(|remaining, stack| {
            if trace {
                println!("{:>32} | {}", format_ops(remaining), stack);
            }
        });

    println!("stack:        {}", result);
    match result.top_of_stack() {
        Some(top) => println!("top:          {}", top),
        None => println!("top:          (paths end at different heights)"),
    }
    println!("depth change: {:+}", result.depth_change());
    println!("length >=     {}", result.len_lower_bound());
    Ok(())
}

fn cmd_sequence(program: &str, seed: &str, len: usize, max_term: i64) -> Result<()> {
    let program = parse(program)?;
    let seed = parse_terms(seed)?;
    match extend_sequence(&program, &seed, len, max_term) {
        Some(sequence) => println!("{}", format_sequence(&sequence)),
        None => println!("(degenerate: empty stack, fraction, or a term beyond {})", max_term),
    }
    Ok(())
}

fn print_problem(problem: &Problem, layout: &ChoiceLayout) -> Result<()> {
    let program = problem.decode_program()?;
    println!("pattern: {}  ({})", problem.program, program);
    for example in &problem.example_sequences {
        println!("  {}", format_sequence(example));
    }
    println!("choices:");
    for (i, choice) in layout.choices(problem).iter().enumerate() {
        let mark = if layout.is_correct(i) { "*" } else { " " };
        println!("{} ({}) {}", mark, index_to_letters(i), format_sequence(choice));
    }
    Ok(())
}

async fn cmd_generate(
    settings: Option<&PathBuf>,
    difficulty: Option<u32>,
    pool_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut settings = load_settings(settings)?;
    if let Some(difficulty) = difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(pool_size) = pool_size {
        settings.pool_size = pool_size;
    }

    let problems = resolve_problems(&settings, |progress: Progress| {
        eprint!(
            "\rscanned {}/{} ({} sequences)",
            progress.scanned, progress.total, progress.groups
        );
        std::future::ready(ControlFlow::Continue(()))
    })
    .await;
    eprintln!();
    let problems = problems?;

    if json {
        println!("{}", serde_json::to_string_pretty(&problems)?);
        return Ok(());
    }
    for problem in &problems {
        println!("{}", problem.encode()?);
        print_problem(problem, &ChoiceLayout::new(0))?;
        println!();
    }
    Ok(())
}

fn cmd_problem(
    id: &str,
    settings: Option<&PathBuf>,
    slot: usize,
    prompts: bool,
    pattern: Option<&str>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let problem = Problem::decode(id)?;
    let layout = ChoiceLayout::new(slot.min(problem.choice_count() - 1));

    print_problem(&problem, &layout)?;
    if prompts {
        println!("\n=== SOLVER ===\n{}", solver_prompt(&settings.prompts, &problem, &layout)?);
    }
    if let Some(pattern) = pattern {
        println!(
            "\n=== VERIFIER ===\n{}",
            verifier_prompt(&settings.prompts, &problem, &layout, pattern)?
        );
        for i in 0..problem.choice_count() {
            println!(
                "\n=== CHECKER ({}) ===\n{}",
                index_to_letters(i),
                checker_prompt(&settings.prompts, &problem, &layout, pattern, i)?
            );
        }
    }
    Ok(())
}

fn cmd_grade(id: &str, response: &PathBuf, slot: usize) -> Result<()> {
    let problem = Problem::decode(id)?;
    let layout = ChoiceLayout::new(slot.min(problem.choice_count() - 1));
    let text = std::fs::read_to_string(response)?;

    match parse_choice(&text)? {
        Some(index) if layout.is_correct(index) => println!("correct ({})", index_to_letters(index)),
        Some(index) => println!(
            "incorrect: picked ({}), answer is ({})",
            index_to_letters(index),
            index_to_letters(layout.correct_index)
        ),
        None => println!(
            "no match claimed, answer is ({})",
            index_to_letters(layout.correct_index)
        ),
    }
    Ok(())
}

fn cmd_settings(file: Option<&PathBuf>) -> Result<()> {
    let settings = load_settings(file)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::ToHex { program } => {
            println!("{}", parse(&program)?.to_hex()?);
            Ok(())
        }
        Commands::FromHex { id } => {
            Program::from_hex(&id)?.pretty_print();
            Ok(())
        }
        Commands::Eval { program, stack, trace } => cmd_eval(&program, &stack, trace),
        Commands::Analyze {
            program,
            origin_depth,
            trace,
        } => cmd_analyze(&program, origin_depth, trace),
        Commands::Sequence {
            program,
            seed,
            len,
            max_term,
        } => cmd_sequence(&program, &seed, len, max_term),
        Commands::Generate {
            settings,
            difficulty,
            pool_size,
            json,
        } => cmd_generate(settings.as_ref(), difficulty, pool_size, json).await,
        Commands::Problem {
            id,
            settings,
            slot,
            prompts,
            pattern,
        } => cmd_problem(&id, settings.as_ref(), slot, prompts, pattern.as_deref()),
        Commands::Grade { id, response, slot } => cmd_grade(&id, &response, slot),
        Commands::Settings { file } => cmd_settings(file.as_ref()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        debug!(error = ?e, "command failed");
        if e.is_user_correctable() {
            eprintln!("Error: {}", e.message());
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
