//! # Concrete interpreter
//!
//! Runs a program against a stack of rationals. Execution never fails:
//! missing operands read as `0`, degenerate arithmetic yields `0`, and a
//! branch past the end of the program simply halts.

use crate::opcode::{BinOp, Opcode, Program};
use crate::rational::Rational;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};

/// State of the interpreter after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// More ops remain
    Running,
    /// The instruction pointer passed the last op
    Halted,
}

/// One op boundary of a concrete run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Ops still to execute, the next one first
    pub remaining: Vec<Opcode>,
    /// Stack at this boundary, bottom first
    pub stack: Vec<Rational>,
}

/// The concrete stackbee interpreter
#[derive(Debug, Clone)]
pub struct Interpreter<'a> {
    program: &'a Program,
    pc: usize,
    stack: Stack,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter positioned at the first op of `program`
    pub fn new(program: &'a Program, initial: &[Rational]) -> Self {
        Self {
            program,
            pc: 0,
            stack: Stack::from_values(initial.iter().copied()),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Ops not yet executed
    pub fn remaining(&self) -> &'a [Opcode] {
        let program: &'a Program = self.program;
        program.code.get(self.pc..).unwrap_or(&[])
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.code.len()
    }

    /// Execute one op
    pub fn step(&mut self) -> ExecutionState {
        let Some(&op) = self.program.code.get(self.pc) else {
            return ExecutionState::Halted;
        };
        self.pc += 1;

        match op {
            Opcode::Push { value } => self.stack.push(value),
            Opcode::Dup => self.stack.dup(),
            Opcode::Swap => self.stack.swap(),
            Opcode::Rot => self.stack.rot(),
            Opcode::Unrot => self.stack.unrot(),
            Opcode::Add => self.binary(BinOp::Add),
            Opcode::Sub => self.binary(BinOp::Sub),
            Opcode::Mul => self.binary(BinOp::Mul),
            Opcode::Div => self.binary(BinOp::Div),
            Opcode::Mod => self.binary(BinOp::Mod),
            Opcode::Len => {
                let len = self.stack.len() as i64;
                self.stack.push(Rational::int(len));
            }
            Opcode::Bgtz { offset } => {
                if self.stack.pop().is_positive() {
                    self.pc = self.program.branch_target(self.pc - 1, offset);
                }
            }
        }

        if self.is_halted() {
            ExecutionState::Halted
        } else {
            ExecutionState::Running
        }
    }

    fn binary(&mut self, op: BinOp) {
        let x = self.stack.pop();
        let y = self.stack.pop();
        self.stack.push(op.apply(y, x));
    }

    /// Run to completion, calling `trace` at every op boundary including the last
    pub fn run_traced<F>(mut self, mut trace: F) -> Stack
    where
        F: FnMut(&[Opcode], &[Rational]),
    {
        loop {
            trace(self.remaining(), self.stack.as_slice());
            if self.is_halted() {
                return self.stack;
            }
            self.step();
        }
    }

    /// Run to completion
    pub fn run(mut self) -> Stack {
        while self.step() == ExecutionState::Running {}
        self.stack
    }
}

/// Evaluate `program` on `initial` and return the final stack, bottom first
pub fn evaluate(program: &Program, initial: &[Rational]) -> Vec<Rational> {
    Interpreter::new(program, initial).run().into_vec()
}

/// Like [`evaluate`], reporting the remaining ops and stack at each op boundary
pub fn evaluate_traced<F>(program: &Program, initial: &[Rational], trace: F) -> Vec<Rational>
where
    F: FnMut(&[Opcode], &[Rational]),
{
    Interpreter::new(program, initial).run_traced(trace).into_vec()
}

/// Collect every op boundary of a run, ending with the final state
pub fn trace(program: &Program, initial: &[Rational]) -> Vec<TraceStep> {
    let mut steps = Vec::new();
    evaluate_traced(program, initial, |remaining, stack| {
        steps.push(TraceStep {
            remaining: remaining.to_vec(),
            stack: stack.to_vec(),
        });
    });
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::parse;

    fn run(text: &str, initial: &[i64]) -> Vec<Rational> {
        let program = parse(text).unwrap();
        let initial: Vec<Rational> = initial.iter().map(|&v| Rational::int(v)).collect();
        evaluate(&program, &initial)
    }

    fn ints(values: &[i64]) -> Vec<Rational> {
        values.iter().map(|&v| Rational::int(v)).collect()
    }

    #[test]
    fn test_add() {
        assert_eq!(run("+", &[1, 3]), ints(&[4]));
    }

    #[test]
    fn test_underflow_defaults() {
        assert_eq!(run("swap", &[1]), ints(&[1, 0]));
        assert_eq!(run("*", &[1]), ints(&[0]));
        assert_eq!(run("%", &[]), ints(&[0]));
        assert_eq!(run("dup", &[]), ints(&[0, 0]));
    }

    #[test]
    fn test_rotation() {
        assert_eq!(run("rot", &[1, 2, 3]), ints(&[2, 3, 1]));
        assert_eq!(run("unrot", &[1, 2, 3]), ints(&[3, 1, 2]));
        assert_eq!(run("unrot +", &[1, 3, 5]), ints(&[5, 4]));
    }

    #[test]
    fn test_operand_order() {
        assert_eq!(run("0 1 - 3 /", &[]), vec![Rational::new(-1, 3)]);
        assert_eq!(run("- 1 - -", &[1, 2, 2, 2]), ints(&[1, 3]));
        assert_eq!(run("/ + 2 *", &[1, 2, 4, 4]), ints(&[1, 6]));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run("1 0 /", &[]), ints(&[0]));
        assert_eq!(run("7 0 %", &[]), ints(&[0]));
    }

    #[test]
    fn test_branch() {
        assert_eq!(run("bgtz 0 1", &[]), ints(&[1]));
        assert_eq!(run("bgtz 15", &[]), ints(&[]));
        assert_eq!(run("1 bgtz 1 5 6", &[]), ints(&[6]));
        assert_eq!(run("0 bgtz 1 5 6", &[]), ints(&[5, 6]));
        // jumping past the end halts
        assert_eq!(run("1 bgtz 9 5", &[]), ints(&[]));
        // offsets count slots, and a bgtz pair fills two
        assert_eq!(run("1 bgtz 3 0 bgtz 0 7 8", &[]), ints(&[7, 8]));
        // landing inside a pair resumes after it
        assert_eq!(run("1 bgtz 2 0 bgtz 0 7 8", &[]), ints(&[7, 8]));
    }

    #[test]
    fn test_len() {
        assert_eq!(run("len", &[]), ints(&[0]));
        assert_eq!(run("len len", &[4, 4]), ints(&[4, 4, 2, 3]));
    }

    #[test]
    fn test_catalan() {
        let catalan = "len 2 * 1 - 2 * * len 1 + /";
        assert_eq!(run(catalan, &[1, 1, 2]), ints(&[1, 1, 5]));
        assert_eq!(run(catalan, &[1, 1, 2, 5]), ints(&[1, 1, 2, 14]));
    }

    #[test]
    fn test_collatz() {
        let collatz = "dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +";
        assert_eq!(run(collatz, &[3, 10]), ints(&[3, 5]));
        assert_eq!(run(collatz, &[3, 10, 5]), ints(&[3, 10, 16]));
    }

    #[test]
    fn test_step_by_step() {
        let program = parse("1 2 +").unwrap();
        let mut interp = Interpreter::new(&program, &[]);
        assert_eq!(interp.remaining().len(), 3);
        assert_eq!(interp.step(), ExecutionState::Running);
        assert_eq!(interp.step(), ExecutionState::Running);
        assert_eq!(interp.stack().len(), 2);
        assert_eq!(interp.step(), ExecutionState::Halted);
        assert_eq!(interp.step(), ExecutionState::Halted);
        assert_eq!(interp.pc(), 3);
        assert_eq!(interp.stack().as_slice(), ints(&[3]).as_slice());
    }

    #[test]
    fn test_trace_visits_every_boundary() {
        let program = parse("1 bgtz 1 5 6").unwrap();
        let steps = trace(&program, &[]);
        // start, after push, after bgtz (skipping `5`), after `6`
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].remaining.len(), 4);
        assert_eq!(steps[2].remaining, vec![Opcode::push(6)]);
        assert!(steps[3].remaining.is_empty());
        assert_eq!(steps[3].stack, ints(&[6]));
    }

    #[test]
    fn test_trace_does_not_change_result() {
        let program = parse("dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +").unwrap();
        let initial = ints(&[3, 10, 5]);
        let mut calls = 0;
        let traced = evaluate_traced(&program, &initial, |_, _| calls += 1);
        assert_eq!(traced, evaluate(&program, &initial));
        assert!(calls > 0);
    }
}
