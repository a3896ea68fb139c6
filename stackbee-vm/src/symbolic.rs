//! # Symbolic interpreter
//!
//! Runs a program without any concrete input and describes every final
//! stack slot as an algebraic expression over the values that were already
//! on the stack.
//!
//! ## Origin and references
//! The origin sits `origin_depth` slots below the initial top. Reading
//! below what has been modeled first materializes the pre-existing slots
//! above the origin as `TopRef(0)` (the initial top), `TopRef(1)`, ... and
//! then allocates `BottomRef(0)`, `BottomRef(1)`, ... below it. Values
//! pushed while the stack is below the origin land in `bottom`, all other
//! pushes land in `top`.
//!
//! ## Branches
//! A `bgtz` whose condition folds to literals follows the decided path.
//! Otherwise both continuations run to the end and the two final stacks are
//! merged slot by slot, aligned on their position relative to the origin.

use crate::opcode::{BinOp, Opcode, Program};
use crate::rational::Rational;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Default number of pre-existing slots above the origin
pub const DEFAULT_ORIGIN_DEPTH: usize = 1;

/// A symbolic value, displayed in postfix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymExpr {
    /// A known value
    Lit(Rational),
    /// The i-th pre-existing value above the origin, counted from the initial top
    Top(usize),
    /// The i-th pre-existing value below the origin, counted downwards
    Bottom(usize),
    /// The stack depth pushed by the `len` at op index i
    Len(usize),
    /// `lhs rhs op`
    Apply(BinOp, Rc<SymExpr>, Rc<SymExpr>),
}

impl SymExpr {
    pub fn as_literal(&self) -> Option<Rational> {
        match self {
            SymExpr::Lit(value) => Some(*value),
            _ => None,
        }
    }

    /// Apply `op` to `lhs` and `rhs` (the former top), folding whatever does
    /// not depend on an unknown.
    pub fn fold(op: BinOp, lhs: &SymExpr, rhs: &SymExpr) -> SymExpr {
        let zero = SymExpr::Lit(Rational::ZERO);
        let is = |e: &SymExpr, v: Rational| e.as_literal() == Some(v);

        if let (Some(a), Some(b)) = (lhs.as_literal(), rhs.as_literal()) {
            return SymExpr::Lit(op.apply(a, b));
        }

        match op {
            BinOp::Add if is(rhs, Rational::ZERO) => lhs.clone(),
            BinOp::Add if is(lhs, Rational::ZERO) => rhs.clone(),
            BinOp::Sub if is(rhs, Rational::ZERO) => lhs.clone(),
            BinOp::Sub if lhs == rhs => zero,
            BinOp::Mul if is(lhs, Rational::ZERO) || is(rhs, Rational::ZERO) => zero,
            BinOp::Mul if is(rhs, Rational::ONE) => lhs.clone(),
            BinOp::Mul if is(lhs, Rational::ONE) => rhs.clone(),
            BinOp::Div if is(lhs, Rational::ZERO) || is(rhs, Rational::ZERO) => zero,
            BinOp::Div if is(rhs, Rational::ONE) => lhs.clone(),
            BinOp::Mod if is(lhs, Rational::ZERO) || is(rhs, Rational::ZERO) => zero,
            BinOp::Mod if lhs == rhs => zero,
            _ => SymExpr::Apply(op, Rc::new(lhs.clone()), Rc::new(rhs.clone())),
        }
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymExpr::Lit(value) => write!(f, "{}", value),
            SymExpr::Top(i) => write!(f, "t{}", i),
            SymExpr::Bottom(i) => write!(f, "b{}", i),
            SymExpr::Len(i) => write!(f, "n{}", i),
            SymExpr::Apply(op, lhs, rhs) => write!(f, "{} {} {}", lhs, rhs, op.symbol()),
        }
    }
}

/// The distinct expressions one stack slot may hold across explored branches.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymExprSet {
    exprs: BTreeSet<SymExpr>,
}

impl SymExprSet {
    pub fn single(expr: SymExpr) -> Self {
        Self {
            exprs: BTreeSet::from([expr]),
        }
    }

    pub fn literal(value: Rational) -> Self {
        Self::single(SymExpr::Lit(value))
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymExpr> {
        self.exprs.iter()
    }

    pub fn contains(&self, expr: &SymExpr) -> bool {
        self.exprs.contains(expr)
    }

    /// The only expression, if there are no alternatives
    pub fn as_single(&self) -> Option<&SymExpr> {
        match self.exprs.len() {
            1 => self.exprs.iter().next(),
            _ => None,
        }
    }

    /// Union of both sets, duplicates removed
    pub fn union(&self, other: &SymExprSet) -> SymExprSet {
        SymExprSet {
            exprs: self.exprs.union(&other.exprs).cloned().collect(),
        }
    }

    /// Every combination `lhs ⊖ rhs` of the alternatives, folded
    pub fn apply(op: BinOp, lhs: &SymExprSet, rhs: &SymExprSet) -> SymExprSet {
        let exprs = lhs
            .iter()
            .flat_map(|l| rhs.iter().map(move |r| SymExpr::fold(op, l, r)))
            .collect();
        SymExprSet { exprs }
    }

    /// Resolve a branch condition: `Some(true)` if every alternative is a
    /// positive literal, `Some(false)` if none can be positive.
    pub fn decide_positive(&self) -> Option<bool> {
        let mut positive = 0;
        for expr in &self.exprs {
            match expr.as_literal() {
                Some(value) if value.is_positive() => positive += 1,
                Some(_) => {}
                None => return None,
            }
        }
        if positive == self.exprs.len() {
            Some(true)
        } else if positive == 0 {
            Some(false)
        } else {
            None
        }
    }
}

impl fmt::Display for SymExprSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(expr) = self.as_single() {
            return write!(f, "{}", expr);
        }
        write!(f, "{{")?;
        for (i, expr) in self.exprs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", expr)?;
        }
        write!(f, "}}")
    }
}

/// The abstract stack of a symbolic run.
///
/// Layout, bottom to top: unallocated `BottomRef`s, `bottom`, the
/// `TopRef`s not yet read, then `top`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicStack {
    top: Vec<SymExprSet>,
    bottom: Vec<SymExprSet>,
    origin_depth: usize,
    top_refs: usize,
    bottom_refs: usize,
    /// Modeled slots that may be missing on some explored path
    shortfall: usize,
    /// Explored paths end at different heights
    ragged: bool,
}

impl SymbolicStack {
    pub fn new(origin_depth: usize) -> Self {
        Self {
            top: Vec::new(),
            bottom: Vec::new(),
            origin_depth,
            top_refs: 0,
            bottom_refs: 0,
            shortfall: 0,
            ragged: false,
        }
    }

    /// Slots above the origin, bottom first
    pub fn top(&self) -> &[SymExprSet] {
        &self.top
    }

    /// Slots below the origin, bottom first
    pub fn bottom(&self) -> &[SymExprSet] {
        &self.bottom
    }

    pub fn origin_depth(&self) -> usize {
        self.origin_depth
    }

    /// Number of `TopRef`s allocated
    pub fn top_refs(&self) -> usize {
        self.top_refs
    }

    /// Number of `BottomRef`s allocated
    pub fn bottom_refs(&self) -> usize {
        self.bottom_refs
    }

    /// Check if explored paths may end at different heights
    pub fn is_ragged(&self) -> bool {
        self.ragged
    }

    fn unread_top_refs(&self) -> usize {
        self.origin_depth - self.top_refs
    }

    /// Stack height relative to the origin
    pub fn height(&self) -> isize {
        (self.unread_top_refs() + self.top.len() + self.bottom.len()) as isize
            - self.bottom_refs as isize
    }

    /// Net change in stack depth over the run
    pub fn depth_change(&self) -> isize {
        self.height() - self.origin_depth as isize
    }

    /// A lower bound on the final length of any concrete run of the program.
    ///
    /// Counts the slots every explored path pushed and left on the stack.
    pub fn len_lower_bound(&self) -> usize {
        (self.top.len() + self.bottom.len()).saturating_sub(self.shortfall)
    }

    /// The final top slot, or `None` when paths end at different heights
    pub fn top_of_stack(&self) -> Option<SymExprSet> {
        if self.ragged {
            return None;
        }
        if let Some(set) = self.top.last() {
            return Some(set.clone());
        }
        if self.top_refs < self.origin_depth {
            return Some(SymExprSet::single(SymExpr::Top(self.top_refs)));
        }
        if let Some(set) = self.bottom.last() {
            return Some(set.clone());
        }
        Some(SymExprSet::single(SymExpr::Bottom(self.bottom_refs)))
    }

    /// Modeled slots bottom to top
    pub fn slots(&self) -> impl Iterator<Item = &SymExprSet> {
        self.bottom.iter().chain(self.top.iter())
    }

    fn pop(&mut self) -> SymExprSet {
        if let Some(set) = self.top.pop() {
            return set;
        }
        if self.top_refs < self.origin_depth {
            let i = self.top_refs;
            self.top_refs += 1;
            return SymExprSet::single(SymExpr::Top(i));
        }
        if let Some(set) = self.bottom.pop() {
            return set;
        }
        let i = self.bottom_refs;
        self.bottom_refs += 1;
        SymExprSet::single(SymExpr::Bottom(i))
    }

    fn push(&mut self, set: SymExprSet) {
        if self.height() < 0 {
            self.bottom.push(set);
        } else {
            self.top.push(set);
        }
    }

    /// Execute a non-branching op found at index `pc`
    fn execute(&mut self, op: Opcode, pc: usize) {
        match op {
            Opcode::Push { value } => self.push(SymExprSet::literal(value)),
            Opcode::Dup => {
                let x = self.pop();
                self.push(x.clone());
                self.push(x);
            }
            Opcode::Swap => {
                let x = self.pop();
                let y = self.pop();
                self.push(x);
                self.push(y);
            }
            Opcode::Rot => {
                let c = self.pop();
                let b = self.pop();
                let a = self.pop();
                self.push(b);
                self.push(c);
                self.push(a);
            }
            Opcode::Unrot => {
                let c = self.pop();
                let b = self.pop();
                let a = self.pop();
                self.push(c);
                self.push(a);
                self.push(b);
            }
            Opcode::Len => self.push(SymExprSet::single(SymExpr::Len(pc))),
            Opcode::Bgtz { .. } => {
                self.pop();
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                if let Some(bin) = op.binary() {
                    let x = self.pop();
                    let y = self.pop();
                    self.push(SymExprSet::apply(bin, &y, &x));
                }
            }
        }
    }

    /// Explicit slots from a common base position, with `TopRef`s up to
    /// `top_refs` and `BottomRef`s up to `bottom_refs` materialized.
    fn aligned_slots(&self, top_refs: usize, bottom_refs: usize) -> Vec<SymExprSet> {
        let k = self.origin_depth;
        let mut slots = Vec::new();
        slots.extend(
            (self.bottom_refs..bottom_refs)
                .rev()
                .map(|i| SymExprSet::single(SymExpr::Bottom(i))),
        );
        slots.extend(self.bottom.iter().cloned());
        // positions above the origin still holding an unread TopRef
        slots.extend(
            (k - top_refs..k - self.top_refs).map(|p| SymExprSet::single(SymExpr::Top(k - 1 - p))),
        );
        slots.extend(self.top.iter().cloned());
        slots
    }

    /// Merge the final stacks of two alternative paths from one snapshot
    pub fn merge(a: SymbolicStack, b: SymbolicStack) -> SymbolicStack {
        let top_refs = a.top_refs.max(b.top_refs);
        let bottom_refs = a.bottom_refs.max(b.bottom_refs);
        let lower_bound = a.len_lower_bound().min(b.len_lower_bound());

        let left = a.aligned_slots(top_refs, bottom_refs);
        let right = b.aligned_slots(top_refs, bottom_refs);
        let ragged = a.ragged || b.ragged || left.len() != right.len();

        let mut slots = Vec::with_capacity(left.len().max(right.len()));
        for i in 0..left.len().max(right.len()) {
            let set = match (left.get(i), right.get(i)) {
                (Some(l), Some(r)) => l.union(r),
                (Some(only), None) | (None, Some(only)) => only.clone(),
                (None, None) => break,
            };
            slots.push(set);
        }

        let shortfall = slots.len().saturating_sub(lower_bound);
        let top = slots.split_off(bottom_refs.min(slots.len()));
        SymbolicStack {
            top,
            bottom: slots,
            origin_depth: a.origin_depth,
            top_refs,
            bottom_refs,
            shortfall,
            ragged,
        }
    }
}

impl fmt::Display for SymbolicStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |slots: &[SymExprSet]| {
            slots.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
        };
        write!(f, "[")?;
        if self.bottom_refs > 0 || !self.bottom.is_empty() {
            write!(f, "{} | ", join(&self.bottom))?;
        }
        write!(f, "{}]", join(&self.top))
    }
}

/// Symbolic interpreter over a borrowed program
#[derive(Debug, Clone, Copy)]
pub struct SymbolicInterpreter<'a> {
    program: &'a Program,
    origin_depth: usize,
}

impl<'a> SymbolicInterpreter<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            origin_depth: DEFAULT_ORIGIN_DEPTH,
        }
    }

    /// Set how many pre-existing slots sit above the origin
    pub fn origin_depth(mut self, origin_depth: usize) -> Self {
        self.origin_depth = origin_depth;
        self
    }

    pub fn run(&self) -> SymbolicStack {
        self.run_traced(|_, _| {})
    }

    /// Run, calling `trace` with the remaining ops and the stack at every op
    /// boundary of every explored path.
    pub fn run_traced<F>(&self, mut trace: F) -> SymbolicStack
    where
        F: FnMut(&[Opcode], &SymbolicStack),
    {
        self.run_from(0, SymbolicStack::new(self.origin_depth), &mut trace)
    }

    fn run_from(
        &self,
        mut pc: usize,
        mut stack: SymbolicStack,
        trace: &mut dyn FnMut(&[Opcode], &SymbolicStack),
    ) -> SymbolicStack {
        let code = &self.program.code;
        loop {
            trace(code.get(pc..).unwrap_or(&[]), &stack);
            let Some(&op) = code.get(pc) else {
                return stack;
            };
            pc += 1;

            let Opcode::Bgtz { offset } = op else {
                stack.execute(op, pc - 1);
                continue;
            };
            let condition = stack.pop();
            match condition.decide_positive() {
                Some(true) => pc = self.program.branch_target(pc - 1, offset),
                Some(false) => {}
                None => {
                    let fall_through = self.run_from(pc, stack.clone(), trace);
                    let target = self.program.branch_target(pc - 1, offset);
                    let taken = self.run_from(target, stack, trace);
                    return SymbolicStack::merge(fall_through, taken);
                }
            }
        }
    }
}

/// Run `program` symbolically with the default origin depth
pub fn evaluate_symbolic(program: &Program) -> SymbolicStack {
    SymbolicInterpreter::new(program).run()
}

/// Like [`evaluate_symbolic`], reporting every op boundary to `trace`
pub fn evaluate_symbolic_traced<F>(program: &Program, trace: F) -> SymbolicStack
where
    F: FnMut(&[Opcode], &SymbolicStack),
{
    SymbolicInterpreter::new(program).run_traced(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::parse;

    fn analyze(text: &str) -> SymbolicStack {
        evaluate_symbolic(&parse(text).unwrap())
    }

    fn rendered(stack: &SymbolicStack) -> Vec<String> {
        stack.slots().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_subtracting_zero_is_identity() {
        let stack = analyze("0 -");
        assert_eq!(rendered(&stack), vec!["t0"]);
        assert_eq!(stack.top_of_stack(), Some(SymExprSet::single(SymExpr::Top(0))));
    }

    #[test]
    fn test_value_minus_itself_is_zero() {
        let stack = analyze("dup -");
        assert_eq!(rendered(&stack), vec!["0"]);
        assert_eq!(stack.top_of_stack(), Some(SymExprSet::literal(Rational::ZERO)));
    }

    #[test]
    fn test_zero_absorption_folds() {
        assert_eq!(rendered(&analyze("0 /")), vec!["0"]);
        assert_eq!(rendered(&analyze("0 %")), vec!["0"]);
        assert_eq!(rendered(&analyze("0 *")), vec!["0"]);
        assert_eq!(rendered(&analyze("1 *")), vec!["t0"]);
        assert_eq!(rendered(&analyze("dup %")), vec!["0"]);
        assert_eq!(rendered(&analyze("1 2 + 3 *")), vec!["9"]);
    }

    #[test]
    fn test_postfix_rendering() {
        assert_eq!(rendered(&analyze("len 2 *")), vec!["n0 2 *"]);
        assert_eq!(rendered(&analyze("dup 1 + *")), vec!["t0 t0 1 + *"]);
    }

    #[test]
    fn test_underflow_allocates_bottom_refs() {
        let stack = analyze("+");
        assert_eq!(stack.top_refs(), 1);
        assert_eq!(stack.bottom_refs(), 1);
        assert!(stack.top().is_empty());
        assert_eq!(rendered(&stack), vec!["b0 t0 +"]);
        assert_eq!(stack.height(), 0);
        assert_eq!(stack.depth_change(), -1);

        let stack = analyze("+ +");
        assert_eq!(stack.bottom_refs(), 2);
        assert_eq!(rendered(&stack), vec!["b1 b0 t0 + +"]);
        assert_eq!(stack.height(), -1);
    }

    #[test]
    fn test_origin_depth() {
        let program = parse("+").unwrap();
        let stack = SymbolicInterpreter::new(&program).origin_depth(2).run();
        assert_eq!(stack.bottom_refs(), 0);
        assert_eq!(rendered(&stack), vec!["t1 t0 +"]);

        let stack = SymbolicInterpreter::new(&program).origin_depth(0).run();
        assert_eq!(rendered(&stack), vec!["b1 b0 +"]);
    }

    #[test]
    fn test_rotation_keeps_refs_in_place() {
        let program = parse("rot").unwrap();
        let stack = SymbolicInterpreter::new(&program).origin_depth(3).run();
        assert_eq!(rendered(&stack), vec!["t1", "t0", "t2"]);
    }

    #[test]
    fn test_decided_branch_does_not_split() {
        let stack = analyze("0 bgtz 1 2 3");
        assert_eq!(rendered(&stack), vec!["2", "3"]);
        let stack = analyze("1 bgtz 1 2 3");
        assert_eq!(rendered(&stack), vec!["3"]);
        assert!(!stack.is_ragged());
    }

    #[test]
    fn test_symbolic_branch_merges_alternatives() {
        let stack = analyze("bgtz 4 2 1 bgtz 1 3");
        let top = stack.top_of_stack().unwrap();
        assert_eq!(top.len(), 2);
        assert!(top.contains(&SymExpr::Lit(Rational::int(2))));
        assert!(top.contains(&SymExpr::Lit(Rational::int(3))));
        assert_eq!(stack.len_lower_bound(), 1);
    }

    #[test]
    fn test_collatz_step_merges_both_arms() {
        let stack = analyze("dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +");
        let top = stack.top_of_stack().unwrap();
        assert_eq!(top.len(), 2);
        let rendered: Vec<String> = top.iter().map(|e| e.to_string()).collect();
        assert!(rendered.contains(&"t0 3 * 1 +".to_string()));
        assert!(rendered.contains(&"t0 2 /".to_string()));
        assert_eq!(stack.depth_change(), 0);
    }

    #[test]
    fn test_merge_of_different_heights() {
        let stack = analyze("dup bgtz 1 2");
        assert_eq!(rendered(&stack), vec!["t0", "2"]);
        assert!(stack.is_ragged());
        assert_eq!(stack.top_of_stack(), None);
        assert_eq!(stack.len_lower_bound(), 1);
    }

    #[test]
    fn test_merge_materializes_unread_refs() {
        // only the fall-through path reads t0 and b0
        let stack = analyze("len bgtz 1 +");
        assert_eq!(stack.top_refs(), 1);
        assert_eq!(stack.bottom_refs(), 1);
        assert_eq!(rendered(&stack), vec!["{b0, b0 t0 +}", "t0"]);
        assert!(stack.is_ragged());
        assert_eq!(stack.len_lower_bound(), 0);
    }

    #[test]
    fn test_merge_of_equal_heights() {
        let stack = analyze("dup bgtz 2 5 +");
        assert_eq!(rendered(&stack), vec!["{t0, t0 5 +}"]);
        assert!(!stack.is_ragged());
        assert_eq!(stack.len_lower_bound(), 1);
    }

    #[test]
    fn test_trace_reports_both_paths() {
        let program = parse("bgtz 1 1 2").unwrap();
        let mut ends = 0;
        evaluate_symbolic_traced(&program, |remaining, _| {
            if remaining.is_empty() {
                ends += 1;
            }
        });
        assert_eq!(ends, 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(analyze("1 2").to_string(), "[1, 2]");
        assert_eq!(analyze("+").to_string(), "[b0 t0 + | ]");
    }
}
