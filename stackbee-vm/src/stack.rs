//! # stackbee Stack
//!
//! A LIFO stack of rationals for concrete execution.
//!
//! Underflow is never an error here: reading past the bottom yields `0`,
//! so every op can run on any stack.

use crate::rational::Rational;
use serde::{Deserialize, Serialize};

/// stackbee Stack - holds exact rationals, bottom first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    data: Vec<Rational>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Stack {
            data: Vec::with_capacity(32),
        }
    }

    /// Create a stack holding `values`, the last one on top
    pub fn from_values(values: impl IntoIterator<Item = Rational>) -> Self {
        Stack {
            data: values.into_iter().collect(),
        }
    }

    /// Current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Rational) {
        self.data.push(value);
    }

    /// Pop a value from the stack, or `0` when it is empty
    pub fn pop(&mut self) -> Rational {
        self.data.pop().unwrap_or_default()
    }

    /// Duplicate the top value; an empty stack becomes `[0, 0]`
    pub fn dup(&mut self) {
        let value = self.pop();
        self.push(value);
        self.push(value);
    }

    /// Swap the top two values, `[.., y, x] -> [.., x, y]`.
    ///
    /// `[x]` becomes `[x, 0]`: the missing operand is materialized, never dropped.
    pub fn swap(&mut self) {
        let x = self.pop();
        let y = self.pop();
        self.push(x);
        self.push(y);
    }

    /// Bring the third value to the top, `[a, b, c] -> [b, c, a]`
    pub fn rot(&mut self) {
        let c = self.pop();
        let b = self.pop();
        let a = self.pop();
        self.push(b);
        self.push(c);
        self.push(a);
    }

    /// Inverse of `rot`, `[a, b, c] -> [c, a, b]`
    pub fn unrot(&mut self) {
        let c = self.pop();
        let b = self.pop();
        let a = self.pop();
        self.push(c);
        self.push(a);
        self.push(b);
    }

    /// Get iterator over values (bottom to top)
    pub fn iter(&self) -> impl Iterator<Item = &Rational> {
        self.data.iter()
    }

    /// Get all values as a slice (bottom to top)
    pub fn as_slice(&self) -> &[Rational] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<Rational> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(values: &[i64]) -> Stack {
        Stack::from_values(values.iter().map(|&v| Rational::int(v)))
    }

    fn values(stack: &Stack) -> Vec<i64> {
        stack.iter().map(|v| v.numer()).collect()
    }

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(Rational::int(1));
        stack.push(Rational::new(1, 2));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Rational::new(1, 2));
        assert_eq!(stack.pop(), Rational::int(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_empty_defaults_to_zero() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Rational::ZERO);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_dup() {
        let mut s = stack(&[42]);
        s.dup();
        assert_eq!(values(&s), vec![42, 42]);

        let mut empty = Stack::new();
        empty.dup();
        assert_eq!(values(&empty), vec![0, 0]);
    }

    #[test]
    fn test_swap() {
        let mut s = stack(&[1, 2]);
        s.swap();
        assert_eq!(values(&s), vec![2, 1]);

        let mut one = stack(&[1]);
        one.swap();
        assert_eq!(values(&one), vec![1, 0]);
    }

    #[test]
    fn test_rot() {
        let mut s = stack(&[1, 2, 3]);
        s.rot();
        assert_eq!(values(&s), vec![2, 3, 1]);
    }

    #[test]
    fn test_unrot() {
        let mut s = stack(&[1, 2, 3]);
        s.unrot();
        assert_eq!(values(&s), vec![3, 1, 2]);
        s.rot();
        assert_eq!(values(&s), vec![1, 2, 3]);
    }

    #[test]
    fn test_rot_underflow() {
        let mut s = stack(&[7]);
        s.rot();
        assert_eq!(values(&s), vec![0, 7, 0]);
    }
}
