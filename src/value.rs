use core::fmt;
use std::rc::Rc;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    builtin::{ArithmeticOp, ComparisonOp, GenericOp, LogicalOp, StructuralOp},
    frame::Frame,
    parser::Sexp,
    stack::with_stack,
};

/// A cons cell. Pairs are immutable once built and may be shared between
/// any number of lists.
pub struct Pair {
    pub first: Value,
    pub rest: Value,
}

impl Pair {
    pub fn new(first: Value, rest: Value) -> Rc<Self> {
        Rc::new(Self { first, rest })
    }
}

impl Pair {
    fn take_children(&mut self, pending: &mut Vec<Rc<Pair>>) {
        for slot in [&mut self.first, &mut self.rest] {
            if let Value::Pair(pair) = std::mem::replace(slot, Value::Nil) {
                pending.push(pair);
            }
        }
    }
}

impl Drop for Pair {
    fn drop(&mut self) {
        // Uniquely owned pairs below this one are unlinked onto a work list,
        // so neither long lists nor deeply nested ones recurse on drop
        let mut pending = vec![];
        self.take_children(&mut pending);
        while let Some(pair) = pending.pop() {
            if let Ok(mut pair) = Rc::try_unwrap(pair) {
                pair.take_children(&mut pending);
            }
        }
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} . {})", self.first, self.rest)
    }
}

pub struct Closure {
    pub(crate) parameters: Vec<Rc<str>>,
    pub(crate) body: Sexp,
    pub(crate) environment: Rc<Frame>,
}

impl Closure {
    pub fn parameters(&self) -> &[Rc<str>] {
        &self.parameters
    }

    pub fn body(&self) -> &Sexp {
        &self.body
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured frame is left out, it can reach this closure again
        f.debug_struct("Closure")
            .field("parameters", &self.parameters)
            .field("body", &self.body.to_string())
            .finish()
    }
}

/// Everything that can sit in operator position. Each kind carries its own
/// calling convention, see `interpreter::apply`.
#[derive(Debug, Clone)]
pub enum Procedure {
    Closure(Rc<Closure>),
    Arithmetic(ArithmeticOp),
    Comparison(ComparisonOp),
    Conditional,
    Logical(LogicalOp),
    Structural(StructuralOp),
    Generic(GenericOp),
}

impl Procedure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closure(_) => "lambda",
            Self::Arithmetic(op) => op.symbol(),
            Self::Comparison(op) => op.symbol(),
            Self::Conditional => "if",
            Self::Logical(op) => op.symbol(),
            Self::Structural(op) => op.symbol(),
            Self::Generic(op) => op.symbol(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Closure(_))
    }

    pub(crate) fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (Self::Arithmetic(a), Self::Arithmetic(b)) => a == b,
            (Self::Comparison(a), Self::Comparison(b)) => a == b,
            (Self::Conditional, Self::Conditional) => true,
            (Self::Logical(a), Self::Logical(b)) => a == b,
            (Self::Structural(a), Self::Structural(b)) => a == b,
            (Self::Generic(a), Self::Generic(b)) => a == b,
            _ => false,
        }
    }
}

// Runtime value produced by evaluating an expression
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Nil,
    Pair(Rc<Pair>),
    Procedure(Procedure),
}

impl Value {
    pub fn cons(first: Value, rest: Value) -> Self {
        Self::Pair(Pair::new(first, rest))
    }

    /// Builds a proper list holding `values` in order
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        values.into_iter()
            .rev()
            .fold(Self::Nil, |rest, first| Self::cons(first, rest))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Nil => "empty list",
            Self::Pair(_) => "pair",
            Self::Procedure(_) => "procedure",
        }
    }

    pub fn as_pair(&self) -> Option<&Rc<Pair>> {
        match self {
            Self::Pair(pair) => Some(pair),
            _ => None,
        }
    }

    /// Walks the `rest` chain starting at this value
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { current: self }
    }

    /// True for `nil` and for pairs whose tail chain ends in `nil`
    pub fn is_list(&self) -> bool {
        let mut iter = self.iter();
        for _ in iter.by_ref() {}
        matches!(iter.remainder(), Self::Nil)
    }
}

pub struct ListIter<'a> {
    current: &'a Value,
}

impl<'a> ListIter<'a> {
    /// What remains once the pairs run out, `nil` for a proper list
    pub fn remainder(&self) -> &'a Value {
        self.current
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current {
            Value::Pair(pair) => {
                self.current = &pair.rest;
                Some(&pair.first)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_stack(|| match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(true) => f.write_str("#t"),
            Self::Boolean(false) => f.write_str("#f"),
            Self::Nil => f.write_str("()"),
            Self::Pair(_) => {
                let mut iter = self.iter();
                let elements = iter.by_ref().join(" ");
                match iter.remainder() {
                    Self::Nil => write!(f, "({})", elements),
                    tail => write!(f, "({} . {})", elements, tail),
                }
            }
            Self::Procedure(procedure) if procedure.is_builtin() => write!(f, "<builtin {}>", procedure.name()),
            Self::Procedure(_) => f.write_str("<procedure>"),
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An owned snapshot of a [Value] that can leave the interpreter. Proper lists
/// flatten into [SnekValue::List], lists with a non-`nil` tail into nested
/// [SnekValue::Pair]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnekValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<SnekValue>),
    Pair { first: Box<SnekValue>, rest: Box<SnekValue> },
    Procedure(String),
}

impl SnekValue {
    fn take_children(&mut self) -> Vec<SnekValue> {
        match self {
            Self::List(list) => std::mem::take(list),
            Self::Pair { first, rest } => vec![
                std::mem::replace(&mut **first, Self::List(vec![])),
                std::mem::replace(&mut **rest, Self::List(vec![])),
            ],
            _ => vec![],
        }
    }
}

impl Drop for SnekValue {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut value) = pending.pop() {
            pending.append(&mut value.take_children());
        }
    }
}

impl fmt::Display for SnekValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_stack(|| match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(true) => f.write_str("#t"),
            Self::Boolean(false) => f.write_str("#f"),
            Self::List(list) => write!(f, "({})", list.iter().join(" ")),
            Self::Pair { first, rest } => write!(f, "({} . {})", first, rest),
            Self::Procedure(name) => f.write_str(name),
        })
    }
}

impl From<&Value> for SnekValue {
    fn from(value: &Value) -> Self {
        with_stack(|| match value {
            Value::Integer(value) => Self::Integer(*value),
            Value::Float(value) => Self::Float(*value),
            Value::Boolean(value) => Self::Boolean(*value),
            Value::Procedure(_) => Self::Procedure(value.to_string()),
            Value::Nil => Self::List(vec![]),
            Value::Pair(_) if value.is_list() => Self::List(value.iter().map(Self::from).collect()),
            Value::Pair(pair) => Self::Pair {
                first: Box::new((&pair.first).into()),
                rest: Box::new((&pair.rest).into()),
            },
        })
    }
}

impl From<Value> for SnekValue {
    fn from(value: Value) -> Self {
        (&value).into()
    }
}
