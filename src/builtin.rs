use std::{collections::HashMap, rc::Rc};

use crate::{error::SnekError, frame::Frame, value::{Procedure, Value}};

pub(crate) type EvaluationResult = Result<Value, SnekError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// List builtins with a fixed operand count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralOp {
    Cons,
    ListRef,
    Car,
    Cdr,
    IsList,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericOp {
    List,
    Append,
    Begin,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    pub(crate) fn apply(&self, values: Vec<Value>) -> EvaluationResult {
        match self {
            Self::Add => builtin_add(values),
            Self::Sub => builtin_sub(values),
            Self::Mul => builtin_mul(values),
            Self::Div => builtin_div(values),
        }
    }
}

impl ComparisonOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "equal?" => Some(Self::Equal),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEqual),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "equal?",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }

    fn test(&self, a: &Value, b: &Value) -> Result<bool, SnekError> {
        if let Self::Equal = self {
            return Ok(values_equal(a, b));
        }

        let ordering = match (a, b) {
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            _ => as_float(self.symbol(), a)?.partial_cmp(&as_float(self.symbol(), b)?),
        };
        // NaN compares false against everything
        let Some(ordering) = ordering else { return Ok(false) };

        Ok(match self {
            Self::Less => ordering.is_lt(),
            Self::LessEqual => ordering.is_le(),
            Self::Greater => ordering.is_gt(),
            Self::GreaterEqual => ordering.is_ge(),
            Self::Equal => unreachable!("Handled separately at the start"),
        })
    }

    /// Chained comparison over already evaluated operands, stopping at the
    /// first pair that fails
    pub(crate) fn compare(&self, values: &[Value]) -> Result<bool, SnekError> {
        for window in values.windows(2) {
            if !self.test(&window[0], &window[1])? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

impl StructuralOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Cons => "cons",
            Self::ListRef => "list-ref",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::IsList => "list?",
            Self::Length => "length",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Cons | Self::ListRef => 2,
            Self::Car | Self::Cdr | Self::IsList | Self::Length => 1,
        }
    }

    pub(crate) fn apply(&self, values: Vec<Value>) -> EvaluationResult {
        let [first, rest @ ..] = values.as_slice() else {
            return Err(SnekError::arity(self.symbol(), self.arity(), 0));
        };
        if values.len() != self.arity() {
            return Err(SnekError::arity(self.symbol(), self.arity(), values.len()));
        }

        match self {
            Self::Cons => Ok(Value::cons(first.clone(), rest[0].clone())),
            Self::ListRef => builtin_list_ref(first, &rest[0]),
            Self::Car => builtin_car(first),
            Self::Cdr => builtin_cdr(first),
            Self::IsList => Ok(Value::Boolean(first.is_list())),
            Self::Length => list_length(first).map(Value::from),
        }
    }
}

impl GenericOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Append => "append",
            Self::Begin => "begin",
        }
    }

    pub(crate) fn apply(&self, values: Vec<Value>) -> EvaluationResult {
        match self {
            Self::List => Ok(Value::list(values)),
            Self::Append => builtin_append(values),
            Self::Begin => values.into_iter()
                .last()
                .ok_or_else(|| SnekError::evaluation("'begin' needs at least one expression")),
        }
    }
}

fn type_error(name: &str, expected: &str, got: &Value) -> SnekError {
    SnekError::evaluation(format!("'{}' expected {}, got {} {}", name, expected, got.type_name(), got))
}

fn as_float(name: &str, value: &Value) -> Result<f64, SnekError> {
    match value {
        Value::Integer(value) => Ok(*value as f64),
        Value::Float(value) => Ok(*value),
        other => Err(type_error(name, "a number", other)),
    }
}

fn combine(
    op: ArithmeticOp,
    a: Value,
    b: &Value,
    integer_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvaluationResult {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(a, *b)
            .map(Value::Integer)
            .ok_or_else(|| SnekError::evaluation(format!("integer overflow in '{}'", op.symbol()))),
        (a, b) => Ok(Value::Float(float_op(as_float(op.symbol(), &a)?, as_float(op.symbol(), b)?))),
    }
}

fn fold_numbers(
    op: ArithmeticOp,
    init: Value,
    values: &[Value],
    integer_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvaluationResult {
    // Check the initial value too, so a lone non-number is still rejected
    as_float(op.symbol(), &init)?;
    values.iter().try_fold(init, |acc, value| combine(op, acc, value, integer_op, float_op))
}

fn builtin_add(values: Vec<Value>) -> EvaluationResult {
    fold_numbers(ArithmeticOp::Add, Value::Integer(0), &values, i64::checked_add, |a, b| a + b)
}

fn builtin_sub(values: Vec<Value>) -> EvaluationResult {
    match values.as_slice() {
        [] => Err(SnekError::evaluation("'-' needs at least one operand")),
        [Value::Integer(value)] => value.checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| SnekError::evaluation("integer overflow in '-'")),
        [value] => Ok(Value::Float(-as_float("-", value)?)),
        [first, rest @ ..] => fold_numbers(ArithmeticOp::Sub, first.clone(), rest, i64::checked_sub, |a, b| a - b),
    }
}

fn builtin_mul(values: Vec<Value>) -> EvaluationResult {
    fold_numbers(ArithmeticOp::Mul, Value::Integer(1), &values, i64::checked_mul, |a, b| a * b)
}

fn builtin_div(values: Vec<Value>) -> EvaluationResult {
    match values.as_slice() {
        [] => Err(SnekError::evaluation("'/' needs at least one operand")),
        [value] => as_float("/", value).map(|_| value.clone()),
        [first, rest @ ..] => {
            // Divide one operand at a time, a product of tiny divisors could
            // underflow to zero
            rest.iter().try_fold(as_float("/", first)?, |acc, value| {
                let divisor = as_float("/", value)?;
                if divisor == 0.0 {
                    return Err(SnekError::evaluation("division by zero"));
                }
                Ok(acc / divisor)
            }).map(Value::Float)
        }
    }
}

fn atoms_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            as_float("equal?", a).ok() == as_float("equal?", b).ok()
        }
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Nil, Value::Nil) => true,
        (Value::Procedure(x), Value::Procedure(y)) => x.same(y),
        _ => false,
    }
}

/// Structural equality used by `equal?`. Numbers compare by value across
/// integer and float, procedures by identity.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    // Pairs still to compare, so nesting on either side never recurses
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        match (a, b) {
            (Value::Pair(x), Value::Pair(y)) => {
                if !Rc::ptr_eq(x, y) {
                    pending.push((&x.rest, &y.rest));
                    pending.push((&x.first, &y.first));
                }
            }
            _ if !atoms_equal(a, b) => return false,
            _ => {}
        }
    }
    true
}

fn builtin_car(value: &Value) -> EvaluationResult {
    match value {
        Value::Pair(pair) => Ok(pair.first.clone()),
        other => Err(type_error("car", "a pair", other)),
    }
}

fn builtin_cdr(value: &Value) -> EvaluationResult {
    match value {
        Value::Pair(pair) => Ok(pair.rest.clone()),
        other => Err(type_error("cdr", "a pair", other)),
    }
}

pub(crate) fn list_length(value: &Value) -> Result<i64, SnekError> {
    if !value.is_list() {
        return Err(type_error("length", "a list", value));
    }
    Ok(value.iter().count() as i64)
}

fn builtin_list_ref(list: &Value, index: &Value) -> EvaluationResult {
    // The head of any pair is reachable at index 0, even when the pair does
    // not start a proper list
    if let (Value::Pair(pair), Value::Integer(0)) = (list, index) {
        return Ok(pair.first.clone());
    }

    if !list.is_list() {
        return Err(type_error("list-ref", "a list", list));
    }
    let index = match index {
        Value::Integer(index) if *index >= 0 => *index,
        other => return Err(type_error("list-ref", "a non-negative integer index", other)),
    };

    let length = list_length(list)?;
    if index >= length {
        return Err(SnekError::evaluation(format!("index {} out of range for list of length {}", index, length)));
    }

    list.iter()
        .nth(index as usize)
        .cloned()
        .ok_or_else(|| SnekError::evaluation("index out of range"))
}

fn builtin_append(values: Vec<Value>) -> EvaluationResult {
    // Every pair of the result is freshly allocated, the inputs are never
    // shared with it
    let mut elements = Vec::new();
    for list in &values {
        if !list.is_list() {
            return Err(type_error("append", "a list", list));
        }
        elements.extend(list.iter().cloned());
    }
    Ok(Value::list(elements))
}

fn builtin(procedure: Procedure) -> (Rc<str>, Value) {
    (Rc::from(procedure.name()), Value::Procedure(procedure))
}

/// Creates the sealed frame holding every builtin procedure. Each
/// interpreter builds it once and parents all of its top-level frames to it.
pub fn builtin_frame() -> Rc<Frame> {
    Frame::root(HashMap::from([
        builtin(Procedure::Arithmetic(ArithmeticOp::Add)),
        builtin(Procedure::Arithmetic(ArithmeticOp::Sub)),
        builtin(Procedure::Arithmetic(ArithmeticOp::Mul)),
        builtin(Procedure::Arithmetic(ArithmeticOp::Div)),

        builtin(Procedure::Comparison(ComparisonOp::Equal)),
        builtin(Procedure::Comparison(ComparisonOp::Less)),
        builtin(Procedure::Comparison(ComparisonOp::LessEqual)),
        builtin(Procedure::Comparison(ComparisonOp::Greater)),
        builtin(Procedure::Comparison(ComparisonOp::GreaterEqual)),

        builtin(Procedure::Conditional),
        builtin(Procedure::Logical(LogicalOp::And)),
        builtin(Procedure::Logical(LogicalOp::Or)),
        builtin(Procedure::Logical(LogicalOp::Not)),

        builtin(Procedure::Structural(StructuralOp::Cons)),
        builtin(Procedure::Structural(StructuralOp::ListRef)),
        builtin(Procedure::Structural(StructuralOp::Car)),
        builtin(Procedure::Structural(StructuralOp::Cdr)),
        builtin(Procedure::Structural(StructuralOp::IsList)),
        builtin(Procedure::Structural(StructuralOp::Length)),

        builtin(Procedure::Generic(GenericOp::List)),
        builtin(Procedure::Generic(GenericOp::Append)),
        builtin(Procedure::Generic(GenericOp::Begin)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Integer).collect()
    }

    fn list(values: &[i64]) -> Value {
        Value::list(ints(values))
    }

    #[test]
    fn arithmetic_keeps_integers_exact() {
        assert!(matches!(builtin_add(ints(&[1, 2, 3])), Ok(Value::Integer(6))));
        assert!(matches!(builtin_add(vec![]), Ok(Value::Integer(0))));
        assert!(matches!(builtin_mul(vec![]), Ok(Value::Integer(1))));
        assert!(matches!(builtin_sub(ints(&[10, 4, 3])), Ok(Value::Integer(3))));
        assert!(matches!(builtin_sub(ints(&[5])), Ok(Value::Integer(-5))));
        assert!(matches!(builtin_mul(ints(&[2, 3, 4])), Ok(Value::Integer(24))));
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        assert!(matches!(builtin_add(vec![Value::Integer(1), Value::Float(0.5)]), Ok(Value::Float(x)) if x == 1.5));
        assert!(matches!(builtin_div(ints(&[9, 2])), Ok(Value::Float(x)) if x == 4.5));
        assert!(matches!(builtin_div(ints(&[8, 2, 2])), Ok(Value::Float(x)) if x == 2.0));
        assert!(matches!(builtin_div(ints(&[7])), Ok(Value::Integer(7))));
    }

    #[test]
    fn division_checks_each_divisor() {
        let tiny = vec![Value::Float(1e-300), Value::Float(1e-200), Value::Float(1e-200)];
        assert!(matches!(builtin_div(tiny), Ok(Value::Float(x)) if (x / 1e100 - 1.0).abs() < 1e-9));
        assert!(matches!(builtin_div(ints(&[1, 2, 0])), Err(SnekError::Evaluation(_))));
    }

    #[test]
    fn arithmetic_errors() {
        assert!(matches!(builtin_div(ints(&[1, 0])), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_div(vec![]), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_sub(vec![]), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_add(vec![Value::Integer(1), Value::Boolean(true)]), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_add(vec![Value::Nil]), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_add(ints(&[i64::MAX, 1])), Err(SnekError::Evaluation(_))));
    }

    #[test]
    fn comparison_chains() {
        assert!(ComparisonOp::Less.compare(&ints(&[1, 2, 3])).unwrap());
        assert!(!ComparisonOp::Less.compare(&ints(&[1, 3, 2])).unwrap());
        assert!(ComparisonOp::GreaterEqual.compare(&ints(&[5, 5, 4])).unwrap());
        assert!(ComparisonOp::Greater.compare(&[]).unwrap());
        assert!(ComparisonOp::Greater.compare(&ints(&[1])).unwrap());
        assert!(ComparisonOp::Equal.compare(&[Value::Integer(2), Value::Float(2.0)]).unwrap());
        assert!(ComparisonOp::Less.compare(&[Value::Integer(1), Value::Boolean(true)]).is_err());
        // Stops before reaching the ill-typed operand
        assert!(!ComparisonOp::Less.compare(&[Value::Integer(2), Value::Integer(1), Value::Nil]).unwrap());
    }

    #[test]
    fn equality_is_structural_for_lists() {
        assert!(values_equal(&list(&[1, 2]), &list(&[1, 2])));
        assert!(!values_equal(&list(&[1, 2]), &list(&[1, 2, 3])));
        assert!(values_equal(&Value::Nil, &Value::Nil));
        assert!(!values_equal(&Value::Nil, &Value::Boolean(false)));
    }

    #[test]
    fn equality_handles_deep_nesting() {
        // Nested through `first`, so each level is one deeper on the car side
        let nest = |depth: usize| (0..depth).fold(Value::Integer(0), |inner, _| Value::cons(inner, Value::Nil));
        let a = nest(200_000);
        let b = nest(200_000);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &nest(199_999)));
        drop(a);
        drop(b);
    }

    #[test]
    fn structural_ops_check_arity() {
        assert!(StructuralOp::Car.apply(vec![]).is_err());
        assert!(StructuralOp::Cons.apply(ints(&[1])).is_err());
        assert!(StructuralOp::Car.apply(vec![list(&[1]), list(&[2])]).is_err());
        assert!(matches!(StructuralOp::Car.apply(vec![list(&[4, 5])]), Ok(Value::Integer(4))));
    }

    #[test]
    fn car_of_empty_list_fails() {
        assert!(matches!(builtin_car(&Value::Nil), Err(SnekError::Evaluation(_))));
        assert!(matches!(builtin_cdr(&Value::Integer(1)), Err(SnekError::Evaluation(_))));
    }

    #[test]
    fn length_requires_proper_list() {
        assert_eq!(list_length(&list(&[1, 2, 3])).unwrap(), 3);
        assert_eq!(list_length(&Value::Nil).unwrap(), 0);
        assert!(list_length(&Value::cons(Value::Integer(1), Value::Integer(2))).is_err());
    }

    #[test]
    fn list_ref_edge_cases() {
        let dotted = Value::cons(Value::Integer(7), Value::Integer(8));
        assert!(matches!(builtin_list_ref(&dotted, &Value::Integer(0)), Ok(Value::Integer(7))));
        assert!(builtin_list_ref(&dotted, &Value::Integer(1)).is_err());

        let numbers = list(&[10, 20, 30]);
        assert!(matches!(builtin_list_ref(&numbers, &Value::Integer(2)), Ok(Value::Integer(30))));
        assert!(builtin_list_ref(&numbers, &Value::Integer(3)).is_err());
        assert!(builtin_list_ref(&numbers, &Value::Integer(-1)).is_err());
        assert!(builtin_list_ref(&numbers, &Value::Float(1.0)).is_err());
        assert!(builtin_list_ref(&Value::Nil, &Value::Integer(0)).is_err());
    }

    #[test]
    fn append_copies_every_pair() {
        let a = list(&[1, 2]);
        let b = list(&[3, 4]);
        let appended = builtin_append(vec![a.clone(), Value::Nil, b.clone()]).unwrap();
        assert_eq!(appended.to_string(), "(1 2 3 4)");

        let b_head = b.as_pair().unwrap();
        let mut current = &appended;
        while let Value::Pair(pair) = current {
            assert!(!Rc::ptr_eq(pair, b_head));
            assert!(!Rc::ptr_eq(pair, a.as_pair().unwrap()));
            current = &pair.rest;
        }

        assert!(matches!(builtin_append(vec![]), Ok(Value::Nil)));
        assert!(builtin_append(vec![a, Value::Integer(2)]).is_err());
    }

    #[test]
    fn builtin_frame_binds_every_procedure() {
        let frame = builtin_frame();
        for name in ["+", "-", "*", "/", "equal?", "<", "<=", ">", ">=", "if", "and", "or", "not",
                     "cons", "list-ref", "car", "cdr", "list?", "length", "list", "append", "begin"] {
            assert!(matches!(frame.lookup(name), Ok(Value::Procedure(_))), "missing builtin {}", name);
        }
        assert!(frame.lookup("lambda").is_err());
    }
}
