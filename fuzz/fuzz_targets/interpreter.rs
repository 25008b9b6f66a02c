#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Builtins and load from variables
#[derive(Arbitrary, Debug)]
enum SnekAtom {
    Add, Sub, Mul, Div,
    True, False,
    Greater, GreaterEq,
    Less, LessEq, Equal,

    List, Car, Cdr, Length, IsList,
    ListRef, Append,

    Identifier(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for SnekAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            SnekAtom::Add => "+",
            SnekAtom::Sub => "-",
            SnekAtom::Mul => "*",
            SnekAtom::Div => "/",
            SnekAtom::True => "#t",
            SnekAtom::False => "#f",
            SnekAtom::Greater => ">",
            SnekAtom::GreaterEq => ">=",
            SnekAtom::Less => "<",
            SnekAtom::LessEq => "<=",
            SnekAtom::Equal => "equal?",
            SnekAtom::List => "list",
            SnekAtom::Car => "car",
            SnekAtom::Cdr => "cdr",
            SnekAtom::Length => "length",
            SnekAtom::IsList => "list?",
            SnekAtom::ListRef => "list-ref",
            SnekAtom::Append => "append",
            SnekAtom::Identifier(identifier) => identifier.as_str(),
            SnekAtom::Integer(value) => return write!(f, "{}", value),
            SnekAtom::Float(value) => return write!(f, "{:?}", value),
        })
    }
}

#[derive(Arbitrary, Debug)]
enum SnekCommand {
    // Special forms and the builtins that control evaluation
    Lambda(Vec<SnekCommand>),
    Define(Vec<SnekCommand>),
    Del(Vec<SnekCommand>),
    If(Vec<SnekCommand>),
    And(Vec<SnekCommand>),
    Or(Vec<SnekCommand>),
    Not(Vec<SnekCommand>),
    Cons(Vec<SnekCommand>),
    Begin(Vec<SnekCommand>),
    Let(Vec<SnekCommand>),
    Set(Vec<SnekCommand>),
    Apply(Vec<SnekCommand>),

    Atom(SnekAtom),
}

fn stringify_arguments(values: &[SnekCommand]) -> String {
    values.iter()
        .map(SnekCommand::to_string)
        .join(" ")
}

impl fmt::Display for SnekCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (keyword, args) = match self {
            SnekCommand::Atom(atom) => return write!(f, "{}", atom),
            SnekCommand::Apply(args) => return write!(f, "({})", stringify_arguments(args)),
            SnekCommand::Lambda(args) => ("lambda", args),
            SnekCommand::Define(args) => ("define", args),
            SnekCommand::Del(args) => ("del", args),
            SnekCommand::If(args) => ("if", args),
            SnekCommand::And(args) => ("and", args),
            SnekCommand::Or(args) => ("or", args),
            SnekCommand::Not(args) => ("not", args),
            SnekCommand::Cons(args) => ("cons", args),
            SnekCommand::Begin(args) => ("begin", args),
            SnekCommand::Let(args) => ("let", args),
            SnekCommand::Set(args) => ("set!", args),
        };

        write!(f, "({} {})", keyword, stringify_arguments(args))
    }
}

fuzz_target!(|commands: Vec<SnekCommand>| {
    let config = snek::Config { max_depth: 128 };
    let mut context = snek::EvaluationContext::with_config(config);

    for command in commands {
        let _ = context.evaluate_str(&command.to_string());
    }
});
