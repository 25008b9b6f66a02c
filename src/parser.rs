use core::fmt;
use std::rc::Rc;

use itertools::Itertools;
use logos::Logos;

use crate::error::SnekError;

/// Deepest parenthesis nesting the parser accepts before giving up
pub const MAX_PARSE_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"(\s+|;[^\n]*)")]
pub enum Token<'a> {
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[regex(r"[^\s();]+", |lex| lex.slice())]
    Atom(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::Atom(text) => text,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Identifier(Rc<str>),
}

// Sexps are the basic building blocks of snek. Sub-expressions are reference
// counted so that a closure can hold on to its body after the tree is dropped
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Atom(Literal),
    Expression(Rc<[Sexp]>),
}

impl Sexp {
    pub fn identifier(name: &str) -> Self {
        Self::Atom(Literal::Identifier(Rc::from(name)))
    }

    pub fn expression(elements: Vec<Sexp>) -> Self {
        Self::Expression(Rc::from(elements))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(true) => f.write_str("#t"),
            Self::Boolean(false) => f.write_str("#f"),
            Self::Identifier(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(literal) => write!(f, "{}", literal),
            Self::Expression(elements) => write!(f, "({})", elements.iter().join(" ")),
        }
    }
}

type ParseResult<O> = Result<O, SnekError>;

/// Splits source text into parenthesis and atom tokens. Comments run from `;`
/// to the end of the line.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    // Every character is either skipped or belongs to a token class, so the
    // lexer never reports an error here
    Token::lexer(input).flatten().collect()
}

fn parse_literal(text: &str) -> Literal {
    if let Ok(integer) = text.parse() {
        return Literal::Integer(integer);
    }
    if let Ok(float) = text.parse() {
        return Literal::Float(float);
    }

    match text {
        "#t" => Literal::Boolean(true),
        "#f" => Literal::Boolean(false),
        identifier => Literal::Identifier(Rc::from(identifier)),
    }
}

fn find_group_end(tokens: &[Token<'_>], start: usize) -> ParseResult<usize> {
    // Scan forward from the opening parenthesis at `start` until the number of
    // closes catches up with the number of opens
    let mut open = 0usize;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token {
            Token::LeftParen => open += 1,
            Token::RightParen => {
                open -= 1;
                if open == 0 { return Ok(start + offset); }
            }
            Token::Atom(_) => {}
        }
    }

    Err(SnekError::syntax("unbalanced parenthesis"))
}

fn parse_group(tokens: &[Token<'_>], depth: usize) -> ParseResult<Sexp> {
    if depth > MAX_PARSE_DEPTH {
        return Err(SnekError::syntax(format!("expression nested deeper than {} levels", MAX_PARSE_DEPTH)));
    }

    let mut elements = vec![];
    let mut position = 0;

    while position < tokens.len() {
        match tokens[position] {
            Token::Atom(text) => {
                elements.push(Sexp::Atom(parse_literal(text)));
                position += 1;
            }
            Token::LeftParen => {
                let end = find_group_end(tokens, position)?;
                elements.push(parse_group(&tokens[position + 1..end], depth + 1)?);
                position = end + 1;
            }
            Token::RightParen => return Err(SnekError::syntax("unexpected ')'")),
        }
    }

    Ok(Sexp::expression(elements))
}

/// Parses a token sequence holding exactly one top-level form
pub fn parse(tokens: &[Token<'_>]) -> ParseResult<Sexp> {
    match tokens {
        [] => Err(SnekError::syntax("expected an expression")),
        [Token::Atom(text)] => Ok(Sexp::Atom(parse_literal(text))),
        [paren] => Err(SnekError::syntax(format!("unexpected '{}'", paren))),
        [Token::LeftParen, inner @ .., Token::RightParen] => parse_group(inner, 1),
        _ => Err(SnekError::syntax("expression must be enclosed in parentheses")),
    }
}

pub fn parse_str(input: &str) -> ParseResult<Sexp> {
    parse(&tokenize(input))
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::{error::ErrorKind, test_utils::{all_testcases, load_test_pair, TestOutput}};

    use super::*;

    fn token_strings(input: &str) -> Vec<&str> {
        tokenize(input).iter().map(Token::as_str).collect()
    }

    #[test]
    fn tokenize_isolates_parens() {
        assert_eq!(token_strings("(+ 1 2)"), vec!["(", "+", "1", "2", ")"]);
        assert_eq!(token_strings("((lambda(x)x)3)"), vec!["(", "(", "lambda", "(", "x", ")", "x", ")", "3", ")"]);
    }

    #[test]
    fn tokenize_strips_comments() {
        assert_eq!(token_strings("1 ; comment"), vec!["1"]);
        assert_eq!(token_strings("(define x ; the name\n  7) ; trailing"), vec!["(", "define", "x", "7", ")"]);
        assert_eq!(token_strings("foo;bar"), vec!["foo"]);
    }

    #[test]
    fn tokenize_keeps_order_across_lines() {
        assert_eq!(token_strings("(a\n\tb\r\n c)"), vec!["(", "a", "b", "c", ")"]);
        assert!(tokenize("   ; nothing here").is_empty());
    }

    #[test]
    fn parse_flat_form() {
        let tokens = tokenize("(+ 1 2)");
        let expected = Sexp::expression(vec![
            Sexp::identifier("+"),
            Sexp::Atom(Literal::Integer(1)),
            Sexp::Atom(Literal::Integer(2)),
        ]);
        assert_eq!(parse(&tokens).unwrap(), expected);
    }

    #[test]
    fn parse_atoms() {
        assert_eq!(parse_str("42").unwrap(), Sexp::Atom(Literal::Integer(42)));
        assert_eq!(parse_str("-3.5").unwrap(), Sexp::Atom(Literal::Float(-3.5)));
        assert_eq!(parse_str("#t").unwrap(), Sexp::Atom(Literal::Boolean(true)));
        assert_eq!(parse_str("#f").unwrap(), Sexp::Atom(Literal::Boolean(false)));
        assert_eq!(parse_str("list-ref").unwrap(), Sexp::identifier("list-ref"));
        assert_eq!(parse_str("-").unwrap(), Sexp::identifier("-"));
    }

    #[test]
    fn parse_nested_forms() {
        let sexp = parse_str("(define (square x) (* x x))").unwrap();
        assert_eq!(sexp.to_string(), "(define (square x) (* x x))");

        let empty = parse_str("()").unwrap();
        assert_eq!(empty, Sexp::expression(vec![]));

        let deep = parse_str("(((1) 2) (3 (4)))").unwrap();
        assert_eq!(deep.to_string(), "(((1) 2) (3 (4)))");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for source in ["(", ")", "", "(1))", "((1)", "(1) (2)", "1 2", ")(", "(()"] {
            let result = parse_str(source);
            assert!(
                matches!(result, Err(SnekError::Syntax(_))),
                "{:?} should be a syntax error, got {:?}", source, result
            );
        }
    }

    #[test]
    fn parse_rejects_excessive_nesting() {
        let source = format!("{}1{}", "(".repeat(MAX_PARSE_DEPTH + 1), ")".repeat(MAX_PARSE_DEPTH + 1));
        assert!(matches!(parse_str(&source), Err(SnekError::Syntax(_))));

        let source = format!("{}1{}", "(".repeat(MAX_PARSE_DEPTH), ")".repeat(MAX_PARSE_DEPTH));
        assert!(parse_str(&source).is_ok());
    }

    fn assert_can_parse(testcase: (usize, usize), input: &str, expected_result: Result<TestOutput, ErrorKind>) -> anyhow::Result<()> {
        let parse_result = parse_str(input);
        match (parse_result, expected_result) {
            (Ok(result), Err(expected @ ErrorKind::Syntax)) => bail!("Testcase {}:{} - Expected {:?} but got {:?}", testcase.0, testcase.1, expected, result),
            (Err(result), Ok(expected)) => bail!("Testcase {}:{} - Expected {:?} but got {:?}", testcase.0, testcase.1, expected, result),
            (Err(result), Err(expected)) if expected != ErrorKind::Syntax
                => bail!("Testcase {}:{} - Expected {:?} but got {:?}", testcase.0, testcase.1, expected, result),
            _ => Ok(())
        }
    }

    #[test]
    fn parse_testcases() -> anyhow::Result<()> {
        for testcase in all_testcases() {
            println!("Running testcase {}", testcase);
            let entries = load_test_pair(testcase)?;

            for (lineno, (input, expected)) in entries.into_iter().enumerate() {
                assert_can_parse((testcase, lineno), &input, expected.into())?;
            }
        }

        Ok(())
    }
}
