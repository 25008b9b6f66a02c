//! Helpers for running whole source files: comment stripping, splitting text
//! into top-level forms, and evaluating them in order.

use std::{path::Path, rc::Rc};

use anyhow::Context;
use itertools::Itertools;
use log::debug;
use logos::Logos;

use crate::{context::Interpreter, error::SnekError, frame::Frame, parser::Token, value::Value};

/// Removes `;` comments, keeping line breaks so line structure survives
pub fn strip_comments(source: &str) -> String {
    source.lines()
        .map(|line| line.split_once(';').map_or(line, |(code, _)| code))
        .join("\n")
}

/// Splits source text into its top-level forms. Each balanced parenthesis
/// group and each bare atom outside of any group becomes one form. A stray
/// `)` or an unclosed group is kept as its own form so that parsing it reports
/// the syntax error.
pub fn split_forms(source: &str) -> Vec<String> {
    let mut forms = vec![];
    let mut open = 0usize;
    let mut start = 0;

    // Every character lexes to something, see `parser::tokenize`
    for (token, span) in Token::lexer(source).spanned() {
        let Ok(token) = token else { continue };
        match token {
            Token::LeftParen => {
                if open == 0 { start = span.start; }
                open += 1;
            }
            Token::RightParen if open == 0 => forms.push(source[span].to_owned()),
            Token::RightParen => {
                open -= 1;
                if open == 0 { forms.push(source[start..span.end].to_owned()); }
            }
            Token::Atom(text) if open == 0 => forms.push(text.to_owned()),
            Token::Atom(_) => {}
        }
    }

    if open > 0 {
        forms.push(source[start..].to_owned());
    }

    forms
}

/// Evaluates every top-level form of `source` against `frame`, halting at the
/// first error
pub fn evaluate_source(interpreter: &Interpreter, source: &str, frame: &Rc<Frame>) -> Result<Value, SnekError> {
    let forms = split_forms(&strip_comments(source));
    debug!("evaluating {} top-level form(s)", forms.len());
    interpreter.evaluate_sequence(forms, frame)
}

/// Reads and evaluates a source file in a fresh top-level frame
pub fn evaluate_file<P: AsRef<Path>>(interpreter: &Interpreter, path: P) -> anyhow::Result<Value> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let frame = interpreter.new_frame();
    let result = evaluate_source(interpreter, &source, &frame)
        .with_context(|| format!("failed to evaluate {}", path.display()));
    frame.clear();
    result
}
