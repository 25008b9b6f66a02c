use std::rc::Rc;

use log::{debug, warn};
use serde::Deserialize;

use crate::{
    builtin::builtin_frame,
    error::SnekError,
    frame::Frame,
    interpreter::{evaluate, StackContext},
    parser::{parse_str, Sexp},
    value::{SnekValue, Value},
};

/// Environment variable overriding [Config::max_depth]
pub const MAX_DEPTH_VAR: &str = "SNEK_MAX_DEPTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest nesting of evaluator calls before evaluation is aborted with
    /// [SnekError::RecursionLimit]
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 20_000 }
    }
}

impl Config {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Defaults, with `SNEK_MAX_DEPTH` applied when it holds a number
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(MAX_DEPTH_VAR) {
            match value.trim().parse() {
                Ok(max_depth) => config.max_depth = max_depth,
                Err(_) => warn!("ignoring {}={:?}, expected a positive integer", MAX_DEPTH_VAR, value),
            }
        }
        config
    }
}

/// Owns the builtin frame and the configuration. Every top-level frame it
/// hands out is a child of the same builtin frame, so sessions are isolated
/// from each other but share the builtins.
#[derive(Debug)]
pub struct Interpreter {
    builtins: Rc<Frame>,
    config: Config,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        debug!("creating interpreter with {:?}", config);
        Self { builtins: builtin_frame(), config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn builtins(&self) -> &Rc<Frame> {
        &self.builtins
    }

    /// A fresh, empty top-level frame
    pub fn new_frame(&self) -> Rc<Frame> {
        Frame::new(&self.builtins)
    }

    pub fn evaluate_sexp(&self, sexp: &Sexp, frame: &Rc<Frame>) -> Result<Value, SnekError> {
        let mut ctx = StackContext::new(self.config.max_depth);
        let result = evaluate(sexp, frame, &mut ctx);
        debug!("{} => {:?}", sexp, result);
        result
    }

    /// Parses one top-level form and evaluates it in a fresh top-level frame
    pub fn evaluate_expression(&self, text: &str) -> Result<Value, SnekError> {
        let sexp = parse_str(text)?;
        self.evaluate_sexp(&sexp, &self.new_frame())
    }

    /// Evaluates already separated top-level forms in order against `frame`,
    /// stopping at the first error. Returns the value of the last form, or
    /// `nil` when there are none.
    pub fn evaluate_sequence<I, S>(&self, forms: I, frame: &Rc<Frame>) -> Result<Value, SnekError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        forms.into_iter().try_fold(Value::Nil, |_, form| {
            let sexp = parse_str(form.as_ref())?;
            self.evaluate_sexp(&sexp, frame)
        })
    }
}

/// An evaluation session: one top-level frame that persists across calls, so
/// definitions made by one input are visible to the next.
pub struct EvaluationContext {
    interpreter: Interpreter,
    frame: Rc<Frame>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::from_interpreter(Interpreter::with_config(config))
    }

    pub fn from_interpreter(interpreter: Interpreter) -> Self {
        let frame = interpreter.new_frame();
        Self { interpreter, frame }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn frame(&self) -> &Rc<Frame> {
        &self.frame
    }

    pub fn evaluate_sexp(&mut self, sexp: &Sexp) -> Result<SnekValue, SnekError> {
        self.interpreter.evaluate_sexp(sexp, &self.frame)
            .map(|value| value.into())
    }

    pub fn evaluate_str(&mut self, input: &str) -> Result<SnekValue, SnekError> {
        let sexp = parse_str(input)?;
        self.evaluate_sexp(&sexp)
    }
}

impl Drop for EvaluationContext {
    fn drop(&mut self) {
        // Procedures defined at the top level hold the frame that holds them.
        // Clearing the bindings breaks that cycle
        self.frame.clear();
    }
}
