mod builtin;
mod context;
mod driver;
mod error;
mod frame;
mod interpreter;
mod parser;
mod stack;
mod value;

#[cfg(test)]
mod test_utils;

pub use builtin::{builtin_frame, ArithmeticOp, ComparisonOp, GenericOp, LogicalOp, StructuralOp};
pub use context::{Config, EvaluationContext, Interpreter, MAX_DEPTH_VAR};
pub use driver::{evaluate_file, evaluate_source, split_forms, strip_comments};
pub use error::{ErrorKind, SnekError};
pub use frame::Frame;
pub use parser::{parse, parse_str, tokenize, Literal, Sexp, Token};
pub use value::{Closure, ListIter, Pair, Procedure, SnekValue, Value};
