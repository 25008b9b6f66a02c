use std::rc::Rc;

use log::{trace, warn};

use crate::{
    builtin::{ComparisonOp, EvaluationResult, LogicalOp},
    error::SnekError,
    frame::Frame,
    parser::{Literal, Sexp},
    stack::with_stack,
    value::{Closure, Procedure, Value},
};

/// Tracks how deeply evaluation has nested. There is no tail-call
/// elimination, so this is what stands between a runaway recursion and the
/// host stack.
#[derive(Debug)]
pub(crate) struct StackContext {
    depth: usize,
    max_depth: usize,
}

impl StackContext {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { depth: 0, max_depth }
    }

    fn enter(&mut self) -> Result<(), SnekError> {
        if self.depth >= self.max_depth {
            warn!("evaluation depth limit of {} reached", self.max_depth);
            return Err(SnekError::RecursionLimit { limit: self.max_depth });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

fn evaluate_atom(literal: &Literal, environment: &Rc<Frame>) -> EvaluationResult {
    match literal {
        Literal::Boolean(value) => Ok(Value::Boolean(*value)),
        Literal::Integer(value) => Ok(Value::Integer(*value)),
        Literal::Float(value) => Ok(Value::Float(*value)),
        Literal::Identifier(identifier) => environment.lookup(identifier),
    }
}

fn expect_name<'s>(form: &str, sexp: &'s Sexp) -> Result<&'s Rc<str>, SnekError> {
    match sexp {
        Sexp::Atom(Literal::Identifier(name)) => Ok(name),
        Sexp::Atom(Literal::Integer(_) | Literal::Float(_)) => {
            Err(SnekError::evaluation(format!("'{}' was given the number {} where a name belongs", form, sexp)))
        }
        other => Err(SnekError::evaluation(format!("'{}' expected a name, got {}", form, other))),
    }
}

fn expect_procedure(value: Value) -> Result<Procedure, SnekError> {
    match value {
        Value::Procedure(procedure) => Ok(procedure),
        other => Err(SnekError::evaluation(format!("{} {} is not callable", other.type_name(), other))),
    }
}

fn evaluate_expression(expression: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    // Special forms are recognized by their leading symbol before anything is
    // looked up. Everything else is a procedure application, whose operands
    // are handled according to the kind of procedure in operator position

    let Some((operator, operands)) = expression.split_first() else {
        return Ok(Value::Nil);
    };

    let procedure = match operator {
        Sexp::Atom(Literal::Identifier(identifier)) => {
            match &**identifier {
                "define" => return evaluate_define(operands, environment, ctx),
                "del" => return evaluate_del(operands, environment),
                "lambda" => return evaluate_lambda(operands, environment),
                "let" => return evaluate_let(operands, environment, ctx),
                "set!" => return evaluate_set_bang(operands, environment, ctx),
                _ => {}
            }

            if let Some(comparison) = ComparisonOp::from_symbol(identifier) {
                let values = evaluate_list(operands, environment, ctx)?;
                return Ok(Value::Boolean(comparison.compare(&values)?));
            }

            expect_procedure(environment.lookup(identifier)?)?
        }
        Sexp::Atom(Literal::Integer(_) | Literal::Float(_)) => {
            return Err(SnekError::evaluation(format!("the number {} cannot be used as a name", operator)));
        }
        Sexp::Atom(Literal::Boolean(_)) => {
            return Err(SnekError::evaluation(format!("boolean {} is not callable", operator)));
        }
        Sexp::Expression(_) => expect_procedure(evaluate(operator, environment, ctx)?)?,
    };

    apply(&procedure, operands, environment, ctx)
}

/// Applies `procedure` to unevaluated `operands`, following the calling
/// convention of its kind.
fn apply(procedure: &Procedure, operands: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    trace!("applying {} to {} operand(s)", procedure.name(), operands.len());

    match procedure {
        Procedure::Closure(closure) => {
            let arguments = evaluate_list(operands, environment, ctx)?;
            call_closure(closure, arguments, ctx)
        }
        Procedure::Conditional => evaluate_if(operands, environment, ctx),
        Procedure::Logical(LogicalOp::And) => evaluate_and(operands, environment, ctx),
        Procedure::Logical(LogicalOp::Or) => evaluate_or(operands, environment, ctx),
        Procedure::Logical(LogicalOp::Not) => evaluate_not(operands, environment, ctx),
        // Two-operand list builtins reject a wrong operand count up front. The
        // one-operand ones evaluate everything first, so an unbound operand is
        // reported before the count
        Procedure::Structural(op) if op.arity() == 2 => {
            if operands.len() != op.arity() {
                return Err(SnekError::arity(op.symbol(), op.arity(), operands.len()));
            }
            op.apply(evaluate_list(operands, environment, ctx)?)
        }
        Procedure::Structural(op) => op.apply(evaluate_list(operands, environment, ctx)?),
        Procedure::Comparison(op) => {
            let values = evaluate_list(operands, environment, ctx)?;
            Ok(Value::Boolean(op.compare(&values)?))
        }
        Procedure::Arithmetic(op) => op.apply(evaluate_list(operands, environment, ctx)?),
        Procedure::Generic(op) => op.apply(evaluate_list(operands, environment, ctx)?),
    }
}

fn call_closure(closure: &Closure, arguments: Vec<Value>, ctx: &mut StackContext) -> EvaluationResult {
    // A closure runs in a fresh frame whose parent is the frame it was
    // created in, never the caller's

    if arguments.len() != closure.parameters.len() {
        return Err(SnekError::arity("lambda", closure.parameters.len(), arguments.len()));
    }

    let environment = Frame::new(&closure.environment);
    for (parameter, argument) in closure.parameters.iter().zip(arguments) {
        environment.define(Rc::clone(parameter), argument)?;
    }

    evaluate(&closure.body, &environment, ctx)
}

fn sexp_list_to_identifiers(form: &str, list: &Sexp) -> Result<Vec<Rc<str>>, SnekError> {
    match list {
        Sexp::Expression(elements) => elements.iter()
            .map(|sexp| expect_name(form, sexp).cloned())
            .collect(),
        other => Err(SnekError::evaluation(format!("'{}' expected a parameter list, got {}", form, other))),
    }
}

fn evaluate_define(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    // Either (define name expression), or the procedure shorthand
    // (define (name parameters...) body), which is rewritten into
    // (define name (lambda (parameters...) body)) and evaluated again

    let [target, body] = list else {
        return Err(SnekError::evaluation("'define' expects a name and a value"));
    };

    match target {
        Sexp::Expression(signature) => {
            let Some((name, parameters)) = signature.split_first() else {
                return Err(SnekError::evaluation("'define' needs a procedure name"));
            };

            let lambda = Sexp::expression(vec![
                Sexp::identifier("lambda"),
                Sexp::Expression(Rc::from(parameters)),
                body.clone(),
            ]);
            let rewritten = Sexp::expression(vec![Sexp::identifier("define"), name.clone(), lambda]);
            evaluate(&rewritten, environment, ctx)
        }
        atom => {
            let name = expect_name("define", atom)?;
            let value = evaluate(body, environment, ctx)?;
            environment.define(Rc::clone(name), value.clone())?;
            Ok(value)
        }
    }
}

fn evaluate_del(list: &[Sexp], environment: &Rc<Frame>) -> EvaluationResult {
    let [target] = list else {
        return Err(SnekError::arity("del", 1, list.len()));
    };
    environment.delete(expect_name("del", target)?)
}

fn evaluate_lambda(list: &[Sexp], environment: &Rc<Frame>) -> EvaluationResult {
    // A lambda captures the frame it is evaluated in. Nothing is bound as a
    // side effect

    let [parameters, body] = list else {
        return Err(SnekError::evaluation("'lambda' expects a parameter list and a body"));
    };

    Ok(Value::Procedure(Procedure::Closure(Rc::new(Closure {
        parameters: sexp_list_to_identifiers("lambda", parameters)?,
        body: body.clone(),
        environment: Rc::clone(environment),
    }))))
}

fn evaluate_let_parameter(sexp: &Sexp, environment: &Rc<Frame>, ctx: &mut StackContext) -> Result<(Rc<str>, Value), SnekError> {
    // A let parameter is a two element expression, a name and the expression
    // giving its value

    let Sexp::Expression(binding) = sexp else {
        return Err(SnekError::evaluation(format!("'let' binding must be a (name value) pair, got {}", sexp)));
    };
    let [name, value] = &binding[..] else {
        return Err(SnekError::evaluation(format!("'let' binding must be a (name value) pair, got {}", sexp)));
    };

    let name = expect_name("let", name)?;
    evaluate(value, environment, ctx).map(|value| (Rc::clone(name), value))
}

fn evaluate_let(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    // Every binding is evaluated in the enclosing frame, so bindings cannot see
    // each other. They all land in one new frame where the body is evaluated

    let [bindings, body] = list else {
        return Err(SnekError::evaluation("'let' expects a binding list and a body"));
    };
    let Sexp::Expression(bindings) = bindings else {
        return Err(SnekError::evaluation(format!("'let' expected a binding list, got {}", bindings)));
    };

    let parameters = bindings.iter()
        .map(|binding| evaluate_let_parameter(binding, environment, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let sub_environment = Frame::new(environment);
    for (name, value) in parameters {
        sub_environment.define(name, value)?;
    }

    evaluate(body, &sub_environment, ctx)
}

fn evaluate_set_bang(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    let [target, expression] = list else {
        return Err(SnekError::evaluation("'set!' expects a name and a value"));
    };

    let name = expect_name("set!", target)?;
    let value = evaluate(expression, environment, ctx)?;
    environment.assign(name, value)
}

// Only `#f` is false, every other value counts as true
fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Boolean(false))
}

fn evaluate_if(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    // Only the branch selected by the predicate is evaluated

    let [predicate, consequent, alternative] = list else {
        return Err(SnekError::arity("if", 3, list.len()));
    };

    if is_truthy(&evaluate(predicate, environment, ctx)?) {
        evaluate(consequent, environment, ctx)
    } else {
        evaluate(alternative, environment, ctx)
    }
}

fn evaluate_and(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    for expression in list {
        if !is_truthy(&evaluate(expression, environment, ctx)?) {
            return Ok(Value::Boolean(false));
        }
    }

    Ok(Value::Boolean(true))
}

fn evaluate_or(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    for expression in list {
        if is_truthy(&evaluate(expression, environment, ctx)?) {
            return Ok(Value::Boolean(true));
        }
    }

    Ok(Value::Boolean(false))
}

fn evaluate_not(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    let [operand] = list else {
        return Err(SnekError::arity("not", 1, list.len()));
    };
    let value = evaluate(operand, environment, ctx)?;
    Ok(Value::Boolean(!is_truthy(&value)))
}

fn evaluate_list(list: &[Sexp], environment: &Rc<Frame>, ctx: &mut StackContext) -> Result<Vec<Value>, SnekError> {
    list.iter()
        .map(|sexp| evaluate(sexp, environment, ctx))
        .collect()
}

pub(crate) fn evaluate(sexp: &Sexp, environment: &Rc<Frame>, ctx: &mut StackContext) -> EvaluationResult {
    ctx.enter()?;
    let result = match sexp {
        Sexp::Atom(atom) => evaluate_atom(atom, environment),
        Sexp::Expression(expression) => with_stack(|| evaluate_expression(expression, environment, ctx)),
    };
    ctx.leave();
    result
}
