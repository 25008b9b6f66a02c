use snek::{parse_str, EvaluationContext, Sexp, SnekError};

fn main() -> anyhow::Result<()> {
    let program = vec![
        "(define (spam) (* eggs 3))",
        "(spam)",
        "(define eggs 20)",
        "(spam)",
    ];

    // Evaluating text directly
    let mut context = EvaluationContext::new();
    for source in &program {
        match context.evaluate_str(source) {
            Ok(value) => println!("{}: {}", source, value),
            Err(err) => println!("{}: {}", source, err)
        }
    }

    // Parsing everything up front, then evaluating the trees in a new session
    let sexps = program.into_iter()
        .map(|line| parse_str(line).map(|sexp| (line, sexp)))
        .collect::<Result<Vec<(&str, Sexp)>, SnekError>>()?;

    let mut context = EvaluationContext::new();
    for (source, sexp) in &sexps {
        match context.evaluate_sexp(sexp) {
            Ok(value) => println!("{}: {}", source, serde_json::to_string(&value)?),
            Err(err) => println!("{}: {}", source, err)
        }
    }

    Ok(())
}
