use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use snek::{evaluate_file, Config, EvaluationContext, Interpreter, SnekValue};

#[derive(Parser, Debug)]
#[command(name = "snek")]
#[command(about = "Evaluate snek programs")]
struct Cli {
    /// Source files, each evaluated in its own top-level frame
    #[arg(required_unless_present = "expressions")]
    files: Vec<PathBuf>,

    /// Expression to evaluate after the files, may be repeated
    #[arg(short, long = "expression")]
    expressions: Vec<String>,

    /// Deepest evaluation nesting before giving up
    #[arg(long)]
    max_depth: Option<usize>,

    /// JSON file holding the interpreter configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Config::from_json(&source)
                    .with_context(|| format!("invalid configuration in {}", path.display()))?
            }
            None => Config::from_env(),
        };

        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        Ok(config)
    }

    fn print(&self, label: &str, value: SnekValue) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(&value)?);
        } else {
            println!("{}: {}", label, value);
        }
        Ok(())
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let interpreter = Interpreter::with_config(config);

    for path in &cli.files {
        info!("evaluating {}", path.display());
        let value = evaluate_file(&interpreter, path)?;
        cli.print(&path.display().to_string(), SnekValue::from(&value))?;
    }

    if cli.expressions.is_empty() {
        return Ok(());
    }

    let mut context = EvaluationContext::from_interpreter(interpreter);
    for expression in &cli.expressions {
        let value = context.evaluate_str(expression)
            .with_context(|| format!("failed to evaluate {}", expression))?;
        cli.print(expression, value)?;
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    run(Cli::parse())
}
