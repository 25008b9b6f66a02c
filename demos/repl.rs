use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use snek::{Config, EvaluationContext};

async fn query(stdout: &mut io::Stdout, lines: &mut io::Lines<io::BufReader<io::Stdin>>) -> io::Result<Option<String>> {
    stdout.write_all("> ".as_bytes()).await?;
    stdout.flush().await?;
    lines.next_line().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    env_logger::init();

    // Definitions persist between lines for as long as the session lives
    let mut context = EvaluationContext::with_config(Config::from_env());
    let mut lines = io::BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = query(&mut stdout, &mut lines).await? {
        if line.trim().is_empty() {
            continue;
        }

        match context.evaluate_str(&line) {
            Ok(value) => println!("{}", value),
            Err(err) => println!("Error: {}", err),
        }
    }

    Ok(())
}
