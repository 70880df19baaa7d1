use std::error::Error;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let problem = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if problem.trim().is_empty() {
        eprintln!("usage: triage <problem description>");
        std::process::exit(2);
    }

    let prediction = triage::global_predictor()?
        .predict_detailed(&problem)
        .await?;

    match prediction.score {
        Some(score) => println!("{} (score {score:.4})", prediction.specialty),
        None => println!("{} (fallback)", prediction.specialty),
    }

    Ok(())
}
