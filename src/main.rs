// src/main.rs — Promptune entry point

use clap::Parser;

use promptune::cli::{run, Cli, Commands};
use promptune::infra::config::Config;
use promptune::infra::logger;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG / PROMPTUNE_LOG
    logger::init_logging("warn");

    if let Err(e) = dispatch().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn dispatch() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Run {
            algo,
            task,
            dataset,
            seed,
            budget,
            limit,
            rng_seed,
            out,
        } => {
            run::run_optimize(
                run::RunArgs {
                    algo,
                    task,
                    dataset,
                    seed,
                    budget,
                    limit,
                    rng_seed,
                    out,
                },
                &config,
            )
            .await
        }
        Commands::Doctor => run::run_doctor(&config).await,
    }
}
