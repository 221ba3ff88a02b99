// src/main.rs

use sherlock::config::{load_optional, resolve};
use sherlock::logging::{LogSettings, init_logging};
use sherlock::{cli, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("sherlock error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let file = load_optional(args.config.as_deref())?;
    init_logging(&LogSettings::resolve(&args, &file))?;
    let config = resolve(&args, &file)?;
    Ok(run(config).await)
}
