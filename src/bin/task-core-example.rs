// src/bin/task-core-example.rs

use clap::Parser;
use task_core::cli::ExampleArgs;
use task_core::{logging, run_example};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("task-core-example error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = ExampleArgs::parse();
    logging::init_logging(None, true)?;

    let result = run_example(&args.framework_dir, args.max_parallelism).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_success())
}
