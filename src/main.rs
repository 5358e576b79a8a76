// src/main.rs

use keep_testing::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("keep-testing error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level, args.debug)?;
    run(args).await
}
