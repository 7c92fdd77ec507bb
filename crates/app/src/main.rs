// CLI modules
mod args;
mod build_info;
mod op;
mod ops;
mod state;
mod store;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Check, Init, Key, Secret, Version};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::AppState;

command_enum! {
    (Init, Init),
    (Key, Key),
    (Secret, Secret),
    (Check, Check),
    (Version, Version),
}

/// Log to stderr so command output on stdout stays scriptable
fn init_logging(config_path: Option<std::path::PathBuf>) {
    let level = AppState::load(config_path)
        .map(|state| state.config.log_level())
        .unwrap_or(LevelFilter::WARN);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.config_path.clone());

    let ctx = op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
