pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ssss")]
#[command(about = "Shared secret storage: keys, encrypted secrets and integrity checks")]
pub struct Args {
    /// Path to the ssss state directory (defaults to ~/.ssss)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
