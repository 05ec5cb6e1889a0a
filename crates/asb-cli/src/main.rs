//! asb - asset bundle builder CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use asb_cli::cmd::{self, Context};
use asb_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Build {
            plan,
            online,
            assets_dir,
            jobs,
        } => {
            let ctx = Context::load(cli.config.as_deref())
                .await?
                .with_assets_dir(assets_dir.as_deref())?;
            cmd::build::build(&ctx, &plan, online, usize::from(jobs), quiet).await
        }
        Commands::Init { assets_dir } => {
            let ctx = Context::load(cli.config.as_deref())
                .await?
                .with_assets_dir(assets_dir.as_deref())?;
            cmd::init::init(&ctx, quiet)
        }
        Commands::Show { manifest } => {
            let ctx = Context::load(cli.config.as_deref()).await?;
            cmd::show::show(&ctx, manifest.as_deref())
        }
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
