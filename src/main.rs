use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::app::AppContext;
use freshet::cli::{commands, Cli, Commands};
use freshet::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => {
            e.print()?;
            std::process::exit(1);
        }
    };

    let config = Config::from_env()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add { name, url } => {
            commands::add_feed(&ctx, &name, &url);
        }
        Commands::List { num } => {
            commands::list_feeds(&ctx, num);
        }
        Commands::Delete { name } => {
            commands::delete_feed(&ctx, &name);
        }
        Commands::Articles { feed_name, num } => {
            commands::show_articles(&ctx, &feed_name, num);
        }
        Commands::Fetch => {
            commands::fetch(ctx).await?;
        }
        Commands::SetInterval { interval } => {
            commands::set_interval(&ctx, &interval).await;
        }
        Commands::SetWorkers { count } => {
            commands::set_workers(&ctx, count).await;
        }
    }

    Ok(())
}
