mod seed;

use anyhow::Context;
use clap::{Parser, Subcommand};
use server::config::DatabaseConfig;
use server::database::init_db;
use server::seed::{ensure_stats_row, seed_role_permissions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arena", version, about = "Prompt arena development tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a database with a synthetic competition.
    Seed(seed::SeedArgs),
    /// Mint a bearer token signed with the shared secret.
    Token {
        /// Token subject (user ID).
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "ARENA__AUTH__JWT_SECRET")]
        secret: String,
        /// Lifetime in hours.
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match Cli::parse().command {
        Command::Seed(args) => {
            let db = init_db(&DatabaseConfig {
                url: args.database_url.clone(),
                max_connections: 5,
            })
            .await
            .context("Failed to connect to database")?;
            seed_role_permissions(&db).await?;
            ensure_stats_row(&db).await?;

            let summary = seed::run(&db, &args).await?;
            println!("{summary}");
        }
        Command::Token {
            user_id,
            email,
            secret,
            ttl_hours,
        } => {
            let token = server::utils::jwt::sign(
                &user_id,
                email.as_deref(),
                chrono::Duration::hours(ttl_hours),
                &secret,
            )?;
            println!("{token}");
        }
    }

    Ok(())
}
