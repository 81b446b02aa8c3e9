mod config;
mod exercise_cmds;
mod serve_cmd;

use clap::{Parser, Subcommand};

use coachwise_db::pool;

use config::CoachwiseConfig;

#[derive(Parser)]
#[command(name = "coachwise", about = "Coaching backend: exercises and their sets")]
struct Cli {
    /// Database URL (overrides COACHWISE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a coachwise config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/coachwise")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the coachwise database (requires config file or env vars)
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides COACHWISE_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides COACHWISE_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Exercise management
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
}

#[derive(Subcommand)]
pub enum ExerciseCommands {
    /// Create a shared exercise from a JSON file
    Create {
        /// Path to the exercise JSON file
        file: String,
    },
    /// Show an exercise and its sets
    Show {
        /// Exercise ID to show
        exercise_id: String,
    },
    /// List exercises
    List {
        /// Only public (true) or only private (false) exercises
        #[arg(long)]
        public: Option<bool>,
        /// Case-insensitive name substring
        #[arg(long)]
        name: Option<String>,
    },
}

/// Execute the `coachwise init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `coachwise db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `coachwise db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = CoachwiseConfig::resolve(cli_db_url, None, None)?;

    println!("Initializing coachwise database...");

    // 1. Create the database if it does not exist.
    let status = pool::ensure_database_exists(&resolved.db_config).await?;
    if status == pool::DatabaseStatus::Created {
        println!("Created database.");
    }

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Summarize what is stored.
    let summary = pool::store_summary(&db_pool).await?;
    match pool::schema_version() {
        Some(version) => println!("Database ready (schema {version}):"),
        None => println!("Database ready:"),
    }
    println!(
        "  exercises: {} ({} shared, {} public)",
        summary.exercises, summary.shared_exercises, summary.public_exercises,
    );
    println!("  sets:      {}", summary.sets);

    db_pool.close().await;

    println!("coachwise db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved =
                CoachwiseConfig::resolve(cli.database_url.as_deref(), bind.as_deref(), port)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                serve_cmd::run_serve(db_pool.clone(), &resolved.bind, resolved.port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Exercise { command } => {
            let resolved = CoachwiseConfig::resolve(cli.database_url.as_deref(), None, None)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = exercise_cmds::run_exercise_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
