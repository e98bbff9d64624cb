use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Book records service.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the resolved settings as JSON
    Settings,
    /// Print the table definitions `serve` applies on startup
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Schema => {
            let pool = shelf_db::connect_lazy(&settings.database)?;
            let mut registry = ModuleRegistry::new();
            shelf_app::modules::register_all(&mut registry, &pool);

            for (module, table) in registry.collect_schema() {
                println!("-- {module}: {}", table.name);
                println!("{}", table.ddl.trim());
            }
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "shelf bootstrap starting"
    );

    let pool = shelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    shelf_app::modules::register_all(&mut registry, &pool);

    shelf_db::ensure_schema(&pool, &registry.collect_schema()).await?;

    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("shelf bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings.server).await;

    registry.stop_all().await?;
    pool.close().await;

    served
}
