use clap::Parser;
use rewear::config::{create_default_config_file, AppConfig};
use rewear::{router, AppState, Database, MediaStore, RewearError, TokenService};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

// Only ever used when server.development is set and no secret is configured.
const DEV_JWT_SECRET: &str = "rewear-development-secret-change-me";

#[derive(Parser)]
#[command(name = "rewear-server")]
#[command(about = "ReWear clothing swap marketplace API server")]
struct Args {
    #[arg(short, long, default_value = "rewear.toml")]
    config: String,

    #[arg(short, long)]
    database_url: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !std::path::Path::new(&args.config).exists() {
        create_default_config_file(&args.config)?;
        println!("Created default config at {}", args.config);
    }

    let mut config = AppConfig::load_with_env_overrides(&args.config)?;
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let secret = match config.get_jwt_secret() {
        Some(secret) => secret.to_string(),
        None if config.is_development() => {
            tracing::warn!("auth.jwt_secret not set, using the built-in development secret");
            DEV_JWT_SECRET.to_string()
        }
        None => {
            return Err(RewearError::Config(
                "auth.jwt_secret (or JWT_SECRET) is required outside development".to_string(),
            )
            .into());
        }
    };

    let db = Database::new(config.get_database_url()).await?;
    let media = MediaStore::new(&config.media.root, &config.media.url_prefix)?;
    let tokens = TokenService::new(
        secret,
        config.auth.access_token_ttl_hours,
        config.auth.refresh_token_ttl_days,
    );

    let state = AppState {
        db,
        tokens,
        media,
        public_base: config.server.public_url.clone(),
    };

    let mut app = router(state);
    if config.is_development() {
        app = app.nest_service(&config.media.url_prefix, ServeDir::new(&config.media.root));
    }

    let listener = TcpListener::bind(config.get_server_address()).await?;
    println!("ReWear API listening on {}", config.get_server_address());

    axum::serve(listener, app).await?;

    Ok(())
}
