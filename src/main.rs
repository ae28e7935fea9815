use dotenvy::dotenv;
use stock_count::{
    api::{self, AppState},
    config::{database, settings},
    core::user,
    errors::Result,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    if dotenv().is_ok() {
        info!("Loaded .env file.");
    }

    // 3. Settings from config file and environment
    let settings = settings::load_from_env()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(?settings, "Settings loaded.");

    // 4. Database and schema
    let db = database::init_db(&settings.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Bootstrap admin, if configured
    if let Some(admin) = &settings.bootstrap_admin {
        let admin = user::ensure_admin(&db, admin)
            .await
            .inspect_err(|e| error!("Failed to ensure admin user: {}", e))?;
        info!(user_id = admin.id, "Admin user ready.");
    }

    // 6. Serve
    let app = api::router(AppState::from_settings(db, &settings)?);
    let listener = TcpListener::bind(&settings.server.bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", settings.server.bind_addr, e))?;
    info!("Listening on {}", settings.server.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
