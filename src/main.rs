use sqlx::postgres::PgPoolOptions;
use tasks_api::{routes, AppState, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasks_api=debug,tower_http=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db).await?;
    info!("migrations applied");

    let state = AppState::new(db, &config.jwt_secret);
    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    info!("server is listening at http://{}", config.addr());

    axum::serve(listener, app).await?;
    Ok(())
}
