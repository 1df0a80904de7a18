use roomrelay::{app, bind, AppState, Config, MessageStore, Relay};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("roomrelay=info,tower_http=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    // bind before touching the store so a duplicate instance leaves it alone
    let listener = match bind(&config.addr()).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(1);
        }
    };

    let store = MessageStore::load(&config.store_path);
    let app_state = AppState {
        relay: Relay::new(store, config.echo),
    };

    tracing::info!(echo = ?config.echo, "server running on {}", config.addr());
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "couldn't listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
