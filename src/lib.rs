pub mod appresult;
pub mod config;
pub mod res;
pub mod rooms;
pub mod store;

use std::io;

use axum::{extract::FromRef, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use rooms::Relay;
pub use store::{Message, MessageStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub relay: Relay,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(res::index))
        .merge(rooms::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("port {addr} is already in use, close the other process first")]
    InUse { addr: String },
    #[error("couldn't listen on {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

pub async fn bind(addr: &str) -> Result<TcpListener, BindError> {
    TcpListener::bind(addr).await.map_err(|source| match source.kind() {
        io::ErrorKind::AddrInUse => BindError::InUse { addr: addr.to_owned() },
        _ => BindError::Io { addr: addr.to_owned(), source },
    })
}
