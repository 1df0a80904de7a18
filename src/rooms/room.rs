use axum::{debug_handler, extract::{Path, State}, Json};

use crate::{store::Message, AppResult};

use super::Relay;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(relay): State<Relay>,
    Path(room): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(relay.history(&room)?))
}
