use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    error::Result,
    middleware::auth::AuthUser,
    services::leaderboard::{self, Standing},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_leaderboard))
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<Standing>,
}

async fn get_leaderboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<LeaderboardResponse>> {
    let mut conn = state.db.conn().await?;
    let leaderboard = leaderboard::leaderboard(&mut conn, user.id).await?;

    Ok(Json(LeaderboardResponse { leaderboard }))
}
