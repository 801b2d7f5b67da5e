use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{TokenRequest, TokenResponse},
        jwt::JwtKeys,
    },
    error::ApiResult,
    extract::ValidatedJson,
    state::AppState,
    users::repo as users,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/token", post(token))
}

/// POST /auth/token { email, password } => { token }
#[instrument(skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = payload.email.trim().to_lowercase();
    let user = users::authenticate(&state.db, &email, &payload.password).await?;

    let token = JwtKeys::from_ref(&state).sign(&user)?;
    info!(user_id = user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}
