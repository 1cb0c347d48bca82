// src/routes/tool_routes.rs

use axum::{routing::post, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    baht_text::baht_text,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/tools/baht_text", post(convert_baht_text))
}

#[derive(Debug, Deserialize)]
pub struct BahtTextRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BahtTextData {
    pub amount: Decimal,
    pub text: String,
}

pub async fn convert_baht_text(
    _auth: AuthContext,
    Json(req): Json<BahtTextRequest>,
) -> Result<Json<ApiOk<BahtTextData>>, ApiError> {
    let text = baht_text(req.amount)?;
    Ok(Json(ApiOk::new(BahtTextData {
        amount: req.amount,
        text,
    })))
}
