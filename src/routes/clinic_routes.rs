// src/routes/clinic_routes.rs

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{load_clinic_profile, ApiOk, AppState, ClinicProfile},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/clinic", get(get_clinic).patch(update_clinic))
}

pub async fn get_clinic(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<ClinicProfile>>, ApiError> {
    let clinic = load_clinic_profile(&state.db).await.map_err(ApiError::db)?;
    Ok(Json(ApiOk::new(clinic)))
}

/// Header printed on certificates and receipts.
#[derive(Debug, Deserialize)]
pub struct UpdateClinicRequest {
    pub clinic_name: String,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub async fn update_clinic(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateClinicRequest>,
) -> Result<Json<ApiOk<ClinicProfile>>, ApiError> {
    auth.ensure_admin()?;

    let name = req.clinic_name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("clinic_name is required"));
    }
    if name.chars().count() > 128 {
        return Err(ApiError::validation("clinic_name is too long (max 128)"));
    }

    let clinic: ClinicProfile = sqlx::query_as::<_, ClinicProfile>(
        r#"
        INSERT INTO clinic_settings (singleton_id, clinic_name, clinic_address, clinic_phone)
        VALUES (TRUE, $1, $2, $3)
        ON CONFLICT (singleton_id)
        DO UPDATE SET clinic_name = EXCLUDED.clinic_name,
                      clinic_address = EXCLUDED.clinic_address,
                      clinic_phone = EXCLUDED.clinic_phone
        RETURNING clinic_name, clinic_address, clinic_phone
        "#,
    )
    .bind(name)
    .bind(trimmed(req.clinic_address))
    .bind(trimmed(req.clinic_phone))
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(clinic)))
}
