// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PatientRow {
    pub patient_id: Uuid,
    pub hn: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<chrono::NaiveDate>,
    pub gender: i16,
    pub allergies: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

const PATIENT_COLUMNS: &str = "patient_id, hn, first_name, last_name, national_id, phone, \
    birthday, gender, allergies, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub hn: Option<String>, // otherwise generated by the DB default
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<chrono::NaiveDate>,
    pub gender: Option<i16>, // 0 unspecified, 1 male, 2 female
    pub allergies: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", post(create_patient).get(search_patients))
        .route("/patients/{patient_id}", get(get_patient).patch(update_patient))
}

fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // Only called when the field is present: null => Some(None).
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

fn clean(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn validate_gender(gender: i16) -> Result<(), ApiError> {
    if (0..=2).contains(&gender) {
        Ok(())
    } else {
        Err(ApiError::validation("gender must be 0,1,2"))
    }
}

pub async fn find_patient(state: &AppState, patient_id: Uuid) -> Result<PatientRow, ApiError> {
    sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patient WHERE patient_id = $1"
    ))
    .bind(patient_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("patient"))
}

pub async fn create_patient(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<CreatePatientRequest>,
) -> Result<Json<ApiOk<PatientRow>>, ApiError> {
    let first_name = req.first_name.trim();
    let last_name = req.last_name.trim();

    if first_name.is_empty() || last_name.is_empty() {
        return Err(ApiError::validation("first_name and last_name are required"));
    }
    let gender = req.gender.unwrap_or(0);
    validate_gender(gender)?;

    let hn = clean(req.hn.as_deref());

    // COALESCE keeps the column default when no HN was supplied.
    let row: PatientRow = sqlx::query_as::<_, PatientRow>(&format!(
        r#"
        INSERT INTO patient (hn, first_name, last_name, national_id, phone, birthday, gender, allergies)
        VALUES (
            COALESCE($1, 'HN' || lpad(nextval('patient_hn_seq')::text, 6, '0')),
            $2, $3, $4, $5, $6, $7, $8
        )
        RETURNING {PATIENT_COLUMNS}
        "#
    ))
    .bind(hn)
    .bind(first_name)
    .bind(last_name)
    .bind(clean(req.national_id.as_deref()))
    .bind(clean(req.phone.as_deref()))
    .bind(req.birthday)
    .bind(gender)
    .bind(clean(req.allergies.as_deref()))
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("HN_TAKEN", "HN is already registered".into())
        } else {
            ApiError::db(e)
        }
    })?;

    tracing::info!(patient_id = %row.patient_id, hn = %row.hn, "patient registered");
    Ok(Json(ApiOk::new(row)))
}

pub async fn get_patient(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<PatientRow>>, ApiError> {
    Ok(Json(ApiOk::new(find_patient(&state, patient_id).await?)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn search_patients(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<PatientRow>>>, ApiError> {
    let query = q.query.unwrap_or_default().trim().to_string();

    let rows: Vec<PatientRow> = if query.is_empty() {
        sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patient
            ORDER BY created_at DESC
            LIMIT 50
            "#
        ))
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?
    } else {
        sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patient
            WHERE hn ILIKE $1
               OR first_name ILIKE $1
               OR last_name ILIKE $1
               OR phone ILIKE $1
            ORDER BY created_at DESC
            LIMIT 50
            "#
        ))
        .bind(format!("%{query}%"))
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?
    };

    Ok(Json(ApiOk::new(rows)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub national_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub birthday: Option<Option<chrono::NaiveDate>>,
    pub gender: Option<i16>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub allergies: Option<Option<String>>,
}

/// Absent keeps the old value, null clears it.
fn patch_text(field: Option<Option<String>>, existing: Option<String>) -> Option<String> {
    match field {
        None => existing,
        Some(v) => clean(v.as_deref()),
    }
}

pub async fn update_patient(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> Result<Json<ApiOk<PatientRow>>, ApiError> {
    let existing = find_patient(&state, patient_id).await?;

    let first_name = clean(req.first_name.as_deref()).unwrap_or(existing.first_name);
    let last_name = clean(req.last_name.as_deref()).unwrap_or(existing.last_name);
    let national_id = patch_text(req.national_id, existing.national_id);
    let phone = patch_text(req.phone, existing.phone);
    let allergies = patch_text(req.allergies, existing.allergies);
    let birthday = match req.birthday {
        None => existing.birthday,
        Some(v) => v,
    };
    let gender = req.gender.unwrap_or(existing.gender);
    validate_gender(gender)?;

    let updated: PatientRow = sqlx::query_as::<_, PatientRow>(&format!(
        r#"
        UPDATE patient
        SET first_name = $1,
            last_name = $2,
            national_id = $3,
            phone = $4,
            birthday = $5,
            gender = $6,
            allergies = $7,
            updated_at = now()
        WHERE patient_id = $8
        RETURNING {PATIENT_COLUMNS}
        "#
    ))
    .bind(first_name)
    .bind(last_name)
    .bind(national_id)
    .bind(phone)
    .bind(birthday)
    .bind(gender)
    .bind(allergies)
    .bind(patient_id)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_semantics() {
        assert_eq!(patch_text(None, Some("old".into())), Some("old".into()));
        assert_eq!(patch_text(Some(None), Some("old".into())), None);
        assert_eq!(patch_text(Some(Some("  ".into())), Some("old".into())), None);
        assert_eq!(patch_text(Some(Some(" new ".into())), None), Some("new".into()));
    }

    #[test]
    fn update_request_distinguishes_null_from_missing() {
        let req: UpdatePatientRequest =
            serde_json::from_str(r#"{"phone": null, "first_name": "Somchai"}"#).unwrap();
        assert_eq!(req.phone, Some(None));
        assert_eq!(req.national_id, None);
        assert_eq!(req.first_name.as_deref(), Some("Somchai"));
    }

    #[test]
    fn gender_range() {
        assert!(validate_gender(0).is_ok());
        assert!(validate_gender(2).is_ok());
        assert!(validate_gender(3).is_err());
        assert!(validate_gender(-1).is_err());
    }
}
