// src/routes/note_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkData},
    routes::patient_routes::find_patient,
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TreatmentNoteRow {
    pub note_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_user_id: Uuid,
    pub visit_at: DateTime<Utc>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NOTE_COLUMNS: &str = "note_id, patient_id, doctor_user_id, visit_at, symptoms, diagnosis, \
    treatment, remarks, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients/{patient_id}/notes", get(list_notes).post(create_note))
        .route("/notes/{note_id}", patch(update_note).delete(delete_note))
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub visit_at: Option<DateTime<Utc>>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub remarks: Option<String>,
}

impl NoteRequest {
    fn is_blank(&self) -> bool {
        [&self.symptoms, &self.diagnosis, &self.treatment, &self.remarks]
            .iter()
            .all(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

fn clean(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<ApiOk<TreatmentNoteRow>>, ApiError> {
    auth.ensure_doctor()?;
    if req.is_blank() {
        return Err(ApiError::validation("a treatment note needs at least one field"));
    }
    find_patient(&state, patient_id).await?;

    let row: TreatmentNoteRow = sqlx::query_as::<_, TreatmentNoteRow>(&format!(
        r#"
        INSERT INTO treatment_note (patient_id, doctor_user_id, visit_at, symptoms, diagnosis, treatment, remarks)
        VALUES ($1, $2, COALESCE($3, now()), $4, $5, $6, $7)
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(patient_id)
    .bind(auth.user_id)
    .bind(req.visit_at)
    .bind(clean(req.symptoms))
    .bind(clean(req.diagnosis))
    .bind(clean(req.treatment))
    .bind(clean(req.remarks))
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(row)))
}

/// Doctors see their own notes; admins see every note of the patient.
pub async fn list_notes(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<TreatmentNoteRow>>>, ApiError> {
    if !auth.is_admin() {
        auth.ensure_doctor()?;
    }
    let only_doctor = (!auth.is_admin()).then_some(auth.user_id);

    let rows: Vec<TreatmentNoteRow> = sqlx::query_as::<_, TreatmentNoteRow>(&format!(
        r#"
        SELECT {NOTE_COLUMNS}
        FROM treatment_note
        WHERE patient_id = $1
          AND ($2::uuid IS NULL OR doctor_user_id = $2)
        ORDER BY visit_at DESC
        "#
    ))
    .bind(patient_id)
    .bind(only_doctor)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(rows)))
}

async fn load_own_note(state: &AppState, auth: &AuthContext, note_id: Uuid) -> Result<TreatmentNoteRow, ApiError> {
    let note: TreatmentNoteRow = sqlx::query_as::<_, TreatmentNoteRow>(&format!(
        "SELECT {NOTE_COLUMNS} FROM treatment_note WHERE note_id = $1"
    ))
    .bind(note_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("treatment note"))?;

    if note.doctor_user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only the authoring doctor can change this note".into(),
        ));
    }
    Ok(note)
}

pub async fn update_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(note_id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<ApiOk<TreatmentNoteRow>>, ApiError> {
    let existing = load_own_note(&state, &auth, note_id).await?;

    let updated: TreatmentNoteRow = sqlx::query_as::<_, TreatmentNoteRow>(&format!(
        r#"
        UPDATE treatment_note
        SET visit_at = $1,
            symptoms = $2,
            diagnosis = $3,
            treatment = $4,
            remarks = $5,
            updated_at = now()
        WHERE note_id = $6
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(req.visit_at.unwrap_or(existing.visit_at))
    .bind(clean(req.symptoms).or(existing.symptoms))
    .bind(clean(req.diagnosis).or(existing.diagnosis))
    .bind(clean(req.treatment).or(existing.treatment))
    .bind(clean(req.remarks).or(existing.remarks))
    .bind(note_id)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(updated)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(note_id): Path<Uuid>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    load_own_note(&state, &auth, note_id).await?;

    sqlx::query("DELETE FROM treatment_note WHERE note_id = $1")
        .bind(note_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    tracing::info!(%note_id, "treatment note deleted");
    Ok(Json(ApiOk::new(OkData { ok: true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_notes_are_detected() {
        let req: NoteRequest = serde_json::from_str(r#"{"symptoms": "  "}"#).unwrap();
        assert!(req.is_blank());
        let req: NoteRequest = serde_json::from_str(r#"{"diagnosis": "URI"}"#).unwrap();
        assert!(!req.is_blank());
    }
}
