// src/routes/course_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    routes::patient_routes::find_patient,
    routes::to_satang,
};

/// A prepaid package of sessions (course or membership).
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CourseRow {
    pub course_id: Uuid,
    pub patient_id: Uuid,
    pub course_name: String,
    pub total_sessions: i32,
    pub used_sessions: i32,
    pub price_satang: i64,
    pub expires_on: Option<NaiveDate>,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COURSE_COLUMNS: &str = "course_id, patient_id, course_name, total_sessions, used_sessions, \
    price_satang, expires_on, created_by_user_id, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients/{patient_id}/courses", get(list_courses).post(create_course))
        .route("/courses/{course_id}/use", post(use_session))
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub course_name: String,
    pub total_sessions: i32,
    pub price: Decimal,
    pub expires_on: Option<NaiveDate>,
}

pub async fn create_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<Json<ApiOk<CourseRow>>, ApiError> {
    let name = req.course_name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("course_name is required"));
    }
    if req.total_sessions <= 0 {
        return Err(ApiError::validation("total_sessions must be > 0"));
    }
    let price_satang = to_satang(req.price)?;
    find_patient(&state, patient_id).await?;

    let row: CourseRow = sqlx::query_as::<_, CourseRow>(&format!(
        r#"
        INSERT INTO course (patient_id, course_name, total_sessions, price_satang, expires_on, created_by_user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(patient_id)
    .bind(name)
    .bind(req.total_sessions)
    .bind(price_satang)
    .bind(req.expires_on)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(row)))
}

pub async fn list_courses(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<CourseRow>>>, ApiError> {
    let rows: Vec<CourseRow> = sqlx::query_as::<_, CourseRow>(&format!(
        r#"
        SELECT {COURSE_COLUMNS}
        FROM course
        WHERE patient_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(patient_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(rows)))
}

/// Consumes one session. The guard lives in the UPDATE so concurrent
/// requests cannot overdraw the package.
pub async fn use_session(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiOk<CourseRow>>, ApiError> {
    let today = state.local_now().date_naive();

    let updated: Option<CourseRow> = sqlx::query_as::<_, CourseRow>(&format!(
        r#"
        UPDATE course
        SET used_sessions = used_sessions + 1, updated_at = now()
        WHERE course_id = $1
          AND used_sessions < total_sessions
          AND (expires_on IS NULL OR expires_on >= $2)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(course_id)
    .bind(today)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?;

    if let Some(row) = updated {
        return Ok(Json(ApiOk::new(row)));
    }

    let existing: CourseRow = sqlx::query_as::<_, CourseRow>(&format!(
        "SELECT {COURSE_COLUMNS} FROM course WHERE course_id = $1"
    ))
    .bind(course_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("course"))?;

    Err(unusable_reason(&existing, today))
}

fn unusable_reason(course: &CourseRow, today: NaiveDate) -> ApiError {
    if course.expires_on.is_some_and(|d| d < today) {
        ApiError::Conflict("COURSE_EXPIRED", "Course has expired".into())
    } else {
        ApiError::Conflict("COURSE_EXHAUSTED", "No sessions left in this course".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(used: i32, total: i32, expires_on: Option<NaiveDate>) -> CourseRow {
        CourseRow {
            course_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            course_name: "Physiotherapy x10".into(),
            total_sessions: total,
            used_sessions: used,
            price_satang: 500_000,
            expires_on,
            created_by_user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_wins_over_exhaustion() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let expired = course(10, 10, NaiveDate::from_ymd_opt(2024, 5, 31));
        assert!(matches!(
            unusable_reason(&expired, today),
            ApiError::Conflict("COURSE_EXPIRED", _)
        ));

        let exhausted = course(10, 10, Some(today));
        assert!(matches!(
            unusable_reason(&exhausted, today),
            ApiError::Conflict("COURSE_EXHAUSTED", _)
        ));
    }
}
