// src/routes/stats_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    numbering::DocumentSeries,
    stats::{build_dashboard, Bucket, DashboardInput, DashboardRow},
};

const MAX_RANGE_DAYS: i64 = 366 * 3;

pub fn router() -> Router<AppState> {
    Router::new().route("/stats/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub bucket: Bucket,
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub bucket: Bucket,
    pub rows: Vec<DashboardRow>,
}

/// Defaults: the last 30 days for daily buckets, the last year for monthly.
fn resolve_range(q: &DashboardQuery, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let to = q.to.unwrap_or(today);
    let from = q.from.unwrap_or_else(|| match q.bucket {
        Bucket::Day => to - Duration::days(29),
        Bucket::Month => to - Duration::days(365),
    });

    if from > to {
        return Err(ApiError::validation("from must not be after to"));
    }
    if (to - from).num_days() > MAX_RANGE_DAYS {
        return Err(ApiError::validation("date range is too long"));
    }
    Ok((from, to))
}

/// Local-midnight bounds of `[from, to]` as a half-open UTC range.
fn utc_bounds(
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let start_of = |d: NaiveDate| {
        d.and_hms_opt(0, 0, 0)
            .and_then(|dt| dt.and_local_timezone(offset).single())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ApiError::validation("invalid date"))
    };
    let end_day = to
        .succ_opt()
        .ok_or_else(|| ApiError::validation("invalid date"))?;
    Ok((start_of(from)?, start_of(end_day)?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<DashboardQuery>,
) -> Result<Json<ApiOk<DashboardData>>, ApiError> {
    let today = state.local_now().date_naive();
    let (from, to) = resolve_range(&q, today)?;
    let (start, end) = utc_bounds(from, to, state.clinic_offset)?;

    let patients_created: Vec<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        SELECT created_at
        FROM patient
        WHERE created_at >= $1 AND created_at < $2
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    let notes_created: Vec<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        SELECT visit_at
        FROM treatment_note
        WHERE visit_at >= $1 AND visit_at < $2
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    let documents_issued: Vec<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        SELECT issued_at
        FROM document
        WHERE issued_at >= $1 AND issued_at < $2
          AND voided_at IS NULL
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    let receipts: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
        r#"
        SELECT issued_at, total_satang
        FROM document
        WHERE series_code = $1
          AND issued_at >= $2 AND issued_at < $3
          AND voided_at IS NULL
          AND total_satang IS NOT NULL
        "#,
    )
    .bind(DocumentSeries::Receipt.code())
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    let input = DashboardInput {
        patients_created,
        notes_created,
        documents_issued,
        receipts,
    };
    let rows = build_dashboard(&input, q.bucket, state.clinic_offset, from, to);

    Ok(Json(ApiOk::new(DashboardData {
        from,
        to,
        bucket: q.bucket,
        rows,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_range_is_last_thirty_days() {
        let q = DashboardQuery { from: None, to: None, bucket: Bucket::Day };
        let (from, to) = resolve_range(&q, date(2024, 3, 30)).unwrap();
        assert_eq!(from, date(2024, 3, 1));
        assert_eq!(to, date(2024, 3, 30));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let q = DashboardQuery {
            from: Some(date(2024, 3, 2)),
            to: Some(date(2024, 3, 1)),
            bucket: Bucket::Month,
        };
        assert!(resolve_range(&q, date(2024, 3, 30)).is_err());
    }

    #[test]
    fn bounds_follow_local_midnight() {
        let bkk = FixedOffset::east_opt(7 * 3600).unwrap();
        let (start, end) = utc_bounds(date(2024, 3, 1), date(2024, 3, 1), bkk).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-02-29T17:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }
}
