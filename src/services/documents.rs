//! Document issuance: allocates the next serial of a series and stores the
//! document in one transaction.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use thiserror::Error;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::models::AppState;
use crate::numbering::{
    highest_sequence, next_document_number, DocumentNumber, DocumentSeries, NumberingError,
    SequenceMode,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_id: Uuid,
    pub series_code: String,
    pub document_number: String,
    pub patient_id: Uuid,
    pub issued_by_user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub total_satang: Option<i64>,
    pub payload: serde_json::Value,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

pub const DOCUMENT_COLUMNS: &str = "document_id, series_code, document_number, patient_id, \
    issued_by_user_id, issued_at, total_satang, payload, voided_at, void_reason";

#[derive(Debug)]
pub struct NewDocument {
    pub series: DocumentSeries,
    pub patient_id: Uuid,
    pub issued_by_user_id: Uuid,
    pub total_satang: Option<i64>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
enum IssueError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
}

/// Issues a document, retrying when another request took the same number.
pub async fn issue_document(state: &AppState, doc: &NewDocument) -> Result<DocumentRow, ApiError> {
    issue_document_in_year(state, doc, state.local_now().year()).await
}

pub(crate) async fn issue_document_in_year(
    state: &AppState,
    doc: &NewDocument,
    year: i32,
) -> Result<DocumentRow, ApiError> {
    let max_attempts = state.doc_number_max_attempts.max(1);

    let mut attempt = 1;
    loop {
        match try_issue(state, doc, year).await {
            Ok(row) => {
                tracing::info!(
                    series = doc.series.code(),
                    number = %row.document_number,
                    attempt,
                    "document issued"
                );
                return Ok(row);
            }
            Err(IssueError::Db(e)) if is_unique_violation(&e) => {
                if attempt >= max_attempts {
                    tracing::error!(series = doc.series.code(), attempt, "document number conflict, giving up");
                    return Err(ApiError::Conflict(
                        "DOCUMENT_NUMBER_CONFLICT",
                        "Could not allocate a unique document number, try again".into(),
                    ));
                }
                tracing::warn!(series = doc.series.code(), attempt, "document number conflict, retrying");
                resync_counter(state, doc.series, year).await.map_err(ApiError::db)?;
                attempt += 1;
            }
            Err(IssueError::Db(e)) => return Err(ApiError::db(e)),
            Err(IssueError::Numbering(e)) => {
                tracing::error!(series = doc.series.code(), error = %e, "cannot seed document counter");
                return Err(e.into());
            }
        }
    }
}

/// Moves the counter up to the highest number already issued, so the next
/// attempt does not hit the same taken number. Never moves it down.
async fn resync_counter(state: &AppState, series: DocumentSeries, year: i32) -> Result<(), sqlx::Error> {
    let counter_year = state.sequence_mode.counter_year(year);
    let numbers: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT document_number
        FROM document
        WHERE series_code = $1 AND document_number LIKE $2
        "#,
    )
    .bind(series.code())
    .bind(number_prefix(series, state.sequence_mode, year))
    .fetch_all(&state.db)
    .await?;

    let highest = highest_sequence(numbers.iter().map(String::as_str), series.code(), state.sequence_mode, year);

    let last_seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO document_counter (series_code, counter_year, last_seq)
        VALUES ($1, $2, $3)
        ON CONFLICT (series_code, counter_year)
        DO UPDATE SET last_seq = GREATEST(document_counter.last_seq, EXCLUDED.last_seq)
        RETURNING last_seq
        "#,
    )
    .bind(series.code())
    .bind(counter_year)
    .bind(seq_to_db(highest))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(series = series.code(), counter_year, last_seq, "document counter resynced");
    Ok(())
}

async fn try_issue(state: &AppState, doc: &NewDocument, year: i32) -> Result<DocumentRow, IssueError> {
    let series = doc.series.code();
    let counter_year = state.sequence_mode.counter_year(year);

    let mut tx = state.db.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT last_seq
        FROM document_counter
        WHERE series_code = $1 AND counter_year = $2
        FOR UPDATE
        "#,
    )
    .bind(series)
    .bind(counter_year)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_none() {
        // First use of this counter: continue from whatever was issued before.
        let previous = latest_issued_number(&mut *tx, doc.series, state.sequence_mode, year).await?;
        let last_seq = match previous.as_deref() {
            Some(prev) => prev.parse::<DocumentNumber>()?.sequence(),
            None => 0,
        };
        tracing::info!(series, counter_year, last_seq, "seeding document counter");

        sqlx::query(
            r#"
            INSERT INTO document_counter (series_code, counter_year, last_seq)
            VALUES ($1, $2, $3)
            ON CONFLICT (series_code, counter_year) DO NOTHING
            "#,
        )
        .bind(series)
        .bind(counter_year)
        .bind(seq_to_db(last_seq))
        .execute(&mut *tx)
        .await?;
    }

    let seq: i64 = sqlx::query_scalar(
        r#"
        UPDATE document_counter
        SET last_seq = last_seq + 1
        WHERE series_code = $1 AND counter_year = $2
        RETURNING last_seq
        "#,
    )
    .bind(series)
    .bind(counter_year)
    .fetch_one(&mut *tx)
    .await?;

    let number = DocumentNumber::new(series, year, seq.max(0) as u64);

    let row: DocumentRow = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        INSERT INTO document
            (series_code, document_number, patient_id, issued_by_user_id, total_satang, payload)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {DOCUMENT_COLUMNS}
        "#
    ))
    .bind(series)
    .bind(number.to_string())
    .bind(doc.patient_id)
    .bind(doc.issued_by_user_id)
    .bind(doc.total_satang)
    .bind(&doc.payload)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Most recently issued number of a series. With yearly reset only numbers
/// carrying `year` count.
async fn latest_issued_number<'e, E: PgExecutor<'e>>(
    executor: E,
    series: DocumentSeries,
    mode: SequenceMode,
    year: i32,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT document_number
        FROM document
        WHERE series_code = $1 AND document_number LIKE $2
        ORDER BY issued_at DESC, length(document_number) DESC, document_number DESC
        LIMIT 1
        "#,
    )
    .bind(series.code())
    .bind(number_prefix(series, mode, year))
    .fetch_optional(executor)
    .await
}

/// What the next issued number would be, without reserving it.
pub async fn preview_next_number(
    state: &AppState,
    series: DocumentSeries,
) -> Result<DocumentNumber, ApiError> {
    let year = state.local_now().year();
    let counter_year = state.sequence_mode.counter_year(year);

    let counter: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT last_seq
        FROM document_counter
        WHERE series_code = $1 AND counter_year = $2
        "#,
    )
    .bind(series.code())
    .bind(counter_year)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?;

    if let Some(last_seq) = counter {
        return Ok(DocumentNumber::new(series.code(), year, last_seq.max(0) as u64 + 1));
    }

    let previous = latest_issued_number(&state.db, series, state.sequence_mode, year)
        .await
        .map_err(ApiError::db)?;

    Ok(next_document_number(series.code(), previous.as_deref(), year)?)
}

/// LIKE pattern for the issued numbers that feed a counter.
fn number_prefix(series: DocumentSeries, mode: SequenceMode, year: i32) -> String {
    match mode {
        SequenceMode::Continuous => format!("{}-%", series.code()),
        SequenceMode::YearlyReset => format!("{}-{year}-%", series.code()),
    }
}

fn seq_to_db(seq: u64) -> i64 {
    i64::try_from(seq).unwrap_or(i64::MAX)
}
