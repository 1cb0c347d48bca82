// src/routes/document_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    baht_text::satang_text,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{load_clinic_profile, ApiOk, AppState, ClinicProfile},
    numbering::DocumentSeries,
    routes::patient_routes::find_patient,
    routes::{from_satang, to_satang},
    services::documents::{issue_document, preview_next_number, DocumentRow, NewDocument, DOCUMENT_COLUMNS},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients/{patient_id}/certificates", post(issue_certificate))
        .route("/patients/{patient_id}/receipts", post(issue_receipt))
        .route("/patients/{patient_id}/documents", get(list_patient_documents))
        .route("/documents/next_number", get(next_number))
        .route("/documents/{document_id}", get(get_document))
        .route("/documents/{document_id}/void", post(void_document))
}

/* ============================================================
   Payloads stored in document.payload
   ============================================================ */

#[derive(Debug, Deserialize, Serialize)]
pub struct CertificateRequest {
    pub visit_date: Option<NaiveDate>,
    pub diagnosis: String,
    pub opinion: Option<String>,
    pub rest_from: Option<NaiveDate>,
    pub rest_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptItemRequest {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub items: Vec<ReceiptItemRequest>,
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ReceiptBody {
    pub items: Vec<ReceiptLine>,
    pub total: Decimal,
    pub amount_text: String,
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

fn validate_certificate(req: &CertificateRequest) -> Result<(), ApiError> {
    if req.diagnosis.trim().is_empty() {
        return Err(ApiError::validation("diagnosis is required"));
    }
    match (req.rest_from, req.rest_to) {
        (Some(from), Some(to)) if to < from => {
            Err(ApiError::validation("rest_to must not be before rest_from"))
        }
        (Some(_), None) | (None, Some(_)) => {
            Err(ApiError::validation("rest_from and rest_to go together"))
        }
        _ => Ok(()),
    }
}

/// Prices the lines, totals them and reads the total in Thai.
fn build_receipt(req: ReceiptRequest) -> Result<(ReceiptBody, i64), ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::validation("a receipt needs at least one item"));
    }

    let mut items = Vec::with_capacity(req.items.len());
    let mut total_satang: i64 = 0;
    for item in req.items {
        let description = item.description.trim().to_string();
        if description.is_empty() {
            return Err(ApiError::validation("item description is required"));
        }
        if item.quantity == 0 {
            return Err(ApiError::validation("item quantity must be > 0"));
        }
        let unit_satang = to_satang(item.unit_price)?;
        let line_satang = unit_satang
            .checked_mul(i64::from(item.quantity))
            .ok_or_else(|| ApiError::validation("item amount is too large"))?;
        total_satang = total_satang
            .checked_add(line_satang)
            .ok_or_else(|| ApiError::validation("receipt total is too large"))?;

        items.push(ReceiptLine {
            description,
            quantity: item.quantity,
            unit_price: from_satang(unit_satang),
            amount: from_satang(line_satang),
        });
    }

    let amount_text = satang_text(total_satang as u64)?;

    let body = ReceiptBody {
        items,
        total: from_satang(total_satang),
        amount_text,
        payment_method: req.payment_method.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        note: req.note.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    };
    Ok((body, total_satang))
}

fn to_json<T: Serialize>(body: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Internal(format!("payload encode error: {e}")))
}

/* ============================================================
   Issue
   ============================================================ */

pub async fn issue_certificate(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CertificateRequest>,
) -> Result<Json<ApiOk<DocumentRow>>, ApiError> {
    auth.ensure_doctor()?;
    validate_certificate(&req)?;
    find_patient(&state, patient_id).await?;

    let doc = NewDocument {
        series: DocumentSeries::MedicalCertificate,
        patient_id,
        issued_by_user_id: auth.user_id,
        total_satang: None,
        payload: to_json(&req)?,
    };
    Ok(Json(ApiOk::new(issue_document(&state, &doc).await?)))
}

pub async fn issue_receipt(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<ReceiptRequest>,
) -> Result<Json<ApiOk<DocumentRow>>, ApiError> {
    let (body, total_satang) = build_receipt(req)?;
    find_patient(&state, patient_id).await?;

    let doc = NewDocument {
        series: DocumentSeries::Receipt,
        patient_id,
        issued_by_user_id: auth.user_id,
        total_satang: Some(total_satang),
        payload: to_json(&body)?,
    };
    Ok(Json(ApiOk::new(issue_document(&state, &doc).await?)))
}

/* ============================================================
   Read
   ============================================================ */

pub async fn list_patient_documents(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<DocumentRow>>>, ApiError> {
    let rows: Vec<DocumentRow> = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        SELECT {DOCUMENT_COLUMNS}
        FROM document
        WHERE patient_id = $1
        ORDER BY issued_at DESC
        "#
    ))
    .bind(patient_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk::new(rows)))
}

#[derive(Debug, Deserialize)]
pub struct NextNumberQuery {
    pub series: String,
}

#[derive(Debug, Serialize)]
pub struct NextNumberData {
    pub series: DocumentSeries,
    pub document_number: String,
}

pub async fn next_number(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<NextNumberQuery>,
) -> Result<Json<ApiOk<NextNumberData>>, ApiError> {
    let series = DocumentSeries::from_code(q.series.trim())
        .ok_or_else(|| ApiError::validation(format!("unknown series: {}", q.series)))?;
    let number = preview_next_number(&state, series).await?;

    Ok(Json(ApiOk::new(NextNumberData {
        series,
        document_number: number.to_string(),
    })))
}

#[derive(Debug, Serialize)]
pub struct PatientBrief {
    pub hn: String,
    pub first_name: String,
    pub last_name: String,
}

/// Everything an external renderer needs to lay out the document.
#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub clinic: ClinicProfile,
    pub patient: PatientBrief,
    pub issued_by: String,
    pub issued_at_local: String,
    pub document: DocumentRow,
}

pub async fn get_document(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ApiOk<DocumentView>>, ApiError> {
    let document = find_document(&state, document_id).await?;
    let patient = find_patient(&state, document.patient_id).await?;
    let clinic = load_clinic_profile(&state.db).await.map_err(ApiError::db)?;

    let issued_by: String = sqlx::query_scalar(
        r#"
        SELECT display_name
        FROM staff_user
        WHERE user_id = $1
        "#,
    )
    .bind(document.issued_by_user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .unwrap_or_default();

    Ok(Json(ApiOk::new(DocumentView {
        clinic,
        patient: PatientBrief {
            hn: patient.hn,
            first_name: patient.first_name,
            last_name: patient.last_name,
        },
        issued_by,
        issued_at_local: local_timestamp(document.issued_at, &state),
        document,
    })))
}

fn local_timestamp(at: DateTime<Utc>, state: &AppState) -> String {
    at.with_timezone(&state.clinic_offset)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

async fn find_document(state: &AppState, document_id: Uuid) -> Result<DocumentRow, ApiError> {
    sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM document WHERE document_id = $1"
    ))
    .bind(document_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("document"))
}

#[derive(Debug, Deserialize)]
pub struct VoidRequest {
    pub reason: String,
}

/// Voided documents keep their number; it is never handed out again.
pub async fn void_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
    Json(req): Json<VoidRequest>,
) -> Result<Json<ApiOk<DocumentRow>>, ApiError> {
    auth.ensure_admin()?;
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::validation("reason is required"));
    }

    let updated: Option<DocumentRow> = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        UPDATE document
        SET voided_at = now(), void_reason = $1
        WHERE document_id = $2 AND voided_at IS NULL
        RETURNING {DOCUMENT_COLUMNS}
        "#
    ))
    .bind(reason)
    .bind(document_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?;

    match updated {
        Some(row) => {
            tracing::info!(number = %row.document_number, "document voided");
            Ok(Json(ApiOk::new(row)))
        }
        None => {
            find_document(&state, document_id).await?;
            Err(ApiError::Conflict("ALREADY_VOIDED", "Document is already voided".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, quantity: u32, unit_price: &str) -> ReceiptItemRequest {
        ReceiptItemRequest {
            description: description.into(),
            quantity,
            unit_price: unit_price.parse().unwrap(),
        }
    }

    #[test]
    fn receipt_totals_and_reads_amount() {
        let (body, total) = build_receipt(ReceiptRequest {
            items: vec![item("Consultation", 1, "300"), item("Paracetamol", 2, "10.25")],
            payment_method: Some(" cash ".into()),
            note: Some("   ".into()),
        })
        .unwrap();

        assert_eq!(total, 32_050);
        assert_eq!(body.total, "320.50".parse::<Decimal>().unwrap());
        assert_eq!(body.items[1].amount, "20.50".parse::<Decimal>().unwrap());
        assert_eq!(body.amount_text, "สามร้อยยี่สิบบาทห้าสิบสตางค์");
        assert_eq!(body.payment_method.as_deref(), Some("cash"));
        assert_eq!(body.note, None);
    }

    #[test]
    fn receipt_rejects_bad_items() {
        assert!(build_receipt(ReceiptRequest { items: vec![], payment_method: None, note: None }).is_err());
        assert!(build_receipt(ReceiptRequest {
            items: vec![item("X", 0, "1")],
            payment_method: None,
            note: None,
        })
        .is_err());
        assert!(build_receipt(ReceiptRequest {
            items: vec![item("X", 1, "-1")],
            payment_method: None,
            note: None,
        })
        .is_err());
        assert!(matches!(
            build_receipt(ReceiptRequest {
                items: vec![item("X", 1, "10000000")],
                payment_method: None,
                note: None,
            }),
            Err(ApiError::BadRequest("AMOUNT_OUT_OF_RANGE", _))
        ));
    }

    #[test]
    fn certificate_rest_period_must_be_ordered() {
        let mut req = CertificateRequest {
            visit_date: None,
            diagnosis: "Acute pharyngitis".into(),
            opinion: Some("Rest 2 days".into()),
            rest_from: NaiveDate::from_ymd_opt(2024, 3, 5),
            rest_to: NaiveDate::from_ymd_opt(2024, 3, 6),
        };
        assert!(validate_certificate(&req).is_ok());
        req.rest_to = NaiveDate::from_ymd_opt(2024, 3, 4);
        assert!(validate_certificate(&req).is_err());
        req.rest_to = None;
        assert!(validate_certificate(&req).is_err());
        req.rest_from = None;
        req.diagnosis = " ".into();
        assert!(validate_certificate(&req).is_err());
    }
}
