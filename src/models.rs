use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::numbering::SequenceMode;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub clinic_offset: FixedOffset,
    pub sequence_mode: SequenceMode,
    pub doc_number_max_attempts: u32,
}

impl AppState {
    /// Current time in the clinic's local offset.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.clinic_offset)
    }
}

/* -------------------------
   API DTOs
--------------------------*/

/// Standard success envelope: `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

impl<T> ApiOk<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_name: Option<String>,
    pub remember_me: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
    pub clinic: ClinicProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub clinic: ClinicProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: &'static str,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClinicProfile {
    pub clinic_name: String,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            clinic_name: "Clinic".to_string(),
            clinic_address: None,
            clinic_phone: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: i16,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   Helpers
--------------------------*/

pub const ROLE_ADMIN: i16 = 1;
pub const ROLE_DOCTOR: i16 = 2;
pub const ROLE_RECEPTIONIST: i16 = 3;

/// staff_user.role: 1 admin, 2 doctor, 3 receptionist
pub fn role_name(role: i16) -> &'static str {
    match role {
        ROLE_ADMIN => "admin",
        ROLE_DOCTOR => "doctor",
        ROLE_RECEPTIONIST => "receptionist",
        _ => "unknown",
    }
}

pub async fn load_clinic_profile(db: &sqlx::PgPool) -> Result<ClinicProfile, sqlx::Error> {
    let row: Option<ClinicProfile> = sqlx::query_as::<_, ClinicProfile>(
        r#"
        SELECT clinic_name, clinic_address, clinic_phone
        FROM clinic_settings
        WHERE singleton_id = TRUE
        "#,
    )
    .fetch_optional(db)
    .await?;

    Ok(row.unwrap_or_default())
}
