use crate::error::ApiError;
use crate::models::AppState;
use axum::Router;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub mod auth_routes;
pub mod clinic_routes;
pub mod course_routes;
pub mod document_routes;
pub mod note_routes;
pub mod patient_routes;
pub mod stats_routes;
pub mod tool_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1", clinic_routes::router())
        .nest("/api/v1", patient_routes::router())
        .nest("/api/v1", note_routes::router())
        .nest("/api/v1", course_routes::router())
        .nest("/api/v1", document_routes::router())
        .nest("/api/v1", stats_routes::router())
        .nest("/api/v1", tool_routes::router())
        .with_state(state)
}

/// Money from the API (baht, up to 2 dp) to the satang integers stored in DB.
pub fn to_satang(amount: Decimal) -> Result<i64, ApiError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ApiError::validation("amount must not be negative"));
    }
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|s| s.to_i64())
        .ok_or_else(|| ApiError::validation("amount is too large"))
}

pub fn from_satang(satang: i64) -> Decimal {
    Decimal::new(satang, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satang_conversion() {
        assert_eq!(to_satang("12.34".parse().unwrap()).unwrap(), 1234);
        assert_eq!(to_satang("0.005".parse().unwrap()).unwrap(), 1);
        assert_eq!(to_satang(Decimal::ZERO).unwrap(), 0);
        assert!(to_satang("-0.01".parse().unwrap()).is_err());
        assert_eq!(from_satang(1234).to_string(), "12.34");
    }
}
