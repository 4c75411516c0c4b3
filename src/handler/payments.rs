// handler/payments.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::earningdb::EarningExt,
    dtos::paymentdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

/// POST /api/payments/intents
pub async fn create_payment_intent(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreatePaymentIntentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .payment_intent_service
        .create_or_reuse(body.job_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response = PaymentIntentResponseDto {
        client_secret: outcome.client_secret,
        payment_id: outcome.payment_id,
        reused: outcome.reused,
    };

    Ok(Json(ApiResponse::success(
        "Payment intent ready",
        response,
    )))
}

/// POST /api/payments/intents/:payment_id/confirm
pub async fn confirm_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (payment, settlement) = app_state
        .settlement_service
        .confirm_payment(payment_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response = ConfirmPaymentResponseDto {
        success: true,
        payment: payment.into(),
        settlement: settlement.map(|s| s.into()),
    };

    Ok(Json(ApiResponse::success("Payment confirmed", response)))
}

/// GET /api/payments/earnings — the authenticated worker's earnings feed.
pub async fn get_my_earnings(
    Query(params): Query<EarningsQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let limit = params.limit.unwrap_or(20);
    let offset = params.offset.unwrap_or(0);

    let earnings = app_state
        .db_client
        .get_earnings_for_worker(auth.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<EarningResponseDto> = earnings.into_iter().map(|e| e.into()).collect();

    Ok(Json(ApiResponse::success(
        "Earnings retrieved successfully",
        response,
    )))
}

/// PATCH /api/payments/earnings/:earning_id — manual paid/cancelled override.
pub async fn update_earning_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(earning_id): Path<Uuid>,
    Json(body): Json<UpdateEarningStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let earning = app_state
        .settlement_service
        .override_earning_status(earning_id, auth.user.id, body.status)
        .await
        .map_err(HttpError::from)?;

    let response: EarningResponseDto = earning.into();
    Ok(Json(ApiResponse::success(
        "Earning status updated",
        response,
    )))
}
