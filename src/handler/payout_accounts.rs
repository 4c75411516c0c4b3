// handler/payout_accounts.rs
use std::sync::Arc;

use axum::{extract::Path, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::{
    dtos::{paymentdtos::ApiResponse, payoutdtos::*},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

/// POST /api/payout-accounts
pub async fn create_payout_account(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let created = app_state
        .payout_account_service
        .create_account(auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: PayoutAccountResponseDto = created.into();
    Ok(Json(ApiResponse::success(
        "Payout account ready",
        response,
    )))
}

/// GET /api/payout-accounts/status
pub async fn get_payout_account_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .payout_account_service
        .check_status(auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: PayoutAccountResponseDto = status.into();
    Ok(Json(ApiResponse::success(
        "Payout account status retrieved",
        response,
    )))
}

/// POST /api/payout-accounts/bank-accounts
pub async fn add_bank_account(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<AddBankAccountDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bank = app_state
        .payout_account_service
        .attach_bank_account(auth.user.id, &body.token)
        .await
        .map_err(HttpError::from)?;

    let response: BankAccountResponseDto = bank.into();
    Ok(Json(ApiResponse::success(
        "Bank account added successfully",
        response,
    )))
}

/// GET /api/payout-accounts/bank-accounts
pub async fn get_bank_accounts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let banks = app_state
        .payout_account_service
        .list_bank_accounts(auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: Vec<BankAccountResponseDto> = banks.into_iter().map(|b| b.into()).collect();
    Ok(Json(ApiResponse::success(
        "Bank accounts retrieved successfully",
        response,
    )))
}

/// PUT /api/payout-accounts/bank-accounts/:bank_account_id/default
pub async fn set_default_bank_account(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(bank_account_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let bank = app_state
        .payout_account_service
        .set_default_bank_account(auth.user.id, &bank_account_id)
        .await
        .map_err(HttpError::from)?;

    let response: BankAccountResponseDto = bank.into();
    Ok(Json(ApiResponse::success(
        "Default bank account set successfully",
        response,
    )))
}

/// DELETE /api/payout-accounts/bank-accounts/:bank_account_id
pub async fn remove_bank_account(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(bank_account_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .payout_account_service
        .remove_bank_account(auth.user.id, &bank_account_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Bank account removed successfully",
        (),
    )))
}
