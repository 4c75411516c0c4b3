use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, models::paymentmodel::EarningStatus};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    #[error("Earning {0} not found")]
    EarningNotFound(Uuid),

    #[error("User {0} has no payout account yet")]
    PayoutAccountMissing(Uuid),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    UnauthorizedJobAccess(Uuid, Uuid),

    #[error("User {0} is not authorized to act on payment {1}")]
    UnauthorizedPaymentAccess(Uuid, Uuid),

    #[error("Webhook signature verification failed")]
    InvalidWebhookSignature,

    #[error("Invalid earning status transition: {0:?} -> {1:?}")]
    InvalidEarningTransition(EarningStatus, EarningStatus),

    #[error("Payment processor error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::JobNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::EarningNotFound(_)
            | ServiceError::PayoutAccountMissing(_) => HttpError::not_found(error.to_string()),

            ServiceError::Validation(_)
            | ServiceError::InvalidEarningTransition(_, _) => HttpError::bad_request(error.to_string()),

            ServiceError::UnauthorizedJobAccess(_, _)
            | ServiceError::UnauthorizedPaymentAccess(_, _)
            | ServiceError::InvalidWebhookSignature => HttpError::unauthorized(error.to_string()),

            ServiceError::ExternalService(_) => HttpError::new(
                error.to_string(),
                StatusCode::BAD_GATEWAY,
            ),

            ServiceError::Database(_) => HttpError::server_error(error.to_string()),
        }
    }
}

