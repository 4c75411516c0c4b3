// dtos/paymentdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::paymentmodel::*,
    service::settlement_service::SettlementResult,
    utils::currency::cents_to_dollars,
};

// Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentIntentDto {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentResponseDto {
    pub client_secret: String,
    pub payment_id: Uuid,
    pub reused: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponseDto {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub job_id: Option<Uuid>,
    pub amount: f64, // In dollars
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EarningResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub amount: f64,
    pub service_fee: f64,
    pub net_amount: f64,
    pub status: EarningStatus,
    pub date_earned: Option<DateTime<Utc>>,
    pub date_paid: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementResponseDto {
    pub earning: EarningResponseDto,
    pub transferred: bool,
    pub already_settled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmPaymentResponseDto {
    pub success: bool,
    pub payment: PaymentResponseDto,
    pub settlement: Option<SettlementResponseDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEarningStatusDto {
    pub status: EarningStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EarningsQueryDto {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must be non-negative"))]
    pub offset: Option<i64>,
}

// Conversion helpers
impl From<Payment> for PaymentResponseDto {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            payment_type: payment.payment_type,
            status: payment.status.unwrap_or(PaymentStatus::Pending),
            job_id: payment.job_id,
            amount: cents_to_dollars(payment.amount),
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            created_at: payment.created_at,
        }
    }
}

impl From<Earning> for EarningResponseDto {
    fn from(earning: Earning) -> Self {
        Self {
            id: earning.id,
            job_id: earning.job_id,
            worker_id: earning.worker_id,
            amount: cents_to_dollars(earning.amount),
            service_fee: cents_to_dollars(earning.service_fee),
            net_amount: cents_to_dollars(earning.net_amount),
            status: earning.status.unwrap_or(EarningStatus::Pending),
            date_earned: earning.date_earned,
            date_paid: earning.date_paid,
        }
    }
}

impl From<SettlementResult> for SettlementResponseDto {
    fn from(result: SettlementResult) -> Self {
        Self {
            earning: result.earning.into(),
            transferred: result.transferred,
            already_settled: result.already_settled,
        }
    }
}
