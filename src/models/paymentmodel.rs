// models/paymentmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
pub enum PaymentType {
    JobPayment,
    JobPaymentUpfront,
    Payout,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Canceled
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "earning_status", rename_all = "snake_case")]
pub enum EarningStatus {
    Pending,
    Processing,
    Paid,
    Cancelled,
}

impl EarningStatus {
    // Earnings only move forward; cancellation is allowed from any
    // non-terminal state.
    pub fn can_transition_to(&self, next: EarningStatus) -> bool {
        match (self, next) {
            (EarningStatus::Pending, EarningStatus::Processing) => true,
            (EarningStatus::Pending, EarningStatus::Paid) => true,
            (EarningStatus::Pending, EarningStatus::Cancelled) => true,
            (EarningStatus::Processing, EarningStatus::Paid) => true,
            (EarningStatus::Processing, EarningStatus::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub status: Option<PaymentStatus>, // Database has DEFAULT 'pending', can be NULL
    pub job_id: Option<Uuid>,
    pub user_id: Uuid,
    pub amount: i64, // in cents
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>, // External charge-intent id, unique when present
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Earning {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub amount: i64,      // gross, in cents
    pub service_fee: i64, // in cents
    pub net_amount: i64,  // amount - service_fee
    pub status: Option<EarningStatus>, // Database has DEFAULT 'pending', can be NULL
    pub date_earned: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
    pub date_paid: Option<DateTime<Utc>>,
}

impl Earning {
    pub fn is_cancelled(&self) -> bool {
        self.status == Some(EarningStatus::Cancelled)
    }
}

// Cached projection of the worker's external payout account. Refreshed by
// the payout account service, read-only everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayoutAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_account_id: String,
    pub payouts_enabled: Option<bool>,         // Database has DEFAULT FALSE, can be NULL
    pub bank_accounts_available: Option<bool>, // Database has DEFAULT FALSE, can be NULL
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}
