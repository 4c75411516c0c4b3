use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_payment_status", rename_all = "snake_case")]
pub enum JobPaymentStatus {
    Unpaid,
    Paid,
    PaymentFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_payment_type", rename_all = "snake_case")]
pub enum JobPaymentType {
    Fixed,
    Hourly,
}

// Jobs are owned by the job-management side of the platform. The payment
// engine reads them and writes payment_status only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub poster_id: Uuid,
    pub worker_id: Option<Uuid>,
    pub title: String,
    // All amounts in cents. total_amount = payment_amount + service_fee.
    pub payment_amount: i64,
    pub service_fee: i64,
    pub total_amount: i64,
    pub payment_type: JobPaymentType,
    pub payment_status: Option<JobPaymentStatus>, // Database has DEFAULT 'unpaid', can be NULL
    pub status: Option<JobStatus>,                // Database has DEFAULT 'open', can be NULL
    pub created_at: Option<DateTime<Utc>>,        // Database has DEFAULT NOW(), can be NULL
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn amounts_consistent(&self) -> bool {
        self.total_amount == self.payment_amount + self.service_fee
    }
}
