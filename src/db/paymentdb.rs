// db/paymentdb.rs
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

const PAYMENT_COLUMNS: &str = r#"
    id,
    payment_type,
    status,
    job_id,
    user_id,
    amount,
    payment_method,
    transaction_id,
    metadata,
    created_at,
    updated_at
"#;

#[async_trait]
pub trait PaymentExt {
    async fn create_payment(
        &self,
        payment_type: PaymentType,
        status: PaymentStatus,
        job_id: Option<Uuid>,
        user_id: Uuid,
        amount: i64,
        payment_method: Option<String>,
        transaction_id: Option<String>,
        metadata: Option<JsonValue>,
    ) -> Result<Payment, Error>;

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, Error>;

    // Open (pending/processing) payments the user holds against a job,
    // newest first. Used for charge-intent reuse.
    async fn get_open_payments_for_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Payment>, Error>;

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(
        &self,
        payment_type: PaymentType,
        status: PaymentStatus,
        job_id: Option<Uuid>,
        user_id: Uuid,
        amount: i64,
        payment_method: Option<String>,
        transaction_id: Option<String>,
        metadata: Option<JsonValue>,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
            (payment_type, status, job_id, user_id, amount, payment_method, transaction_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_type)
        .bind(status)
        .bind(job_id)
        .bind(user_id)
        .bind(amount)
        .bind(payment_method)
        .bind(transaction_id)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE id = $1
            "#
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE transaction_id = $1
            "#
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_open_payments_for_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE job_id = $1
              AND user_id = $2
              AND status IN ('pending', 'processing')
            ORDER BY created_at DESC
            "#
        ))
        .bind(job_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }
}
