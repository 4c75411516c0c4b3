// db/jobdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

#[async_trait]
pub trait JobExt {
    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn update_job_payment_status(
        &self,
        job_id: Uuid,
        payment_status: JobPaymentStatus,
    ) -> Result<Job, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT
                id,
                poster_id,
                worker_id,
                title,
                payment_amount,
                service_fee,
                total_amount,
                payment_type,
                payment_status,
                status,
                created_at,
                updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_job_payment_status(
        &self,
        job_id: Uuid,
        payment_status: JobPaymentStatus,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                poster_id,
                worker_id,
                title,
                payment_amount,
                service_fee,
                total_amount,
                payment_type,
                payment_status,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(job_id)
        .bind(payment_status)
        .fetch_one(&self.pool)
        .await
    }
}
