// db/earningdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

const EARNING_COLUMNS: &str = r#"
    id,
    job_id,
    worker_id,
    amount,
    service_fee,
    net_amount,
    status,
    date_earned,
    date_paid
"#;

#[async_trait]
pub trait EarningExt {
    // Atomically create the earning unless a non-cancelled one already exists
    // for (job_id, worker_id). Relies on the partial unique index
    //   earnings_job_worker_live_idx ON earnings (job_id, worker_id)
    //   WHERE status <> 'cancelled'
    // so two racing callers can never both insert. Returns the surviving row
    // and whether this call created it.
    async fn insert_earning_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        amount: i64,
        service_fee: i64,
        net_amount: i64,
    ) -> Result<(Earning, bool), Error>;

    async fn get_earning_by_id(&self, earning_id: Uuid) -> Result<Option<Earning>, Error>;

    async fn get_earnings_for_job(&self, job_id: Uuid) -> Result<Vec<Earning>, Error>;

    async fn get_earnings_for_worker(
        &self,
        worker_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Earning>, Error>;

    async fn update_earning_status(
        &self,
        earning_id: Uuid,
        status: EarningStatus,
    ) -> Result<Earning, Error>;

    async fn mark_earning_paid(&self, earning_id: Uuid) -> Result<Earning, Error>;
}

#[async_trait]
impl EarningExt for DBClient {
    async fn insert_earning_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        amount: i64,
        service_fee: i64,
        net_amount: i64,
    ) -> Result<(Earning, bool), Error> {
        let inserted = sqlx::query_as::<_, Earning>(&format!(
            r#"
            INSERT INTO earnings (job_id, worker_id, amount, service_fee, net_amount)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id, worker_id) WHERE status <> 'cancelled'
            DO NOTHING
            RETURNING {EARNING_COLUMNS}
            "#
        ))
        .bind(job_id)
        .bind(worker_id)
        .bind(amount)
        .bind(service_fee)
        .bind(net_amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(earning) = inserted {
            return Ok((earning, true));
        }

        // Conflict: another caller won the insert. Fetch the live row.
        let existing = sqlx::query_as::<_, Earning>(&format!(
            r#"
            SELECT {EARNING_COLUMNS}
            FROM earnings
            WHERE job_id = $1 AND worker_id = $2 AND status <> 'cancelled'
            "#
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((existing, false))
    }

    async fn get_earning_by_id(&self, earning_id: Uuid) -> Result<Option<Earning>, Error> {
        sqlx::query_as::<_, Earning>(&format!(
            r#"
            SELECT {EARNING_COLUMNS}
            FROM earnings
            WHERE id = $1
            "#
        ))
        .bind(earning_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_earnings_for_job(&self, job_id: Uuid) -> Result<Vec<Earning>, Error> {
        sqlx::query_as::<_, Earning>(&format!(
            r#"
            SELECT {EARNING_COLUMNS}
            FROM earnings
            WHERE job_id = $1
            ORDER BY date_earned DESC
            "#
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_earnings_for_worker(
        &self,
        worker_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Earning>, Error> {
        sqlx::query_as::<_, Earning>(&format!(
            r#"
            SELECT {EARNING_COLUMNS}
            FROM earnings
            WHERE worker_id = $1
            ORDER BY date_earned DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(worker_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_earning_status(
        &self,
        earning_id: Uuid,
        status: EarningStatus,
    ) -> Result<Earning, Error> {
        sqlx::query_as::<_, Earning>(&format!(
            r#"
            UPDATE earnings
            SET status = $2
            WHERE id = $1
            RETURNING {EARNING_COLUMNS}
            "#
        ))
        .bind(earning_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_earning_paid(&self, earning_id: Uuid) -> Result<Earning, Error> {
        sqlx::query_as::<_, Earning>(&format!(
            r#"
            UPDATE earnings
            SET status = 'paid', date_paid = NOW()
            WHERE id = $1
            RETURNING {EARNING_COLUMNS}
            "#
        ))
        .bind(earning_id)
        .fetch_one(&self.pool)
        .await
    }
}
