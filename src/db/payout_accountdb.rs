// db/payout_accountdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::PayoutAccount;

const PAYOUT_ACCOUNT_COLUMNS: &str = r#"
    id,
    user_id,
    external_account_id,
    payouts_enabled,
    bank_accounts_available,
    last_checked_at,
    created_at
"#;

#[async_trait]
pub trait PayoutAccountExt {
    async fn get_payout_account(&self, user_id: Uuid) -> Result<Option<PayoutAccount>, Error>;

    async fn get_payout_account_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<PayoutAccount>, Error>;

    async fn upsert_payout_account(
        &self,
        user_id: Uuid,
        external_account_id: &str,
    ) -> Result<PayoutAccount, Error>;

    async fn update_payout_flags(
        &self,
        user_id: Uuid,
        payouts_enabled: bool,
        bank_accounts_available: bool,
    ) -> Result<PayoutAccount, Error>;
}

#[async_trait]
impl PayoutAccountExt for DBClient {
    async fn get_payout_account(&self, user_id: Uuid) -> Result<Option<PayoutAccount>, Error> {
        sqlx::query_as::<_, PayoutAccount>(&format!(
            r#"
            SELECT {PAYOUT_ACCOUNT_COLUMNS}
            FROM payout_accounts
            WHERE user_id = $1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payout_account_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<PayoutAccount>, Error> {
        sqlx::query_as::<_, PayoutAccount>(&format!(
            r#"
            SELECT {PAYOUT_ACCOUNT_COLUMNS}
            FROM payout_accounts
            WHERE external_account_id = $1
            "#
        ))
        .bind(external_account_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_payout_account(
        &self,
        user_id: Uuid,
        external_account_id: &str,
    ) -> Result<PayoutAccount, Error> {
        sqlx::query_as::<_, PayoutAccount>(&format!(
            r#"
            INSERT INTO payout_accounts (user_id, external_account_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET external_account_id = EXCLUDED.external_account_id
            RETURNING {PAYOUT_ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(external_account_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_payout_flags(
        &self,
        user_id: Uuid,
        payouts_enabled: bool,
        bank_accounts_available: bool,
    ) -> Result<PayoutAccount, Error> {
        sqlx::query_as::<_, PayoutAccount>(&format!(
            r#"
            UPDATE payout_accounts
            SET payouts_enabled = $2,
                bank_accounts_available = $3,
                last_checked_at = NOW()
            WHERE user_id = $1
            RETURNING {PAYOUT_ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(payouts_enabled)
        .bind(bank_accounts_available)
        .fetch_one(&self.pool)
        .await
    }
}
