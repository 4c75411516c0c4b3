// service/payout_account_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{payout_accountdb::PayoutAccountExt, userdb::UserExt},
    models::paymentmodel::PayoutAccount,
    service::{
        error::ServiceError,
        stripe_gateway::{ExternalBankAccount, PaymentGateway},
    },
};

#[derive(Debug, Serialize)]
pub struct PayoutStatus {
    pub external_account_id: String,
    pub payouts_enabled: bool,
    pub bank_accounts_available: bool,
    // Present while the worker still has onboarding details to submit.
    pub onboarding_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPayoutAccount {
    pub account: PayoutAccount,
    pub onboarding_url: String,
}

pub struct PayoutAccountService<L> {
    ledger: Arc<L>,
    gateway: Arc<dyn PaymentGateway>,
    app_url: String,
}

impl<L> PayoutAccountService<L>
where
    L: PayoutAccountExt + UserExt + Send + Sync,
{
    pub fn new(ledger: Arc<L>, gateway: Arc<dyn PaymentGateway>, app_url: String) -> Self {
        Self {
            ledger,
            gateway,
            app_url,
        }
    }

    /// Create (or re-link) the worker's external payout account and return an
    /// onboarding link for them to complete account details.
    pub async fn create_account(
        &self,
        user_id: Uuid,
    ) -> Result<CreatedPayoutAccount, ServiceError> {
        let user = self
            .ledger
            .get_user(Some(user_id), None)
            .await?
            .ok_or(ServiceError::Validation("User not found".to_string()))?;

        // Re-use an already-created external account instead of leaking a
        // second one for the same worker.
        let external_account_id = match self.ledger.get_payout_account(user_id).await? {
            Some(existing) => existing.external_account_id,
            None => self.gateway.create_account(&user.email).await?,
        };

        let account = self
            .ledger
            .upsert_payout_account(user_id, &external_account_id)
            .await?;

        let onboarding_url = self.onboarding_link(&external_account_id).await?;

        tracing::info!(
            "Payout account {} ready for user {}",
            external_account_id,
            user_id
        );

        Ok(CreatedPayoutAccount {
            account,
            onboarding_url,
        })
    }

    /// Live eligibility check against the processor. Cached flags are written
    /// back only when they actually changed.
    pub async fn check_status(&self, user_id: Uuid) -> Result<PayoutStatus, ServiceError> {
        let cached = self
            .ledger
            .get_payout_account(user_id)
            .await?
            .ok_or(ServiceError::PayoutAccountMissing(user_id))?;

        let live = self
            .gateway
            .retrieve_account(&cached.external_account_id)
            .await?;

        let payouts_enabled = live.payouts_enabled;
        let bank_accounts_available = !live.bank_accounts.is_empty();

        if cached.payouts_enabled.unwrap_or(false) != payouts_enabled
            || cached.bank_accounts_available.unwrap_or(false) != bank_accounts_available
        {
            self.ledger
                .update_payout_flags(user_id, payouts_enabled, bank_accounts_available)
                .await?;
            tracing::info!(
                "Payout eligibility for user {} changed: payouts_enabled={}, bank_accounts_available={}",
                user_id,
                payouts_enabled,
                bank_accounts_available
            );
        }

        let onboarding_url = if !live.details_submitted {
            Some(self.onboarding_link(&cached.external_account_id).await?)
        } else {
            None
        };

        Ok(PayoutStatus {
            external_account_id: cached.external_account_id,
            payouts_enabled,
            bank_accounts_available,
            onboarding_url,
        })
    }

    /// Refresh the cached projection for an account-lifecycle webhook event.
    pub async fn refresh_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<(), ServiceError> {
        let Some(cached) = self
            .ledger
            .get_payout_account_by_external_id(external_account_id)
            .await?
        else {
            tracing::warn!(
                "Received account event for unknown payout account {}",
                external_account_id
            );
            return Ok(());
        };

        self.check_status(cached.user_id).await?;
        Ok(())
    }

    pub async fn attach_bank_account(
        &self,
        user_id: Uuid,
        bank_token: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let account = self.require_account(user_id).await?;

        let bank = self
            .gateway
            .attach_bank_account(&account.external_account_id, bank_token)
            .await?;

        if !account.bank_accounts_available.unwrap_or(false) {
            self.ledger
                .update_payout_flags(user_id, account.payouts_enabled.unwrap_or(false), true)
                .await?;
        }

        Ok(bank)
    }

    pub async fn list_bank_accounts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ExternalBankAccount>, ServiceError> {
        let account = self.require_account(user_id).await?;
        self.gateway
            .list_bank_accounts(&account.external_account_id)
            .await
    }

    pub async fn set_default_bank_account(
        &self,
        user_id: Uuid,
        bank_account_id: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let account = self.require_account(user_id).await?;
        self.gateway
            .set_default_bank_account(&account.external_account_id, bank_account_id)
            .await
    }

    /// Detach a bank account. Removing the last one clears the cached
    /// bank_accounts_available flag.
    pub async fn remove_bank_account(
        &self,
        user_id: Uuid,
        bank_account_id: &str,
    ) -> Result<(), ServiceError> {
        let account = self.require_account(user_id).await?;

        self.gateway
            .remove_bank_account(&account.external_account_id, bank_account_id)
            .await?;

        let remaining = self
            .gateway
            .list_bank_accounts(&account.external_account_id)
            .await?;

        if remaining.is_empty() && account.bank_accounts_available.unwrap_or(false) {
            self.ledger
                .update_payout_flags(user_id, account.payouts_enabled.unwrap_or(false), false)
                .await?;
        }

        Ok(())
    }

    async fn require_account(&self, user_id: Uuid) -> Result<PayoutAccount, ServiceError> {
        self.ledger
            .get_payout_account(user_id)
            .await?
            .ok_or(ServiceError::PayoutAccountMissing(user_id))
    }

    async fn onboarding_link(&self, external_account_id: &str) -> Result<String, ServiceError> {
        let refresh_url = format!("{}/payout-accounts/onboarding/refresh", self.app_url);
        let return_url = format!("{}/payout-accounts/onboarding/complete", self.app_url);
        self.gateway
            .create_account_link(external_account_id, &refresh_url, &return_url)
            .await
    }
}
