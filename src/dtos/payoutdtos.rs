// dtos/payoutdtos.rs
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::service::{
    payout_account_service::{CreatedPayoutAccount, PayoutStatus},
    stripe_gateway::ExternalBankAccount,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutAccountResponseDto {
    pub external_account_id: String,
    pub payouts_enabled: bool,
    pub bank_accounts_available: bool,
    pub onboarding_url: Option<String>,
}

impl From<CreatedPayoutAccount> for PayoutAccountResponseDto {
    fn from(created: CreatedPayoutAccount) -> Self {
        Self {
            external_account_id: created.account.external_account_id,
            payouts_enabled: created.account.payouts_enabled.unwrap_or(false),
            bank_accounts_available: created.account.bank_accounts_available.unwrap_or(false),
            onboarding_url: Some(created.onboarding_url),
        }
    }
}

impl From<PayoutStatus> for PayoutAccountResponseDto {
    fn from(status: PayoutStatus) -> Self {
        Self {
            external_account_id: status.external_account_id,
            payouts_enabled: status.payouts_enabled,
            bank_accounts_available: status.bank_accounts_available,
            onboarding_url: status.onboarding_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddBankAccountDto {
    #[validate(length(min = 1, message = "Bank account token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BankAccountResponseDto {
    pub id: String,
    pub bank_name: Option<String>,
    pub last4: Option<String>,
    pub is_default: bool,
}

impl From<ExternalBankAccount> for BankAccountResponseDto {
    fn from(bank: ExternalBankAccount) -> Self {
        Self {
            id: bank.id,
            bank_name: bank.bank_name,
            last4: bank.last4,
            is_default: bank.is_default,
        }
    }
}
