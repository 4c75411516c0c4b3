// service/stripe_gateway.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::Config, service::error::ServiceError};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Processing,
    Succeeded,
    Canceled,
    Unknown,
}

impl IntentStatus {
    pub fn from_str(status: &str) -> Self {
        match status {
            "requires_payment_method" => IntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => IntentStatus::RequiresConfirmation,
            "requires_action" => IntentStatus::RequiresAction,
            "requires_capture" => IntentStatus::RequiresCapture,
            "processing" => IntentStatus::Processing,
            "succeeded" => IntentStatus::Succeeded,
            "canceled" => IntentStatus::Canceled,
            _ => IntentStatus::Unknown,
        }
    }

    // An intent the client can still complete; anything else means a fresh
    // intent is needed.
    pub fn is_reusable(&self) -> bool {
        matches!(
            self,
            IntentStatus::RequiresPaymentMethod
                | IntentStatus::RequiresConfirmation
                | IntentStatus::RequiresAction
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeIntent {
    pub id: String,
    pub client_secret: String,
    pub status: IntentStatus,
    pub amount: i64, // in cents
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalBankAccount {
    pub id: String,
    pub bank_name: Option<String>,
    pub last4: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectAccount {
    pub id: String,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
    pub bank_accounts: Vec<ExternalBankAccount>,
}

/// Client interface for the payment processor. Every component receives it
/// injected so tests can substitute a fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge_intent(
        &self,
        amount: i64,
        metadata: &[(&str, String)],
    ) -> Result<ChargeIntent, ServiceError>;

    async fn retrieve_charge_intent(&self, intent_id: &str) -> Result<ChargeIntent, ServiceError>;

    async fn create_transfer(
        &self,
        amount: i64,
        destination: &str,
        metadata: &[(&str, String)],
    ) -> Result<TransferRecord, ServiceError>;

    async fn create_account(&self, email: &str) -> Result<String, ServiceError>;

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, ServiceError>;

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, ServiceError>;

    async fn attach_bank_account(
        &self,
        account_id: &str,
        bank_token: &str,
    ) -> Result<ExternalBankAccount, ServiceError>;

    async fn list_bank_accounts(
        &self,
        account_id: &str,
    ) -> Result<Vec<ExternalBankAccount>, ServiceError>;

    async fn set_default_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<ExternalBankAccount, ServiceError>;

    async fn remove_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<(), ServiceError>;
}

pub struct StripeGateway {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            secret_key: config.stripe_secret_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(format!("{}{}", STRIPE_API_BASE, path))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        Self::check_error(body)
    }

    async fn get(&self, path: &str) -> Result<Value, ServiceError> {
        let response = self
            .client
            .get(format!("{}{}", STRIPE_API_BASE, path))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        Self::check_error(body)
    }

    async fn delete(&self, path: &str) -> Result<Value, ServiceError> {
        let response = self
            .client
            .delete(format!("{}{}", STRIPE_API_BASE, path))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        Self::check_error(body)
    }

    fn check_error(body: Value) -> Result<Value, ServiceError> {
        if let Some(error) = body.get("error") {
            let message = error["message"]
                .as_str()
                .unwrap_or("Unknown payment processor error");
            return Err(ServiceError::ExternalService(message.to_string()));
        }
        Ok(body)
    }

    fn metadata_params(metadata: &[(&str, String)]) -> Vec<(String, String)> {
        metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{}]", key), value.clone()))
            .collect()
    }

    fn parse_intent(body: &Value) -> ChargeIntent {
        ChargeIntent {
            id: body["id"].as_str().unwrap_or("").to_string(),
            client_secret: body["client_secret"].as_str().unwrap_or("").to_string(),
            status: IntentStatus::from_str(body["status"].as_str().unwrap_or("")),
            amount: body["amount"].as_i64().unwrap_or(0),
        }
    }

    fn parse_bank_account(body: &Value) -> ExternalBankAccount {
        ExternalBankAccount {
            id: body["id"].as_str().unwrap_or("").to_string(),
            bank_name: body["bank_name"].as_str().map(|s| s.to_string()),
            last4: body["last4"].as_str().map(|s| s.to_string()),
            is_default: body["default_for_currency"].as_bool().unwrap_or(false),
        }
    }

    fn parse_account(body: &Value) -> ConnectAccount {
        let bank_accounts = body["external_accounts"]["data"]
            .as_array()
            .map(|accounts| accounts.iter().map(Self::parse_bank_account).collect())
            .unwrap_or_default();

        ConnectAccount {
            id: body["id"].as_str().unwrap_or("").to_string(),
            payouts_enabled: body["payouts_enabled"].as_bool().unwrap_or(false),
            details_submitted: body["details_submitted"].as_bool().unwrap_or(false),
            bank_accounts,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_charge_intent(
        &self,
        amount: i64,
        metadata: &[(&str, String)],
    ) -> Result<ChargeIntent, ServiceError> {
        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), "usd".to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        params.extend(Self::metadata_params(metadata));

        let body = self.post_form("/payment_intents", &params).await?;
        Ok(Self::parse_intent(&body))
    }

    async fn retrieve_charge_intent(&self, intent_id: &str) -> Result<ChargeIntent, ServiceError> {
        let body = self
            .get(&format!("/payment_intents/{}", intent_id))
            .await?;
        Ok(Self::parse_intent(&body))
    }

    async fn create_transfer(
        &self,
        amount: i64,
        destination: &str,
        metadata: &[(&str, String)],
    ) -> Result<TransferRecord, ServiceError> {
        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("destination".to_string(), destination.to_string()),
        ];
        params.extend(Self::metadata_params(metadata));

        let body = self.post_form("/transfers", &params).await?;
        Ok(TransferRecord {
            id: body["id"].as_str().unwrap_or("").to_string(),
            amount: body["amount"].as_i64().unwrap_or(amount),
        })
    }

    async fn create_account(&self, email: &str) -> Result<String, ServiceError> {
        let params = vec![
            ("type".to_string(), "express".to_string()),
            ("email".to_string(), email.to_string()),
            (
                "capabilities[transfers][requested]".to_string(),
                "true".to_string(),
            ),
        ];

        let body = self.post_form("/accounts", &params).await?;
        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ServiceError::ExternalService("Missing account id".to_string()))
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, ServiceError> {
        let params = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];

        let body = self.post_form("/account_links", &params).await?;
        body["url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ServiceError::ExternalService("Missing onboarding url".to_string()))
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, ServiceError> {
        let body = self.get(&format!("/accounts/{}", account_id)).await?;
        Ok(Self::parse_account(&body))
    }

    async fn attach_bank_account(
        &self,
        account_id: &str,
        bank_token: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let params = vec![("external_account".to_string(), bank_token.to_string())];

        let body = self
            .post_form(&format!("/accounts/{}/external_accounts", account_id), &params)
            .await?;
        Ok(Self::parse_bank_account(&body))
    }

    async fn list_bank_accounts(
        &self,
        account_id: &str,
    ) -> Result<Vec<ExternalBankAccount>, ServiceError> {
        let body = self
            .get(&format!(
                "/accounts/{}/external_accounts?object=bank_account",
                account_id
            ))
            .await?;

        Ok(body["data"]
            .as_array()
            .map(|accounts| accounts.iter().map(Self::parse_bank_account).collect())
            .unwrap_or_default())
    }

    async fn set_default_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let params = vec![("default_for_currency".to_string(), "true".to_string())];

        let body = self
            .post_form(
                &format!("/accounts/{}/external_accounts/{}", account_id, bank_account_id),
                &params,
            )
            .await?;
        Ok(Self::parse_bank_account(&body))
    }

    async fn remove_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<(), ServiceError> {
        self.delete(&format!(
            "/accounts/{}/external_accounts/{}",
            account_id, bank_account_id
        ))
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_status_reusable() {
        assert!(IntentStatus::RequiresPaymentMethod.is_reusable());
        assert!(IntentStatus::RequiresConfirmation.is_reusable());
        assert!(IntentStatus::RequiresAction.is_reusable());
        assert!(!IntentStatus::Succeeded.is_reusable());
        assert!(!IntentStatus::Processing.is_reusable());
        assert!(!IntentStatus::Canceled.is_reusable());
    }

    #[test]
    fn test_parse_account_with_bank_accounts() {
        let body = json!({
            "id": "acct_123",
            "payouts_enabled": true,
            "details_submitted": true,
            "external_accounts": {
                "data": [
                    {"id": "ba_1", "bank_name": "STRIPE TEST BANK", "last4": "6789", "default_for_currency": true}
                ]
            }
        });

        let account = StripeGateway::parse_account(&body);
        assert_eq!(account.id, "acct_123");
        assert!(account.payouts_enabled);
        assert_eq!(account.bank_accounts.len(), 1);
        assert!(account.bank_accounts[0].is_default);
    }

    #[test]
    fn test_check_error_surfaces_processor_message() {
        let body = json!({"error": {"message": "No such payment_intent"}});
        let err = StripeGateway::check_error(body).unwrap_err();
        assert!(matches!(err, ServiceError::ExternalService(_)));
    }
}
