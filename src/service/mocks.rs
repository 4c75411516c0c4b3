// service/mocks.rs
//
// Scriptable stand-in for the payment processor, shared by the service tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::service::error::ServiceError;
use crate::service::stripe_gateway::*;

#[derive(Default)]
pub struct MockGateway {
    pub intents: Mutex<HashMap<String, ChargeIntent>>,
    pub accounts: Mutex<HashMap<String, ConnectAccount>>,
    pub transfers: Mutex<Vec<TransferRecord>>,
    fail_intents: AtomicBool,
    fail_transfers: AtomicBool,
    transfer_delay_ms: AtomicU64,
    next_id: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn seed_account(
        &self,
        payouts_enabled: bool,
        details_submitted: bool,
        bank_count: usize,
    ) -> String {
        let id = self.next("acct");
        let bank_accounts = (0..bank_count)
            .map(|i| ExternalBankAccount {
                id: self.next("ba"),
                bank_name: Some("MOCK BANK".to_string()),
                last4: Some("6789".to_string()),
                is_default: i == 0,
            })
            .collect();
        self.accounts.lock().unwrap().insert(
            id.clone(),
            ConnectAccount {
                id: id.clone(),
                payouts_enabled,
                details_submitted,
                bank_accounts,
            },
        );
        id
    }

    pub fn seed_incomplete_account(&self) -> String {
        self.seed_account(false, false, 0)
    }

    pub fn set_payouts_enabled(&self, enabled: bool) {
        for account in self.accounts.lock().unwrap().values_mut() {
            account.payouts_enabled = enabled;
        }
    }

    pub fn set_intent_status(&self, intent_id: &str, status: IntentStatus) {
        if let Some(intent) = self.intents.lock().unwrap().get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn fail_intents(&self, fail: bool) {
        self.fail_intents.store(fail, Ordering::SeqCst);
    }

    pub fn fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    pub fn set_transfer_delay_ms(&self, delay: u64) {
        self.transfer_delay_ms.store(delay, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_charge_intent(
        &self,
        amount: i64,
        _metadata: &[(&str, String)],
    ) -> Result<ChargeIntent, ServiceError> {
        if self.fail_intents.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalService(
                "connection reset by peer".to_string(),
            ));
        }
        let id = self.next("pi");
        let intent = ChargeIntent {
            client_secret: format!("{}_secret", id),
            id: id.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            amount,
        };
        self.intents.lock().unwrap().insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_charge_intent(&self, intent_id: &str) -> Result<ChargeIntent, ServiceError> {
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::ExternalService(format!("No such payment_intent: {}", intent_id))
            })
    }

    async fn create_transfer(
        &self,
        amount: i64,
        _destination: &str,
        _metadata: &[(&str, String)],
    ) -> Result<TransferRecord, ServiceError> {
        let delay = self.transfer_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalService(
                "transfer temporarily unavailable".to_string(),
            ));
        }
        let transfer = TransferRecord {
            id: self.next("tr"),
            amount,
        };
        self.transfers.lock().unwrap().push(transfer.clone());
        Ok(transfer)
    }

    async fn create_account(&self, _email: &str) -> Result<String, ServiceError> {
        Ok(self.seed_incomplete_account())
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<String, ServiceError> {
        Ok(format!("https://onboarding.mock/{}", account_id))
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, ServiceError> {
        self.accounts
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::ExternalService(format!("No such account: {}", account_id))
            })
    }

    async fn attach_bank_account(
        &self,
        account_id: &str,
        _bank_token: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(account_id).ok_or_else(|| {
            ServiceError::ExternalService(format!("No such account: {}", account_id))
        })?;
        let bank = ExternalBankAccount {
            id: self.next("ba"),
            bank_name: Some("MOCK BANK".to_string()),
            last4: Some("4242".to_string()),
            is_default: account.bank_accounts.is_empty(),
        };
        account.bank_accounts.push(bank.clone());
        Ok(bank)
    }

    async fn list_bank_accounts(
        &self,
        account_id: &str,
    ) -> Result<Vec<ExternalBankAccount>, ServiceError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(account_id)
            .map(|a| a.bank_accounts.clone())
            .unwrap_or_default())
    }

    async fn set_default_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<ExternalBankAccount, ServiceError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(account_id).ok_or_else(|| {
            ServiceError::ExternalService(format!("No such account: {}", account_id))
        })?;
        let mut chosen = None;
        for bank in account.bank_accounts.iter_mut() {
            bank.is_default = bank.id == bank_account_id;
            if bank.is_default {
                chosen = Some(bank.clone());
            }
        }
        chosen.ok_or_else(|| {
            ServiceError::ExternalService(format!("No such bank account: {}", bank_account_id))
        })
    }

    async fn remove_bank_account(
        &self,
        account_id: &str,
        bank_account_id: &str,
    ) -> Result<(), ServiceError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(account_id).ok_or_else(|| {
            ServiceError::ExternalService(format!("No such account: {}", account_id))
        })?;
        account.bank_accounts.retain(|b| b.id != bank_account_id);
        Ok(())
    }
}
