// db/memory.rs
//
// In-memory ledger used by service tests. Implements the same Ext traits as
// DBClient; the earnings map mirrors the partial unique index on
// (job_id, worker_id) WHERE status <> 'cancelled' by doing the
// check-and-insert under one lock.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::earningdb::EarningExt;
use crate::db::jobdb::JobExt;
use crate::db::paymentdb::PaymentExt;
use crate::db::payout_accountdb::PayoutAccountExt;
use crate::db::userdb::UserExt;
use crate::models::jobmodel::*;
use crate::models::paymentmodel::*;
use crate::models::usermodel::User;

#[derive(Default)]
pub struct MemoryLedger {
    pub jobs: Mutex<HashMap<Uuid, Job>>,
    pub payments: Mutex<HashMap<Uuid, Payment>>,
    pub earnings: Mutex<HashMap<Uuid, Earning>>,
    pub payout_accounts: Mutex<HashMap<Uuid, PayoutAccount>>,
    pub users: Mutex<HashMap<Uuid, User>>,
    // Number of flag writes that reached the store (for the
    // only-write-when-changed tests).
    pub payout_flag_writes: Mutex<u32>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn put_payout_account(&self, account: PayoutAccount) {
        self.payout_accounts
            .lock()
            .unwrap()
            .insert(account.user_id, account);
    }
}

#[async_trait]
impl JobExt for MemoryLedger {
    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn update_job_payment_status(
        &self,
        job_id: Uuid,
        payment_status: JobPaymentStatus,
    ) -> Result<Job, sqlx::Error> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(sqlx::Error::RowNotFound)?;
        job.payment_status = Some(payment_status);
        job.updated_at = Some(Utc::now());
        Ok(job.clone())
    }
}

#[async_trait]
impl PaymentExt for MemoryLedger {
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
    ) -> Result<Payment, sqlx::Error> {
        let payment = Payment {
            id: Uuid::new_v4(),
            payment_type,
            status: Some(status),
            job_id,
            user_id,
            amount,
            payment_method,
            transaction_id,
            metadata,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        Ok(self.payments.lock().unwrap().get(&payment_id).cloned())
    }

    async fn get_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn get_open_payments_for_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let mut open: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                p.job_id == Some(job_id)
                    && p.user_id == user_id
                    && matches!(
                        p.status,
                        Some(PaymentStatus::Pending) | Some(PaymentStatus::Processing)
                    )
            })
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, sqlx::Error> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(&payment_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        payment.status = Some(status);
        payment.updated_at = Some(Utc::now());
        Ok(payment.clone())
    }
}

#[async_trait]
impl EarningExt for MemoryLedger {
    async fn insert_earning_if_absent(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        amount: i64,
        service_fee: i64,
        net_amount: i64,
    ) -> Result<(Earning, bool), sqlx::Error> {
        let mut earnings = self.earnings.lock().unwrap();

        if let Some(existing) = earnings
            .values()
            .find(|e| e.job_id == job_id && e.worker_id == worker_id && !e.is_cancelled())
        {
            return Ok((existing.clone(), false));
        }

        let earning = Earning {
            id: Uuid::new_v4(),
            job_id,
            worker_id,
            amount,
            service_fee,
            net_amount,
            status: Some(EarningStatus::Pending),
            date_earned: Some(Utc::now()),
            date_paid: None,
        };
        earnings.insert(earning.id, earning.clone());
        Ok((earning, true))
    }

    async fn get_earning_by_id(&self, earning_id: Uuid) -> Result<Option<Earning>, sqlx::Error> {
        Ok(self.earnings.lock().unwrap().get(&earning_id).cloned())
    }

    async fn get_earnings_for_job(&self, job_id: Uuid) -> Result<Vec<Earning>, sqlx::Error> {
        Ok(self
            .earnings
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn get_earnings_for_worker(
        &self,
        worker_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Earning>, sqlx::Error> {
        let mut all: Vec<Earning> = self
            .earnings
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.worker_id == worker_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| b.date_earned.cmp(&a.date_earned));
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_earning_status(
        &self,
        earning_id: Uuid,
        status: EarningStatus,
    ) -> Result<Earning, sqlx::Error> {
        let mut earnings = self.earnings.lock().unwrap();
        let earning = earnings
            .get_mut(&earning_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        earning.status = Some(status);
        Ok(earning.clone())
    }

    async fn mark_earning_paid(&self, earning_id: Uuid) -> Result<Earning, sqlx::Error> {
        let mut earnings = self.earnings.lock().unwrap();
        let earning = earnings
            .get_mut(&earning_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        earning.status = Some(EarningStatus::Paid);
        earning.date_paid = Some(Utc::now());
        Ok(earning.clone())
    }
}

#[async_trait]
impl PayoutAccountExt for MemoryLedger {
    async fn get_payout_account(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PayoutAccount>, sqlx::Error> {
        Ok(self
            .payout_accounts
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned())
    }

    async fn get_payout_account_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<PayoutAccount>, sqlx::Error> {
        Ok(self
            .payout_accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.external_account_id == external_account_id)
            .cloned())
    }

    async fn upsert_payout_account(
        &self,
        user_id: Uuid,
        external_account_id: &str,
    ) -> Result<PayoutAccount, sqlx::Error> {
        let mut accounts = self.payout_accounts.lock().unwrap();
        let account = accounts
            .entry(user_id)
            .and_modify(|a| a.external_account_id = external_account_id.to_string())
            .or_insert(PayoutAccount {
                id: Uuid::new_v4(),
                user_id,
                external_account_id: external_account_id.to_string(),
                payouts_enabled: Some(false),
                bank_accounts_available: Some(false),
                last_checked_at: None,
                created_at: Some(Utc::now()),
            });
        Ok(account.clone())
    }

    async fn update_payout_flags(
        &self,
        user_id: Uuid,
        payouts_enabled: bool,
        bank_accounts_available: bool,
    ) -> Result<PayoutAccount, sqlx::Error> {
        *self.payout_flag_writes.lock().unwrap() += 1;
        let mut accounts = self.payout_accounts.lock().unwrap();
        let account = accounts.get_mut(&user_id).ok_or(sqlx::Error::RowNotFound)?;
        account.payouts_enabled = Some(payouts_enabled);
        account.bank_accounts_available = Some(bank_accounts_available);
        account.last_checked_at = Some(Utc::now());
        Ok(account.clone())
    }
}

#[async_trait]
impl UserExt for MemoryLedger {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let users = self.users.lock().unwrap();
        if let Some(user_id) = user_id {
            return Ok(users.get(&user_id).cloned());
        }
        if let Some(email) = email {
            return Ok(users.values().find(|u| u.email == email).cloned());
        }
        Ok(None)
    }
}
