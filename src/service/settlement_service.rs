// service/settlement_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        earningdb::EarningExt, jobdb::JobExt, paymentdb::PaymentExt,
        payout_accountdb::PayoutAccountExt, userdb::UserExt,
    },
    models::{
        jobmodel::JobPaymentStatus,
        paymentmodel::{Earning, EarningStatus, Payment, PaymentStatus},
    },
    service::{
        error::ServiceError,
        payout_account_service::PayoutAccountService,
        stripe_gateway::{IntentStatus, PaymentGateway},
    },
};

#[derive(Debug, Serialize)]
pub struct SettlementResult {
    pub earning: Earning,
    pub transferred: bool,
    // True when this call found the earning already recorded by an earlier
    // settlement (duplicate invocation suppressed).
    pub already_settled: bool,
}

/// Turns a completed job payment into the single earning owed to the worker
/// and attempts the transfer to their payout account. Both the confirmation
/// path and the webhook path land here; the operation is idempotent and safe
/// to invoke concurrently for the same job.
pub struct SettlementService<L> {
    ledger: Arc<L>,
    gateway: Arc<dyn PaymentGateway>,
    payout_accounts: Arc<PayoutAccountService<L>>,
}

impl<L> SettlementService<L>
where
    L: JobExt + PaymentExt + EarningExt + PayoutAccountExt + UserExt + Send + Sync,
{
    pub fn new(
        ledger: Arc<L>,
        gateway: Arc<dyn PaymentGateway>,
        payout_accounts: Arc<PayoutAccountService<L>>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            payout_accounts,
        }
    }

    pub async fn settle(&self, job_id: Uuid) -> Result<SettlementResult, ServiceError> {
        let job = self
            .ledger
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let worker_id = job.worker_id.ok_or(ServiceError::Validation(format!(
            "Job {} has no assigned worker to settle",
            job_id
        )))?;

        // The conditional insert enforces at most one live earning per
        // (job, worker): a duplicate invocation gets the existing row back
        // instead of a second one, regardless of how the two entry points
        // interleave.
        let net_amount = job.payment_amount - job.service_fee;
        let (earning, created) = self
            .ledger
            .insert_earning_if_absent(
                job_id,
                worker_id,
                job.payment_amount,
                job.service_fee,
                net_amount,
            )
            .await?;
        let already_settled = !created;

        if already_settled {
            tracing::info!(
                "Duplicate settlement for job {} suppressed, earning {} already recorded",
                job_id,
                earning.id
            );
        }

        // Only a pending earning still needs a transfer; paid and processing
        // rows are left untouched.
        if earning.status != Some(EarningStatus::Pending) {
            return Ok(SettlementResult {
                earning,
                transferred: false,
                already_settled,
            });
        }

        let status = match self.payout_accounts.check_status(worker_id).await {
            Ok(status) => status,
            Err(ServiceError::Database(e)) => return Err(ServiceError::Database(e)),
            Err(e) => {
                // Eligibility could not be established; the earning stays
                // pending until settlement is re-invoked.
                tracing::warn!(
                    "Payout eligibility check for worker {} failed: {}",
                    worker_id,
                    e
                );
                return Ok(SettlementResult {
                    earning,
                    transferred: false,
                    already_settled,
                });
            }
        };

        if !status.payouts_enabled {
            tracing::warn!(
                "Worker {} is not yet eligible for payouts, earning {} stays pending",
                worker_id,
                earning.id
            );
            return Ok(SettlementResult {
                earning,
                transferred: false,
                already_settled,
            });
        }

        let metadata = [
            ("job_id", job_id.to_string()),
            ("worker_id", worker_id.to_string()),
            ("earning_id", earning.id.to_string()),
        ];

        match self
            .gateway
            .create_transfer(earning.net_amount, &status.external_account_id, &metadata)
            .await
        {
            Ok(transfer) => {
                let paid = self.ledger.mark_earning_paid(earning.id).await?;
                tracing::info!(
                    "Transferred {} cents to worker {} for job {} (transfer {})",
                    paid.net_amount,
                    worker_id,
                    job_id,
                    transfer.id
                );
                Ok(SettlementResult {
                    earning: paid,
                    transferred: true,
                    already_settled,
                })
            }
            Err(e) => {
                // A transfer hiccup must not fail the settlement or touch the
                // payment; the pending earning is picked up by a later
                // re-invocation. No automatic retry is scheduled.
                tracing::warn!(
                    "Transfer for earning {} failed, leaving it pending: {}",
                    earning.id,
                    e
                );
                Ok(SettlementResult {
                    earning,
                    transferred: false,
                    already_settled,
                })
            }
        }
    }

    /// Shared tail of both entry points once a charge is known to have
    /// succeeded: complete the payment (idempotent), mark the job paid and
    /// settle. Settlement validation problems (e.g. no worker assigned yet)
    /// are logged rather than surfaced, the payment itself did succeed.
    pub async fn record_payment_success(
        &self,
        payment: &Payment,
    ) -> Result<(Payment, Option<SettlementResult>), ServiceError> {
        let payment = if payment.status == Some(PaymentStatus::Completed) {
            payment.clone()
        } else {
            self.ledger
                .update_payment_status(payment.id, PaymentStatus::Completed)
                .await?
        };

        let Some(job_id) = payment.job_id else {
            return Ok((payment, None));
        };

        self.ledger
            .update_job_payment_status(job_id, JobPaymentStatus::Paid)
            .await?;

        match self.settle(job_id).await {
            Ok(result) => Ok((payment, Some(result))),
            Err(ServiceError::Validation(msg)) => {
                tracing::warn!("Settlement skipped for job {}: {}", job_id, msg);
                Ok((payment, None))
            }
            Err(e) => Err(e),
        }
    }

    /// Synchronous confirmation path. Verifies with the processor that the
    /// charge actually succeeded before recording anything.
    pub async fn confirm_payment(
        &self,
        payment_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(Payment, Option<SettlementResult>), ServiceError> {
        let payment = self
            .ledger
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id.to_string()))?;

        if payment.user_id != acting_user_id {
            return Err(ServiceError::UnauthorizedPaymentAccess(
                acting_user_id,
                payment.id,
            ));
        }

        let transaction_id = payment.transaction_id.clone().ok_or(
            ServiceError::Validation("Payment has no backing charge intent".to_string()),
        )?;

        let intent = self.gateway.retrieve_charge_intent(&transaction_id).await?;
        if intent.status != IntentStatus::Succeeded {
            return Err(ServiceError::Validation(format!(
                "Charge {} has not succeeded yet",
                transaction_id
            )));
        }

        self.record_payment_success(&payment).await
    }

    /// Manual override for the paid/cancelled terminal transitions outside
    /// automated settlement. Only the poster of the underlying job may use it,
    /// and the status can only move forward.
    pub async fn override_earning_status(
        &self,
        earning_id: Uuid,
        acting_user_id: Uuid,
        status: EarningStatus,
    ) -> Result<Earning, ServiceError> {
        let earning = self
            .ledger
            .get_earning_by_id(earning_id)
            .await?
            .ok_or(ServiceError::EarningNotFound(earning_id))?;

        let job = self
            .ledger
            .get_job_by_id(earning.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(earning.job_id))?;

        if job.poster_id != acting_user_id {
            return Err(ServiceError::UnauthorizedJobAccess(
                acting_user_id,
                job.id,
            ));
        }

        let current = earning.status.unwrap_or(EarningStatus::Pending);
        if !current.can_transition_to(status) {
            return Err(ServiceError::InvalidEarningTransition(current, status));
        }

        let updated = if status == EarningStatus::Paid {
            self.ledger.mark_earning_paid(earning_id).await?
        } else {
            self.ledger.update_earning_status(earning_id, status).await?
        };

        tracing::info!(
            "Earning {} manually moved {:?} -> {:?} by user {}",
            earning_id,
            current,
            status,
            acting_user_id
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryLedger;
    use crate::models::jobmodel::*;
    use crate::models::paymentmodel::PayoutAccount;
    use crate::service::mocks::MockGateway;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        gateway: Arc<MockGateway>,
        service: SettlementService<MemoryLedger>,
        job_id: Uuid,
        worker_id: Uuid,
    }

    // Job worth $100.00 with a $2.50 service fee, charged at $102.50.
    fn fixture(worker_eligible: bool) -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());

        let job_id = Uuid::new_v4();
        let worker_id = Uuid::new_v4();

        ledger.put_job(Job {
            id: job_id,
            poster_id: Uuid::new_v4(),
            worker_id: Some(worker_id),
            title: "Paint the fence".to_string(),
            payment_amount: 10000,
            service_fee: 250,
            total_amount: 10250,
            payment_type: JobPaymentType::Fixed,
            payment_status: Some(JobPaymentStatus::Paid),
            status: Some(JobStatus::Completed),
            created_at: None,
            updated_at: None,
        });

        let account_id = gateway.seed_account(worker_eligible, true, 1);
        ledger.put_payout_account(PayoutAccount {
            id: Uuid::new_v4(),
            user_id: worker_id,
            external_account_id: account_id,
            payouts_enabled: Some(worker_eligible),
            bank_accounts_available: Some(true),
            last_checked_at: None,
            created_at: None,
        });

        let payout_accounts = Arc::new(PayoutAccountService::new(
            ledger.clone(),
            gateway.clone(),
            "https://app.test".to_string(),
        ));
        let service =
            SettlementService::new(ledger.clone(), gateway.clone(), payout_accounts);

        Fixture {
            ledger,
            gateway,
            service,
            job_id,
            worker_id,
        }
    }

    #[tokio::test]
    async fn test_settle_pays_eligible_worker() {
        let fx = fixture(true);

        let result = fx.service.settle(fx.job_id).await.unwrap();

        assert!(result.transferred);
        assert!(!result.already_settled);
        assert_eq!(result.earning.amount, 10000);
        assert_eq!(result.earning.service_fee, 250);
        assert_eq!(result.earning.net_amount, 9750);
        assert_eq!(result.earning.status, Some(EarningStatus::Paid));
        assert!(result.earning.date_paid.is_some());

        let transfers = fx.gateway.transfers.lock().unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, 9750);
    }

    #[tokio::test]
    async fn test_settle_is_idempotent() {
        let fx = fixture(true);

        let first = fx.service.settle(fx.job_id).await.unwrap();
        let second = fx.service.settle(fx.job_id).await.unwrap();
        let third = fx.service.settle(fx.job_id).await.unwrap();

        assert_eq!(first.earning.id, second.earning.id);
        assert_eq!(second.earning.id, third.earning.id);
        assert!(second.already_settled);
        assert!(!second.transferred);
        assert_eq!(second.earning.status, Some(EarningStatus::Paid));

        assert_eq!(fx.ledger.earnings.lock().unwrap().len(), 1);
        assert_eq!(fx.gateway.transfers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_worker_leaves_earning_pending() {
        let fx = fixture(false);

        let result = fx.service.settle(fx.job_id).await.unwrap();

        assert!(!result.transferred);
        assert_eq!(result.earning.status, Some(EarningStatus::Pending));
        assert!(fx.gateway.transfers.lock().unwrap().is_empty());

        // Worker becomes eligible later; the same earning advances to paid.
        fx.gateway.set_payouts_enabled(true);

        let later = fx.service.settle(fx.job_id).await.unwrap();
        assert!(later.transferred);
        assert!(later.already_settled);
        assert_eq!(later.earning.id, result.earning.id);
        assert_eq!(later.earning.status, Some(EarningStatus::Paid));
        assert_eq!(fx.ledger.earnings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_failure_is_isolated() {
        let fx = fixture(true);
        fx.gateway.fail_transfers(true);

        // No error escapes; the earning stays pending.
        let result = fx.service.settle(fx.job_id).await.unwrap();
        assert!(!result.transferred);
        assert_eq!(result.earning.status, Some(EarningStatus::Pending));

        // Once the processor recovers, re-invoking pays the same earning.
        fx.gateway.fail_transfers(false);
        let retried = fx.service.settle(fx.job_id).await.unwrap();
        assert!(retried.transferred);
        assert_eq!(retried.earning.id, result.earning.id);
    }

    #[tokio::test]
    async fn test_settle_without_worker_is_rejected() {
        let fx = fixture(true);
        fx.ledger
            .jobs
            .lock()
            .unwrap()
            .get_mut(&fx.job_id)
            .unwrap()
            .worker_id = None;

        let err = fx.service.settle(fx.job_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(fx.ledger.earnings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_settlement_yields_one_earning() {
        let fx = fixture(true);

        // Slow the transfer call down so both invocations overlap across an
        // await point, mimicking the confirmation path racing the webhook.
        fx.gateway.set_transfer_delay_ms(20);

        let service = Arc::new(fx.service);
        let a = {
            let service = service.clone();
            let job_id = fx.job_id;
            tokio::spawn(async move { service.settle(job_id).await })
        };
        let b = {
            let service = service.clone();
            let job_id = fx.job_id;
            tokio::spawn(async move { service.settle(job_id).await })
        };

        let ra = a.await.unwrap().unwrap();
        let rb = b.await.unwrap().unwrap();

        assert_eq!(ra.earning.id, rb.earning.id);
        assert_eq!(fx.ledger.earnings.lock().unwrap().len(), 1);
        // Exactly one of the two saw a fresh insert.
        assert!(ra.already_settled != rb.already_settled);
    }

    #[tokio::test]
    async fn test_record_payment_success_completes_and_settles() {
        let fx = fixture(true);

        let payment = fx
            .ledger
            .create_payment(
                crate::models::paymentmodel::PaymentType::JobPayment,
                PaymentStatus::Pending,
                Some(fx.job_id),
                Uuid::new_v4(),
                10250,
                None,
                Some("pi_test_123".to_string()),
                None,
            )
            .await
            .unwrap();

        let (completed, settlement) = fx
            .service
            .record_payment_success(&payment)
            .await
            .unwrap();

        assert_eq!(completed.status, Some(PaymentStatus::Completed));
        let settlement = settlement.unwrap();
        assert!(settlement.transferred);
        assert_eq!(settlement.earning.worker_id, fx.worker_id);

        let job = fx.ledger.get_job_by_id(fx.job_id).await.unwrap().unwrap();
        assert_eq!(job.payment_status, Some(JobPaymentStatus::Paid));
    }

    #[tokio::test]
    async fn test_confirm_payment_requires_succeeded_intent() {
        let fx = fixture(true);
        let poster_id = Uuid::new_v4();

        let intent = fx
            .gateway
            .create_charge_intent(10250, &[])
            .await
            .unwrap();
        let payment = fx
            .ledger
            .create_payment(
                crate::models::paymentmodel::PaymentType::JobPayment,
                PaymentStatus::Pending,
                Some(fx.job_id),
                poster_id,
                10250,
                None,
                Some(intent.id.clone()),
                None,
            )
            .await
            .unwrap();

        // Not the payer.
        let err = fx
            .service
            .confirm_payment(payment.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedPaymentAccess(_, _)));

        // Intent still awaiting a payment method.
        let err = fx
            .service
            .confirm_payment(payment.id, poster_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(fx.ledger.earnings.lock().unwrap().is_empty());

        // Charge goes through; confirmation completes and settles.
        fx.gateway
            .set_intent_status(&intent.id, IntentStatus::Succeeded);
        let (confirmed, settlement) = fx
            .service
            .confirm_payment(payment.id, poster_id)
            .await
            .unwrap();
        assert_eq!(confirmed.status, Some(PaymentStatus::Completed));
        assert!(settlement.unwrap().transferred);
    }

    #[tokio::test]
    async fn test_override_earning_status_is_poster_only_and_forward_only() {
        let fx = fixture(false);
        let poster_id = fx
            .ledger
            .get_job_by_id(fx.job_id)
            .await
            .unwrap()
            .unwrap()
            .poster_id;

        // Worker not eligible: settlement leaves a pending earning behind.
        let pending = fx.service.settle(fx.job_id).await.unwrap().earning;

        let err = fx
            .service
            .override_earning_status(pending.id, Uuid::new_v4(), EarningStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));

        let cancelled = fx
            .service
            .override_earning_status(pending.id, poster_id, EarningStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, Some(EarningStatus::Cancelled));

        // Terminal: no way back.
        let err = fx
            .service
            .override_earning_status(pending.id, poster_id, EarningStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEarningTransition(_, _)));
    }
}
