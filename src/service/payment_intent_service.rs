// service/payment_intent_service.rs
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::{jobdb::JobExt, paymentdb::PaymentExt},
    models::paymentmodel::{PaymentStatus, PaymentType},
    service::{error::ServiceError, stripe_gateway::PaymentGateway},
};

#[derive(Debug, Serialize)]
pub struct PaymentIntentOutcome {
    pub client_secret: String,
    pub payment_id: Uuid,
    pub reused: bool,
}

/// Creates or re-uses the charge intent a poster pays a job with. The charge
/// amount always comes from the job row, never from the client.
pub struct PaymentIntentService<L> {
    ledger: Arc<L>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<L> PaymentIntentService<L>
where
    L: JobExt + PaymentExt + Send + Sync,
{
    pub fn new(ledger: Arc<L>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    pub async fn create_or_reuse(
        &self,
        job_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<PaymentIntentOutcome, ServiceError> {
        let job = self
            .ledger
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        // The route is already authenticated; still re-validate ownership here.
        if job.poster_id != acting_user_id {
            return Err(ServiceError::UnauthorizedJobAccess(acting_user_id, job_id));
        }

        // Hand back an open intent instead of leaking a second uncollected
        // charge for the same job.
        let open_payments = self
            .ledger
            .get_open_payments_for_job(job_id, acting_user_id)
            .await?;

        for payment in open_payments {
            let Some(transaction_id) = payment.transaction_id.as_deref() else {
                continue;
            };
            match self.gateway.retrieve_charge_intent(transaction_id).await {
                Ok(intent) if intent.status.is_reusable() => {
                    tracing::info!(
                        "Re-using open charge intent {} for job {}",
                        transaction_id,
                        job_id
                    );
                    return Ok(PaymentIntentOutcome {
                        client_secret: intent.client_secret,
                        payment_id: payment.id,
                        reused: true,
                    });
                }
                Ok(_) => {
                    // Intent has moved past the payable states; fall through
                    // and create a fresh one.
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not retrieve charge intent {}: {}",
                        transaction_id,
                        e
                    );
                }
            }
        }

        let amount = job.total_amount;
        let metadata = [
            ("job_id", job_id.to_string()),
            ("poster_id", acting_user_id.to_string()),
        ];

        // Processor errors propagate; no payment row is written for an intent
        // that was never created.
        let intent = self.gateway.create_charge_intent(amount, &metadata).await?;

        // Persist before handing the secret back so a client crash right
        // after intent creation still leaves a traceable record.
        let payment = self
            .ledger
            .create_payment(
                PaymentType::JobPayment,
                PaymentStatus::Pending,
                Some(job_id),
                acting_user_id,
                amount,
                None,
                Some(intent.id.clone()),
                Some(json!({ "job_id": job_id })),
            )
            .await?;

        tracing::info!(
            "Created charge intent {} ({} cents) for job {}",
            intent.id,
            amount,
            job_id
        );

        Ok(PaymentIntentOutcome {
            client_secret: intent.client_secret,
            payment_id: payment.id,
            reused: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryLedger;
    use crate::models::jobmodel::*;
    use crate::service::mocks::MockGateway;
    use crate::service::stripe_gateway::IntentStatus;

    fn seed_job(ledger: &MemoryLedger) -> (Uuid, Uuid) {
        let job_id = Uuid::new_v4();
        let poster_id = Uuid::new_v4();
        ledger.put_job(Job {
            id: job_id,
            poster_id,
            worker_id: None,
            title: "Assemble a wardrobe".to_string(),
            payment_amount: 10000,
            service_fee: 250,
            total_amount: 10250,
            payment_type: JobPaymentType::Fixed,
            payment_status: Some(JobPaymentStatus::Unpaid),
            status: Some(JobStatus::Open),
            created_at: None,
            updated_at: None,
        });
        (job_id, poster_id)
    }

    #[tokio::test]
    async fn test_creates_intent_for_job_total() {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());
        let (job_id, poster_id) = seed_job(&ledger);

        let service = PaymentIntentService::new(ledger.clone(), gateway.clone());

        let outcome = service.create_or_reuse(job_id, poster_id).await.unwrap();
        assert!(!outcome.reused);

        let payment = ledger
            .get_payment_by_id(outcome.payment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.amount, 10250);
        assert_eq!(payment.status, Some(PaymentStatus::Pending));
        assert!(payment.transaction_id.is_some());
    }

    #[tokio::test]
    async fn test_reuses_open_intent() {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());
        let (job_id, poster_id) = seed_job(&ledger);

        let service = PaymentIntentService::new(ledger.clone(), gateway.clone());

        let first = service.create_or_reuse(job_id, poster_id).await.unwrap();
        let second = service.create_or_reuse(job_id, poster_id).await.unwrap();

        assert!(second.reused);
        assert_eq!(first.payment_id, second.payment_id);
        assert_eq!(first.client_secret, second.client_secret);
        assert_eq!(ledger.payments.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_spent_intent_is_not_reused() {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());
        let (job_id, poster_id) = seed_job(&ledger);

        let service = PaymentIntentService::new(ledger.clone(), gateway.clone());

        let first = service.create_or_reuse(job_id, poster_id).await.unwrap();
        let payment = ledger
            .get_payment_by_id(first.payment_id)
            .await
            .unwrap()
            .unwrap();
        gateway.set_intent_status(
            payment.transaction_id.as_deref().unwrap(),
            IntentStatus::Canceled,
        );

        let second = service.create_or_reuse(job_id, poster_id).await.unwrap();
        assert!(!second.reused);
        assert_ne!(first.payment_id, second.payment_id);
    }

    #[tokio::test]
    async fn test_non_poster_is_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());
        let (job_id, _poster_id) = seed_job(&ledger);

        let service = PaymentIntentService::new(ledger.clone(), gateway);

        let err = service
            .create_or_reuse(job_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));
    }

    #[tokio::test]
    async fn test_processor_failure_leaves_no_payment_row() {
        let ledger = Arc::new(MemoryLedger::new());
        let gateway = Arc::new(MockGateway::new());
        let (job_id, poster_id) = seed_job(&ledger);
        gateway.fail_intents(true);

        let service = PaymentIntentService::new(ledger.clone(), gateway);

        let err = service
            .create_or_reuse(job_id, poster_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExternalService(_)));
        assert!(ledger.payments.lock().unwrap().is_empty());
    }
}
