// service/webhook_service.rs
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    db::{
        earningdb::EarningExt, jobdb::JobExt, paymentdb::PaymentExt,
        payout_accountdb::PayoutAccountExt, userdb::UserExt,
    },
    models::{
        jobmodel::JobPaymentStatus,
        paymentmodel::{PaymentStatus, PaymentType},
    },
    service::{
        error::ServiceError, payout_account_service::PayoutAccountService,
        settlement_service::SettlementService,
    },
};

/// Ingests asynchronous processor events and maps them onto payment and
/// earning state. This path is the source of truth when the client never
/// calls the confirmation endpoint.
pub struct WebhookService<L> {
    ledger: Arc<L>,
    settlement_service: Arc<SettlementService<L>>,
    payout_account_service: Arc<PayoutAccountService<L>>,
    signing_secret: Option<String>,
}

impl<L> WebhookService<L>
where
    L: JobExt + PaymentExt + EarningExt + PayoutAccountExt + UserExt + Send + Sync,
{
    pub fn new(
        ledger: Arc<L>,
        settlement_service: Arc<SettlementService<L>>,
        payout_account_service: Arc<PayoutAccountService<L>>,
        signing_secret: Option<String>,
    ) -> Self {
        Self {
            ledger,
            settlement_service,
            payout_account_service,
            signing_secret,
        }
    }

    pub async fn process(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> Result<(), ServiceError> {
        self.verify_signature(signature, raw_body)?;

        let event: Value = serde_json::from_slice(raw_body)
            .map_err(|e| ServiceError::Validation(format!("Malformed webhook payload: {}", e)))?;

        let event_type = event["type"]
            .as_str()
            .ok_or(ServiceError::Validation(
                "Missing event type in webhook payload".to_string(),
            ))?;

        let data = &event["data"]["object"];

        match event_type {
            "payment_intent.succeeded" => self.handle_charge_succeeded(data).await,
            "payment_intent.payment_failed" => self.handle_charge_failed(data).await,
            "payment_intent.canceled" => self.handle_charge_canceled(data).await,
            "account.updated"
            | "account.application.authorized"
            | "account.application.deauthorized" => self.handle_account_event(data).await,
            other => {
                tracing::info!("Unhandled webhook event: {}", other);
                Ok(())
            }
        }
    }

    // Signature over the raw body, hex-encoded HMAC-SHA256, compared in
    // constant time. Without a configured secret, events are accepted
    // unsigned (non-production only).
    fn verify_signature(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> Result<(), ServiceError> {
        let Some(secret) = self.signing_secret.as_deref() else {
            tracing::warn!("No webhook signing secret configured, accepting unsigned event");
            return Ok(());
        };

        let signature = signature.ok_or(ServiceError::InvalidWebhookSignature)?;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(raw_body);
        let expected = hex::encode(mac.finalize().into_bytes());

        let matches: bool =
            ConstantTimeEq::ct_eq(signature.as_bytes(), expected.as_bytes()).into();
        if !matches {
            tracing::warn!("Invalid webhook signature received");
            return Err(ServiceError::InvalidWebhookSignature);
        }

        Ok(())
    }

    async fn handle_charge_succeeded(&self, data: &Value) -> Result<(), ServiceError> {
        let transaction_id = data["id"]
            .as_str()
            .ok_or(ServiceError::Validation(
                "Missing intent id in webhook data".to_string(),
            ))?;

        let payment = self
            .ledger
            .get_payment_by_transaction_id(transaction_id)
            .await?;

        let payment = match payment {
            Some(payment) => {
                if payment.status == Some(PaymentStatus::Completed) {
                    tracing::info!(
                        "Charge {} already recorded as completed, re-running settlement only",
                        transaction_id
                    );
                }
                payment
            }
            // Recovery path: the client disconnected before the confirmation
            // call and no payment row exists. Reconstruct it from the event.
            None => {
                let Some(job_id) = Self::job_id_from_metadata(data) else {
                    tracing::warn!(
                        "Charge {} succeeded but matches no payment and carries no job metadata",
                        transaction_id
                    );
                    return Ok(());
                };

                let Some(job) = self.ledger.get_job_by_id(job_id).await? else {
                    tracing::warn!(
                        "Charge {} succeeded for unknown job {}",
                        transaction_id,
                        job_id
                    );
                    return Ok(());
                };

                let amount = data["amount_received"]
                    .as_i64()
                    .or_else(|| data["amount"].as_i64())
                    .unwrap_or(job.total_amount);

                tracing::info!(
                    "Recovering payment record for charge {} on job {}",
                    transaction_id,
                    job_id
                );

                self.ledger
                    .create_payment(
                        PaymentType::JobPayment,
                        PaymentStatus::Completed,
                        Some(job_id),
                        job.poster_id,
                        amount,
                        data["payment_method"].as_str().map(|s| s.to_string()),
                        Some(transaction_id.to_string()),
                        Some(data["metadata"].clone()),
                    )
                    .await?
            }
        };

        self.settlement_service
            .record_payment_success(&payment)
            .await?;

        Ok(())
    }

    async fn handle_charge_failed(&self, data: &Value) -> Result<(), ServiceError> {
        let transaction_id = data["id"]
            .as_str()
            .ok_or(ServiceError::Validation(
                "Missing intent id in webhook data".to_string(),
            ))?;

        let Some(payment) = self
            .ledger
            .get_payment_by_transaction_id(transaction_id)
            .await?
        else {
            tracing::warn!("Charge {} failed but matches no payment", transaction_id);
            return Ok(());
        };

        if payment.status.map(|s| s.is_terminal()).unwrap_or(false) {
            tracing::info!(
                "Charge {} already in terminal state {:?}",
                transaction_id,
                payment.status
            );
            return Ok(());
        }

        self.ledger
            .update_payment_status(payment.id, PaymentStatus::Failed)
            .await?;

        if let Some(job_id) = payment.job_id {
            self.ledger
                .update_job_payment_status(job_id, JobPaymentStatus::PaymentFailed)
                .await?;
        }

        tracing::warn!("Charge {} failed, payment {} marked failed", transaction_id, payment.id);
        Ok(())
    }

    async fn handle_charge_canceled(&self, data: &Value) -> Result<(), ServiceError> {
        let transaction_id = data["id"]
            .as_str()
            .ok_or(ServiceError::Validation(
                "Missing intent id in webhook data".to_string(),
            ))?;

        let Some(payment) = self
            .ledger
            .get_payment_by_transaction_id(transaction_id)
            .await?
        else {
            tracing::warn!("Charge {} canceled but matches no payment", transaction_id);
            return Ok(());
        };

        if payment.status.map(|s| s.is_terminal()).unwrap_or(false) {
            return Ok(());
        }

        self.ledger
            .update_payment_status(payment.id, PaymentStatus::Canceled)
            .await?;

        tracing::info!("Charge {} canceled, payment {} marked canceled", transaction_id, payment.id);
        Ok(())
    }

    async fn handle_account_event(&self, data: &Value) -> Result<(), ServiceError> {
        let account_id = data["id"]
            .as_str()
            .ok_or(ServiceError::Validation(
                "Missing account id in webhook data".to_string(),
            ))?;

        self.payout_account_service
            .refresh_by_external_id(account_id)
            .await
    }

    fn job_id_from_metadata(data: &Value) -> Option<Uuid> {
        data["metadata"]["job_id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}
