use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use contact_relay::config::{AppConfig, MailConfig};
use contact_relay::contacts::{
    ContactNotifier, ContactService, InMemorySubmissionStore, MailIdentity, MailTransport,
    SmtpMailTransport, SubmissionStore,
};
use contact_relay::error::AppError;
use tracing::{error, info};

pub(crate) type LiveContactService = ContactService<InMemorySubmissionStore, SmtpMailTransport>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the store, SMTP transport, and notifier into one service for the process.
pub(crate) fn build_contact_service(
    config: &AppConfig,
) -> Result<Arc<LiveContactService>, AppError> {
    let transport = Arc::new(SmtpMailTransport::from_config(&config.mail)?);
    let notifier = ContactNotifier::new(transport, MailIdentity::from(&config.mail));
    let store = Arc::new(InMemorySubmissionStore::default());
    Ok(Arc::new(ContactService::new(store, notifier)))
}

/// One-time relay check. Failure is logged and never stops the server.
pub(crate) async fn check_relay<S, T>(service: &ContactService<S, T>, mail: &MailConfig) -> bool
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    match service.notifier().verify().await {
        Ok(()) => {
            info!(account = %mail.account, "SMTP relay is ready to send emails");
            true
        }
        Err(err) => {
            error!(
                error = %err,
                account = %mail.account,
                secret_len = mail.secret_len(),
                smtp_host = %mail.smtp_host,
                smtp_port = mail.smtp_port,
                "SMTP relay check failed"
            );
            false
        }
    }
}
