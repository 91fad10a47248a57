use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use super::domain::ContactSubmission;
use super::notifier::{ContactNotifier, DeliveryError, DeliveryReceipt, MailTransport};
use super::store::{StoreError, SubmissionStore};
use super::validation::{validate_submission, FieldErrors};

/// Result of a submission that made it into the store.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// Stored and the operator notification went out.
    Accepted(ContactSubmission),
    /// Stored, but the notification could not be delivered.
    AcceptedDegraded {
        contact: ContactSubmission,
        error: DeliveryError,
    },
}

impl SubmissionOutcome {
    pub fn contact(&self) -> &ContactSubmission {
        match self {
            SubmissionOutcome::Accepted(contact)
            | SubmissionOutcome::AcceptedDegraded { contact, .. } => contact,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SubmissionOutcome::AcceptedDegraded { .. })
    }
}

/// Error raised by the contact service.
#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error(transparent)]
    Rejected(#[from] FieldErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service composing the validator, store, and notifier.
pub struct ContactService<S, T> {
    store: Arc<S>,
    notifier: ContactNotifier<T>,
}

impl<S, T> ContactService<S, T>
where
    S: SubmissionStore + 'static,
    T: MailTransport + 'static,
{
    pub fn new(store: Arc<S>, notifier: ContactNotifier<T>) -> Self {
        Self { store, notifier }
    }

    pub fn notifier(&self) -> &ContactNotifier<T> {
        &self.notifier
    }

    /// Validate, store, then attempt one notification.
    ///
    /// Delivery failures never undo the stored record; they only downgrade the outcome.
    pub async fn submit(&self, payload: &Value) -> Result<SubmissionOutcome, ContactServiceError> {
        let contact = validate_submission(payload).map_err(|errors| {
            info!(
                rejected_fields = errors.len(),
                "contact submission failed validation"
            );
            errors
        })?;

        let stored = self.store.create_contact(contact).map_err(|err| {
            error!(error = %err, "failed to store contact submission");
            err
        })?;
        info!(contact_id = %stored.id, "contact submission stored");

        match self.notifier.notify(&stored).await {
            Ok(_) => Ok(SubmissionOutcome::Accepted(stored)),
            Err(error) => {
                warn!(
                    contact_id = %stored.id,
                    "contact stored without operator notification"
                );
                Ok(SubmissionOutcome::AcceptedDegraded {
                    contact: stored,
                    error,
                })
            }
        }
    }

    /// Every stored submission, newest first.
    pub fn list(&self) -> Result<Vec<ContactSubmission>, ContactServiceError> {
        let contacts = self.store.list_contacts()?;
        Ok(contacts)
    }

    pub async fn send_test_email(&self) -> Result<DeliveryReceipt, DeliveryError> {
        self.notifier.send_test().await
    }
}
