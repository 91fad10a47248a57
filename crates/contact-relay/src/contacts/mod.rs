//! Contact-form intake: validation, in-memory storage, and best-effort operator notification.

pub mod domain;
pub mod notifier;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{ContactId, ContactSubmission, ContactView, NewContact, NewUser, User, UserId};
pub use notifier::{
    ContactNotifier, DeliveryError, DeliveryReceipt, MailIdentity, MailTransport, OutboundEmail,
    SmtpMailTransport,
};
pub use router::contact_router;
pub use service::{ContactService, ContactServiceError, SubmissionOutcome};
pub use store::{Clock, InMemorySubmissionStore, StoreError, SubmissionStore, SystemClock};
pub use validation::{validate_submission, FieldError, FieldErrors};
