use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use lettre::Address;
use serde_json::{json, Value};

use crate::contacts::domain::{ContactSubmission, NewContact, NewUser, User, UserId};
use crate::contacts::notifier::{
    ContactNotifier, DeliveryError, DeliveryReceipt, MailIdentity, MailTransport, OutboundEmail,
};
use crate::contacts::service::ContactService;
use crate::contacts::store::{Clock, InMemorySubmissionStore, StoreError, SubmissionStore};

pub(super) fn valid_payload() -> Value {
    json!({
        "name": "Al",
        "email": "a@b.com",
        "subject": "Hello there",
        "message": "This is a message.",
    })
}

pub(super) fn invalid_payload() -> Value {
    json!({
        "name": "A",
        "email": "bad",
        "subject": "hi",
        "message": "short",
    })
}

pub(super) fn new_contact(subject: &str) -> NewContact {
    NewContact {
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        subject: subject.to_string(),
        message: "Would love to chat about your compiler work.".to_string(),
    }
}

pub(super) fn address(raw: &str) -> Address {
    raw.parse().expect("valid test address")
}

pub(super) fn identity() -> MailIdentity {
    MailIdentity {
        account: address("owner@example.com"),
        recipient: address("inbox@example.com"),
        sender_name: "Portfolio Contact".to_string(),
    }
}

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that only moves when a test tells it to.
#[derive(Default)]
pub(super) struct ManualClock {
    offset_secs: Mutex<i64>,
}

impl ManualClock {
    pub(super) fn set(&self, offset_secs: i64) {
        *self.offset_secs.lock().expect("clock mutex poisoned") = offset_secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let offset = *self.offset_secs.lock().expect("clock mutex poisoned");
        base_time() + Duration::seconds(offset)
    }
}

pub(super) fn store_with_clock() -> (InMemorySubmissionStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let store = InMemorySubmissionStore::with_clock(clock.clone());
    (store, clock)
}

#[derive(Default, Clone)]
pub(super) struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingTransport {
    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(email);
        Ok(DeliveryReceipt {
            response: "2.0.0 OK queued".to_string(),
        })
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct FailingTransport {
    attempts: Arc<Mutex<usize>>,
}

impl FailingTransport {
    pub(super) fn attempts(&self) -> usize {
        *self.attempts.lock().expect("transport mutex poisoned")
    }
}

#[async_trait]
impl MailTransport for FailingTransport {
    async fn deliver(&self, _email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        *self.attempts.lock().expect("transport mutex poisoned") += 1;
        Err(DeliveryError::Transport("connection refused".to_string()))
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("connection refused".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl SubmissionStore for UnavailableStore {
    fn create_contact(&self, _contact: NewContact) -> Result<ContactSubmission, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn list_contacts(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn create_user(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn get_user(&self, _id: UserId) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn get_user_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

pub(super) fn build_service<T>(
    transport: T,
) -> (
    ContactService<InMemorySubmissionStore, T>,
    Arc<InMemorySubmissionStore>,
    Arc<T>,
)
where
    T: MailTransport + 'static,
{
    let store = Arc::new(InMemorySubmissionStore::default());
    let transport = Arc::new(transport);
    let notifier = ContactNotifier::new(transport.clone(), identity());
    let service = ContactService::new(store.clone(), notifier);
    (service, store, transport)
}

pub(super) fn unavailable_service() -> ContactService<UnavailableStore, RecordingTransport> {
    let notifier = ContactNotifier::new(Arc::new(RecordingTransport::default()), identity());
    ContactService::new(Arc::new(UnavailableStore), notifier)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
