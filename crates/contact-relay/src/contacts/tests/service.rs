use super::common::*;
use serde_json::json;

use crate::contacts::domain::ContactId;
use crate::contacts::notifier::DeliveryError;
use crate::contacts::service::{ContactServiceError, SubmissionOutcome};
use crate::contacts::store::{StoreError, SubmissionStore};

#[tokio::test]
async fn submit_stores_then_notifies() {
    let (service, store, transport) = build_service(RecordingTransport::default());

    let outcome = service.submit(&valid_payload()).await.expect("accepted");

    match &outcome {
        SubmissionOutcome::Accepted(contact) => {
            assert_eq!(contact.id, ContactId(1));
            assert_eq!(contact.email, "a@b.com");
        }
        other => panic!("expected accepted outcome, got {other:?}"),
    }
    assert!(!outcome.is_degraded());
    assert_eq!(store.list_contacts().expect("listed").len(), 1);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New Contact Form Submission: Hello there");
}

#[tokio::test]
async fn delivery_failure_degrades_but_keeps_record() {
    let (service, store, transport) = build_service(FailingTransport::default());

    let outcome = service.submit(&valid_payload()).await.expect("still accepted");

    match &outcome {
        SubmissionOutcome::AcceptedDegraded { contact, error } => {
            assert_eq!(contact.id, ContactId(1));
            assert!(matches!(error, DeliveryError::Transport(_)));
        }
        other => panic!("expected degraded outcome, got {other:?}"),
    }
    assert!(outcome.is_degraded());
    assert_eq!(transport.attempts(), 1);

    let listed = store.list_contacts().expect("listed");
    assert_eq!(listed.len(), 1);
    assert_eq!(&listed[0], outcome.contact());
}

#[tokio::test]
async fn rejected_submissions_touch_nothing() {
    let (service, store, transport) = build_service(RecordingTransport::default());

    match service.submit(&invalid_payload()).await {
        Err(ContactServiceError::Rejected(errors)) => {
            assert_eq!(
                errors.fields().collect::<Vec<_>>(),
                vec!["name", "email", "subject", "message"]
            );
        }
        other => panic!("expected validation rejection, got {other:?}"),
    }

    assert!(store.list_contacts().expect("listed").is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn rejected_submission_does_not_consume_an_id() {
    let (service, _store, _transport) = build_service(RecordingTransport::default());

    service
        .submit(&invalid_payload())
        .await
        .expect_err("rejected");
    let outcome = service.submit(&valid_payload()).await.expect("accepted");

    assert_eq!(outcome.contact().id, ContactId(1));
}

#[tokio::test]
async fn store_failure_is_reported_and_skips_notification() {
    let service = unavailable_service();

    match service.submit(&valid_payload()).await {
        Err(ContactServiceError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected store failure, got {other:?}"),
    }
    assert!(matches!(
        service.list(),
        Err(ContactServiceError::Store(_))
    ));
}

#[tokio::test]
async fn ids_keep_increasing_across_submissions() {
    let (service, _store, _transport) = build_service(RecordingTransport::default());

    let mut last = ContactId(0);
    for n in 0..5 {
        let mut payload = valid_payload();
        payload["subject"] = json!(format!("Subject number {n}"));
        let outcome = service.submit(&payload).await.expect("accepted");
        assert!(outcome.contact().id > last);
        last = outcome.contact().id;
    }
}

#[tokio::test]
async fn send_test_email_uses_the_notifier_transport() {
    let (service, _store, transport) = build_service(RecordingTransport::default());

    let receipt = service.send_test_email().await.expect("sent");

    assert_eq!(receipt.response, "2.0.0 OK queued");
    let sent = transport.sent();
    assert_eq!(sent[0].subject, "Test Email");
    assert_eq!(sent[0].from.email.to_string(), "owner@example.com");
    assert_eq!(sent[0].to.email, service.notifier().identity().recipient);
}
