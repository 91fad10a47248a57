use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{ContactId, ContactSubmission, NewContact, NewUser, User, UserId};

/// Source of creation timestamps, swappable so ordering can be tested deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Storage abstraction so the service and router can be exercised in isolation.
pub trait SubmissionStore: Send + Sync {
    fn create_contact(&self, contact: NewContact) -> Result<ContactSubmission, StoreError>;
    /// All contacts, newest first; equal timestamps fall back to the higher id first.
    fn list_contacts(&self) -> Result<Vec<ContactSubmission>, StoreError>;
    fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug)]
struct StoreState {
    contacts: BTreeMap<ContactId, ContactSubmission>,
    users: BTreeMap<UserId, User>,
    next_contact_id: u64,
    next_user_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            contacts: BTreeMap::new(),
            users: BTreeMap::new(),
            next_contact_id: 1,
            next_user_id: 1,
        }
    }
}

/// Process-lifetime store. Everything is lost on restart.
///
/// Id assignment, timestamping and insertion happen under one lock so concurrent
/// submissions never share an id or observe a half-written record.
#[derive(Clone)]
pub struct InMemorySubmissionStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemorySubmissionStore {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl SubmissionStore for InMemorySubmissionStore {
    fn create_contact(&self, contact: NewContact) -> Result<ContactSubmission, StoreError> {
        let mut guard = self.lock()?;
        let id = ContactId(guard.next_contact_id);
        guard.next_contact_id += 1;

        let NewContact {
            name,
            email,
            subject,
            message,
        } = contact;
        let stored = ContactSubmission {
            id,
            name,
            email,
            subject,
            message,
            created_at: self.clock.now(),
        };

        guard.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    fn list_contacts(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        let guard = self.lock()?;
        let mut contacts: Vec<ContactSubmission> = guard.contacts.values().cloned().collect();
        contacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(contacts)
    }

    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut guard = self.lock()?;
        let id = UserId(guard.next_user_id);
        guard.next_user_id += 1;

        let stored = User {
            id,
            username: user.username,
            password: user.password,
        };
        guard.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}
