//! In-memory capability store.
//!
//! Five independent keyed collections, each behind its own lock. Entries
//! keep insertion order so evaluation sees offers in submission order.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::capability::Capability;
use crate::certificate::AppCertificate;
use crate::ids::{AppId, CapabilityId, RequestId, UserGrantPolicyId};
use crate::policy::UserGrantPolicy;
use crate::request::CapabilityRequest;

/// An entity identified by a primary key.
pub trait Keyed: Clone {
    /// Primary key type.
    type Key: Copy + Eq + fmt::Display;

    /// Entity kind, for logs and errors.
    const KIND: &'static str;

    /// The primary key.
    fn key(&self) -> Self::Key;
}

/// A typed filter over a collection.
pub trait Query<T> {
    /// Whether `item` passes the filter.
    fn matches(&self, item: &T) -> bool;
}

impl Keyed for Capability {
    type Key = CapabilityId;
    const KIND: &'static str = "capability";

    fn key(&self) -> CapabilityId {
        self.capability_id
    }
}

impl Keyed for CapabilityRequest {
    type Key = RequestId;
    const KIND: &'static str = "request";

    fn key(&self) -> RequestId {
        self.request_id
    }
}

impl Keyed for UserGrantPolicy {
    type Key = UserGrantPolicyId;
    const KIND: &'static str = "user grant policy";

    fn key(&self) -> UserGrantPolicyId {
        self.user_grant_policy_id
    }
}

impl Keyed for AppCertificate {
    type Key = AppId;
    const KIND: &'static str = "certificate";

    fn key(&self) -> AppId {
        self.app_id
    }
}

/// A thread-safe, insertion-ordered collection keyed by primary key.
///
/// Reads hand out clones; nothing outside the collection holds a reference
/// into it.
pub struct Collection<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Keyed> Collection<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().unwrap_or_else(|e| {
            tracing::warn!(kind = T::KIND, "collection lock was poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().unwrap_or_else(|e| {
            tracing::warn!(kind = T::KIND, "collection lock was poisoned, recovering");
            e.into_inner()
        })
    }

    /// Add an item unless one with the same key is present.
    ///
    /// Returns `true` if the item was added.
    pub fn add(&self, item: T) -> bool {
        let mut items = self.write();
        let key = item.key();
        if items.iter().any(|existing| existing.key() == key) {
            tracing::debug!(kind = T::KIND, %key, "duplicate suppressed");
            return false;
        }
        items.push(item);
        true
    }

    /// Add an item, replacing any existing item with the same key.
    ///
    /// The replacement goes to the end of the collection. Returns the
    /// replaced item.
    pub fn replace(&self, item: T) -> Option<T> {
        let mut items = self.write();
        let key = item.key();
        let previous = items
            .iter()
            .position(|existing| existing.key() == key)
            .map(|index| items.remove(index));
        items.push(item);
        previous
    }

    /// Insert `item` unless its key is present or any item matches `query`.
    ///
    /// The check and the insertion happen under one write lock. Returns
    /// `true` if the item was inserted.
    pub fn insert_unless(&self, item: T, query: &impl Query<T>) -> bool {
        let mut items = self.write();
        let key = item.key();
        if items
            .iter()
            .any(|existing| existing.key() == key || query.matches(existing))
        {
            return false;
        }
        items.push(item);
        true
    }

    /// Remove the item with `key`.
    pub fn remove(&self, key: T::Key) -> Option<T> {
        let mut items = self.write();
        items
            .iter()
            .position(|existing| existing.key() == key)
            .map(|index| items.remove(index))
    }

    /// Number of items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Item at `index` in insertion order.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<T> {
        self.read().get(index).cloned()
    }

    /// Item with `key`.
    #[must_use]
    pub fn get_by_id(&self, key: T::Key) -> Option<T> {
        self.read().iter().find(|item| item.key() == key).cloned()
    }

    /// Whether an item with the same key as `item` is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.contains_key(item.key())
    }

    /// Whether an item with `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: T::Key) -> bool {
        self.read().iter().any(|item| item.key() == key)
    }

    /// All items matching `query`, in insertion order.
    #[must_use]
    pub fn matching(&self, query: &impl Query<T>) -> Vec<T> {
        self.read()
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect()
    }

    /// First item matching `query`.
    #[must_use]
    pub fn first_matching(&self, query: &impl Query<T>) -> Option<T> {
        self.read().iter().find(|item| query.matches(item)).cloned()
    }

    /// Whether any item matches `query`.
    #[must_use]
    pub fn any(&self, query: &impl Query<T>) -> bool {
        self.read().iter().any(|item| query.matches(item))
    }

    /// Snapshot of every item.
    #[must_use]
    pub fn all(&self) -> Vec<T> {
        self.read().clone()
    }

    /// Mutate the item with `key` in place.
    ///
    /// Returns `None` if no such item exists.
    pub fn update<R>(&self, key: T::Key, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut items = self.write();
        items.iter_mut().find(|item| item.key() == key).map(f)
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.write().clear();
    }
}

impl<T: Keyed> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &T::KIND)
            .field("count", &self.count())
            .finish()
    }
}

/// The authority's state: offers, grants, requests, overrides, certificates.
#[derive(Debug, Default)]
pub struct CapabilityStore {
    offered: Collection<Capability>,
    granted: Collection<Capability>,
    requests: Collection<CapabilityRequest>,
    policies: Collection<UserGrantPolicy>,
    certificates: Collection<AppCertificate>,
}

impl CapabilityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root capabilities offered by apps.
    #[must_use]
    pub fn offered(&self) -> &Collection<Capability> {
        &self.offered
    }

    /// Derived capabilities: automatic grants, delegations, manual grants.
    #[must_use]
    pub fn granted(&self) -> &Collection<Capability> {
        &self.granted
    }

    /// Capability requests with their accumulated grants.
    #[must_use]
    pub fn requests(&self) -> &Collection<CapabilityRequest> {
        &self.requests
    }

    /// Human-operator overrides.
    #[must_use]
    pub fn policies(&self) -> &Collection<UserGrantPolicy> {
        &self.policies
    }

    /// Participant certificates.
    #[must_use]
    pub fn certificates(&self) -> &Collection<AppCertificate> {
        &self.certificates
    }

    /// The certificate registered for `app_id`.
    #[must_use]
    pub fn certificate_for(&self, app_id: AppId) -> Option<AppCertificate> {
        self.certificates.get_by_id(app_id)
    }
}
