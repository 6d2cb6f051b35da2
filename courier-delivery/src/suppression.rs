//! Suppression filtering of candidate recipients.

use std::{collections::HashSet, sync::Arc};

use courier_common::subscriber::Subscriber;
use courier_store::Store;

use crate::DeliveryError;

/// Removes suppressed addresses before any send attempt.
///
/// Suppression is unconditional: presence on the list excludes an address
/// regardless of subscriber status. Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct SuppressionFilter {
    store: Arc<dyn Store>,
}

impl SuppressionFilter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Candidate recipients: active subscribers minus suppression entries,
    /// in stable store order.
    ///
    /// # Errors
    /// `DeliveryError::Store` when either list cannot be read.
    pub async fn recipients(&self) -> Result<Vec<Subscriber>, DeliveryError> {
        let suppressed: HashSet<String> = self
            .store
            .suppression_list()
            .await?
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect();

        let subscribers = self.store.active_subscribers().await?;
        let total = subscribers.len();

        let recipients: Vec<Subscriber> = subscribers
            .into_iter()
            .filter(|s| !suppressed.contains(&s.email.to_lowercase()))
            .collect();

        tracing::debug!(
            candidates = total,
            suppressed = total - recipients.len(),
            "built recipient list"
        );
        Ok(recipients)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use courier_common::subscriber::{Subscriber, SubscriberStatus};
    use courier_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn suppression_wins_over_active_status() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_subscriber(Subscriber::active("s1", "keep@example.com"))
            .await
            .unwrap();
        store
            .insert_subscriber(Subscriber::active("s2", "drop@example.com"))
            .await
            .unwrap();
        store.insert_suppression("drop@example.com").await.unwrap();

        let filter = SuppressionFilter::new(store);
        let recipients = filter.recipients().await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].email, "keep@example.com");
    }

    #[tokio::test]
    async fn matching_is_case_insensitive() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_subscriber(Subscriber::active("s1", "User@Example.com"))
            .await
            .unwrap();
        store.insert_suppression("user@example.com").await.unwrap();

        let filter = SuppressionFilter::new(store);
        assert!(filter.recipients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inactive_subscribers_are_not_candidates() {
        let store = Arc::new(MemoryStore::new());
        let mut bounced = Subscriber::active("s1", "gone@example.com");
        bounced.status = SubscriberStatus::Bounced;
        store.insert_subscriber(bounced).await.unwrap();

        let mut unsubscribed = Subscriber::active("s2", "left@example.com");
        unsubscribed.status = SubscriberStatus::Unsubscribed;
        store.insert_subscriber(unsubscribed).await.unwrap();

        let filter = SuppressionFilter::new(store);
        assert!(filter.recipients().await.unwrap().is_empty());
    }
}
