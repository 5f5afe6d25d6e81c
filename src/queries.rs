use std::collections::BTreeSet;

use derive_new::new;
use snafu::ResultExt as _;
use tracing::instrument;

use crate::model::{ResourceType, ViewFilter, ViewRecord};
use crate::recorder::{StorageSnafu, ViewError};
use crate::store::RecordStore;

/// One or many resource identifiers, normalized into a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet(BTreeSet<String>);

impl ResourceSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for ResourceSet {
    fn from(resource: &str) -> Self {
        std::iter::once(resource).collect()
    }
}

impl From<String> for ResourceSet {
    fn from(resource: String) -> Self {
        std::iter::once(resource).collect()
    }
}

impl From<Vec<String>> for ResourceSet {
    fn from(resources: Vec<String>) -> Self {
        resources.into_iter().collect()
    }
}

impl From<&[&str]> for ResourceSet {
    fn from(resources: &[&str]) -> Self {
        resources.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for ResourceSet {
    fn from(resources: [&str; N]) -> Self {
        resources.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Read-only projections over the view store.
#[derive(Debug, Clone, new)]
pub struct ViewQueries<S> {
    store: S,
}

impl<S: RecordStore> ViewQueries<S> {
    /// Total number of view records across every given resource, summed over users.
    #[instrument(skip_all)]
    pub async fn views_for_resource(
        &self, resources: impl Into<ResourceSet>,
    ) -> Result<u64, ViewError> {
        let resources = resources.into();
        tracing::debug!(count = resources.len(), ?resources, "counting views");
        if resources.is_empty() {
            return Ok(0);
        }

        let filter = ViewFilter::default().resources(resources.0);
        self.store.count_matching(&filter).await.context(StorageSnafu)
    }

    /// Distinct resources of `resource_type` that `user` has viewed, sorted.
    #[instrument(skip(self))]
    pub async fn viewed_resources_for_user_by_type(
        &self, user: &str, resource_type: ResourceType,
    ) -> Result<Vec<String>, ViewError> {
        let filter = ViewFilter::default().user(user).resource_type(resource_type);
        let views = self
            .store
            .list_matching(&filter)
            .await
            .context(StorageSnafu)?;

        let resources: BTreeSet<String> = views.into_iter().map(|view| view.resource).collect();
        Ok(resources.into_iter().collect())
    }

    /// The record of a single (resource, user) pair.
    #[instrument(skip(self))]
    pub async fn view(&self, resource: &str, user: &str) -> Result<Option<ViewRecord>, ViewError> {
        self.store
            .find_by_key(resource, user)
            .await
            .context(StorageSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use crate::store::{Insertion, OfflineStore, Result as StoreResult, StoreError, SurrealStore};

    async fn queries() -> ViewQueries<SurrealStore> {
        let store = SurrealStore::memory().await;
        store.seed_examples().await;
        ViewQueries::new(store)
    }

    #[test]
    fn resource_set_normalizes_input() {
        assert_eq!(ResourceSet::from("abc").len(), 1);
        assert_eq!(ResourceSet::from(["1", "abc", "1"]).len(), 2);
        assert!(ResourceSet::from(Vec::<String>::new()).is_empty());
    }

    #[tokio::test]
    async fn views_for_single_resource() {
        let queries = queries().await;
        assert_eq!(queries.views_for_resource("abc").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn views_for_unknown_resource_is_zero() {
        let queries = queries().await;
        assert_eq!(queries.views_for_resource("test").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn views_for_empty_set_is_zero() {
        let queries = queries().await;
        let none: [&str; 0] = [];
        assert_eq!(queries.views_for_resource(none).await.unwrap(), 0);
    }

    /// A store that fails the test on any access.
    struct Untouched;

    impl RecordStore for Untouched {
        async fn find_by_key(&self, _: &str, _: &str) -> StoreResult<Option<ViewRecord>> {
            unreachable!("storage should not be queried")
        }

        async fn insert(
            &self, _: &str, _: ResourceType, _: &str, _: Timestamp,
        ) -> StoreResult<Insertion> {
            unreachable!("storage should not be queried")
        }

        async fn increment_amount(&self, _: &str, _: &str, _: Timestamp) -> StoreResult<()> {
            unreachable!("storage should not be queried")
        }

        async fn count_matching(&self, _: &ViewFilter) -> StoreResult<u64> {
            unreachable!("storage should not be queried")
        }

        async fn list_matching(&self, _: &ViewFilter) -> StoreResult<Vec<ViewRecord>> {
            unreachable!("storage should not be queried")
        }
    }

    #[tokio::test]
    async fn empty_set_skips_storage() {
        let queries = ViewQueries::new(Untouched);
        let amount = queries.views_for_resource(Vec::<String>::new()).await.unwrap();
        assert_eq!(amount, 0);
    }

    #[tokio::test]
    async fn views_for_multiple_resources() {
        let queries = queries().await;
        assert_eq!(queries.views_for_resource(["1", "abc"]).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn viewed_resources_by_type() {
        let queries = queries().await;

        let videos = queries
            .viewed_resources_for_user_by_type("1@1", ResourceType::Video)
            .await
            .unwrap();
        assert_eq!(videos, vec!["1".to_string()]);

        let videos = queries
            .viewed_resources_for_user_by_type("2@2", ResourceType::Video)
            .await
            .unwrap();
        assert_eq!(videos, vec!["1".to_string(), "abc".to_string()]);
    }

    #[tokio::test]
    async fn viewed_resources_for_unknown_user_is_empty() {
        let queries = queries().await;

        let views = queries
            .viewed_resources_for_user_by_type("13@13", ResourceType::Video)
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn viewed_resources_for_missing_type_is_empty() {
        let queries = queries().await;

        let channels = queries
            .viewed_resources_for_user_by_type("2@2", ResourceType::Channel)
            .await
            .unwrap();
        assert!(channels.is_empty());
    }

    #[tokio::test]
    async fn storage_failures_surface() {
        let store = OfflineStore::default();
        let queries = ViewQueries::new(store.clone());

        let err = queries.views_for_resource("abc").await.unwrap_err();
        assert!(matches!(
            err,
            ViewError::Storage {
                source: StoreError::Unavailable { .. },
                ..
            }
        ));

        let err = queries
            .viewed_resources_for_user_by_type("1@1", ResourceType::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewError::Storage { .. }));

        assert!(matches!(queries.view("abc", "1@1").await, Err(ViewError::Storage { .. })));
        assert_eq!(store.attempts(), 3);
    }

    #[tokio::test]
    async fn single_view_lookup() {
        let queries = queries().await;

        let view = queries.view("abc", "1@1").await.unwrap().unwrap();
        assert_eq!(view.resource_type, ResourceType::Channel);
        assert_eq!(view.amount, 1);

        assert_eq!(queries.view("abc", "13@13").await.unwrap(), None);
    }
}
