use std::future::Future;

use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::database::{Database, DatabaseError};
use crate::model::{ResourceType, Timestamp, ViewFilter, ViewRecord};

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("view storage is unavailable at {location}: {source}"))]
    Unavailable {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Outcome of [RecordStore::insert].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Created(ViewRecord),
    /// Another record already holds the (resource, user) key.
    Duplicate,
}

/// Durable storage for [ViewRecord]s, keyed by (resource, user).
///
/// Implementations must enforce key uniqueness inside the storage engine itself: of several concurrent
/// [insert](RecordStore::insert) calls for the same absent key exactly one returns [Insertion::Created].
pub trait RecordStore: Send + Sync {
    fn find_by_key(
        &self, resource: &str, user: &str,
    ) -> impl Future<Output = Result<Option<ViewRecord>>> + Send;

    /// Create a record with an amount of one, last viewed at `at`.
    fn insert(
        &self, resource: &str, resource_type: ResourceType, user: &str, at: Timestamp,
    ) -> impl Future<Output = Result<Insertion>> + Send;

    /// Add one to the amount and move the last view to `at`. Does nothing if the key is absent.
    fn increment_amount(
        &self, resource: &str, user: &str, at: Timestamp,
    ) -> impl Future<Output = Result<()>> + Send;

    fn count_matching(&self, filter: &ViewFilter) -> impl Future<Output = Result<u64>> + Send;

    fn list_matching(
        &self, filter: &ViewFilter,
    ) -> impl Future<Output = Result<Vec<ViewRecord>>> + Send;
}

/// [RecordStore] backed by the `views` table, whose `views_resource_user` index guards the key.
#[derive(Debug, Clone, new)]
pub struct SurrealStore {
    database: Database,
}

#[derive(Debug, Deserialize)]
struct Count {
    count: u64,
}

fn where_clause(filter: &ViewFilter) -> String {
    let mut conditions = Vec::new();

    if filter.resources.is_some() {
        conditions.push("resource INSIDE $resources");
    }
    if filter.user.is_some() {
        conditions.push("user = $user");
    }
    if filter.resource_type.is_some() {
        conditions.push("resourceType = $resource_type");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

impl RecordStore for SurrealStore {
    #[instrument(skip(self))]
    async fn find_by_key(&self, resource: &str, user: &str) -> Result<Option<ViewRecord>> {
        self.database
            .sql("SELECT * FROM views WHERE resource = $resource AND user = $user LIMIT 1")
            .bind(("resource", resource))
            .bind(("user", user))
            .fetch()
            .await
            .context(UnavailableSnafu)
    }

    #[instrument(skip(self))]
    async fn insert(
        &self, resource: &str, resource_type: ResourceType, user: &str, at: Timestamp,
    ) -> Result<Insertion> {
        let record = ViewRecord::new(resource.to_owned(), resource_type, user.to_owned(), at);

        let created = self
            .database
            .sql("CREATE views CONTENT $record")
            .bind(("record", &record))
            .execute()
            .await;

        match created {
            Ok(_) => Ok(Insertion::Created(record)),
            Err(err) if err.is_unique_violation() => {
                tracing::debug!(%resource, %user, "view already exists");
                Ok(Insertion::Duplicate)
            }
            // a concurrent create of the same key won the commit
            Err(err) if err.is_write_conflict() => {
                tracing::debug!(%resource, %user, "view created concurrently");
                Ok(Insertion::Duplicate)
            }
            Err(err) => Err(err).context(UnavailableSnafu),
        }
    }

    #[instrument(skip(self))]
    async fn increment_amount(&self, resource: &str, user: &str, at: Timestamp) -> Result<()> {
        self.database
            .sql("UPDATE views SET amount += 1, lastViewDate = $at WHERE resource = $resource AND user = $user")
            .bind(("resource", resource))
            .bind(("user", user))
            .bind(("at", at))
            .execute()
            .await
            .context(UnavailableSnafu)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_matching(&self, filter: &ViewFilter) -> Result<u64> {
        let query = format!("SELECT count() FROM views{} GROUP ALL", where_clause(filter));

        let count: Option<Count> = self
            .database
            .sql(query)
            .bind(("resources", &filter.resources))
            .bind(("user", &filter.user))
            .bind(("resource_type", filter.resource_type))
            .fetch()
            .await
            .context(UnavailableSnafu)?;

        Ok(count.map_or(0, |c| c.count))
    }

    #[instrument(skip(self))]
    async fn list_matching(&self, filter: &ViewFilter) -> Result<Vec<ViewRecord>> {
        let query = format!("SELECT * FROM views{}", where_clause(filter));

        self.database
            .sql(query)
            .bind(("resources", &filter.resources))
            .bind(("user", &filter.user))
            .bind(("resource_type", filter.resource_type))
            .fetch()
            .await
            .context(UnavailableSnafu)
    }
}

#[cfg(test)]
impl SurrealStore {
    /// A store over a fresh in-memory database.
    pub(crate) async fn memory() -> Self {
        let database = Database::connect(&crate::database::DatabaseConfig::memory())
            .await
            .unwrap();
        Self::new(database)
    }

    /// Seeds the four records shared by the aggregation tests.
    pub(crate) async fn seed_examples(&self) {
        let at = crate::model::now();
        let views = [
            ("1", ResourceType::Video, "1@1"),
            ("1", ResourceType::Video, "2@2"),
            ("abc", ResourceType::Channel, "1@1"),
            ("abc", ResourceType::Video, "2@2"),
        ];

        for (resource, resource_type, user) in views {
            let inserted = self.insert(resource, resource_type, user, at).await.unwrap();
            assert!(matches!(inserted, Insertion::Created(_)));
        }
    }
}

/// A store whose every call fails as if the database were unreachable. Clones share the attempt count.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct OfflineStore {
    attempts: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl OfflineStore {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn refuse<T>(&self) -> Result<T> {
        use snafu::IntoError as _;

        self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let source = surrealdb::Error::Api(surrealdb::error::Api::Query("connection refused".to_string()));
        Err(crate::database::DatabaseQuerySnafu.into_error(source)).context(UnavailableSnafu)
    }
}

#[cfg(test)]
impl RecordStore for OfflineStore {
    async fn find_by_key(&self, _: &str, _: &str) -> Result<Option<ViewRecord>> {
        self.refuse()
    }

    async fn insert(&self, _: &str, _: ResourceType, _: &str, _: Timestamp) -> Result<Insertion> {
        self.refuse()
    }

    async fn increment_amount(&self, _: &str, _: &str, _: Timestamp) -> Result<()> {
        self.refuse()
    }

    async fn count_matching(&self, _: &ViewFilter) -> Result<u64> {
        self.refuse()
    }

    async fn list_matching(&self, _: &ViewFilter) -> Result<Vec<ViewRecord>> {
        self.refuse()
    }
}
