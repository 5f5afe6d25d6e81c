use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::{
        auth::{self, Credentials, Jwt, Signin},
        IntoQuery, QueryResult,
    },
    Surreal,
};
use url::Url;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

/// Table and index definitions, applied on every connect.
const SETUP: &str = include_str!("../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl DatabaseError {
    /// Whether the database rejected a write because it would break a `UNIQUE` index.
    pub fn is_unique_violation(&self) -> bool {
        let DatabaseError::DatabaseQuery { source, .. } = self else {
            return false;
        };

        match source {
            surrealdb::Error::Db(surrealdb::error::Db::IndexExists { .. }) => true,
            // remote engines only hand back the rendered message
            surrealdb::Error::Api(surrealdb::error::Api::Query(message)) => {
                message.contains("already contains")
            }
            _ => false,
        }
    }

    /// Whether the engine aborted the write because a concurrent transaction touched the same keys.
    pub fn is_write_conflict(&self) -> bool {
        let DatabaseError::DatabaseQuery { source, .. } = self else {
            return false;
        };

        source.to_string().contains("read or write conflict")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url", default = "DatabaseConfig::default_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns", default = "DatabaseConfig::default_namespace")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "DatabaseConfig::default_database")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

impl DatabaseConfig {
    fn default_url() -> Url {
        Url::parse("mem://").expect("static url is valid")
    }

    fn default_namespace() -> String {
        "blue-stream".to_string()
    }

    fn default_database() -> String {
        "view".to_string()
    }

    /// An in-memory database with the default namespace, used by tests and local runs.
    pub fn memory() -> Self {
        Self {
            url: Self::default_url(),
            namespace: Self::default_namespace(),
            database: Self::default_database(),
            credentials: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_name")]
    username: String,
    #[serde(rename = "surreal_pass")]
    password: String,
}

impl DatabaseCredentials {
    fn auth<'a>(&'a self, config: &'a DatabaseConfig) -> impl Credentials<Signin, Jwt> + 'a {
        auth::Database {
            namespace: &config.namespace,
            database: &config.database,
            username: &self.username,
            password: &self.password,
        }
    }
}

/// A connected SurrealDB handle. Cloning shares the underlying connection.
#[derive(Debug, Clone, new)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    /// Connects, signs in when credentials are configured, selects the namespace and database, then applies the schema.
    #[tracing::instrument(skip_all, fields(url = %config.url))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = &config.url;
        let database = surrealdb::engine::any::connect(url.as_str())
            .await
            .context(DatabaseConnectionSnafu { url: url.clone() })?;

        if let Some(credentials) = &config.credentials {
            database
                .signin(credentials.auth(config))
                .await
                .context(DatabaseConnectionSnafu { url: url.clone() })?;
        }

        database
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(DatabaseConnectionSnafu { url: url.clone() })?;

        let database = Database::new(database);
        database.sql(SETUP).execute().await?;

        tracing::info!(namespace = %config.namespace, database = %config.database, "connected to the database");
        Ok(database)
    }

    /// Create a builder to execute arbitrary SurrealQL on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let views: Vec<ViewRecord> = db.sql("SELECT * FROM views WHERE user = $user")
    ///     .bind(("user", "1@1"))
    ///     .fetch()
    ///     .await?;
    /// ```
    ///
    /// `fetch` deserializes the first statement into either a single value (`Option<T>`) or a collection (`Vec<T>`).
    pub fn sql(&self, query: impl IntoQuery) -> Query<'_> {
        let query = self.database.query(query);
        Query { query }
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}

#[derive(Debug)]
pub struct Query<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Query<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Run every statement and fail on the first statement that errored.
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self.query.await.context(DatabaseQuerySnafu)?;
        let response = response.check().context(DatabaseQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    pub async fn fetch<T: serde::de::DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}
