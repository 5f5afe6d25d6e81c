use dotenvy::dotenv;
use snafu::ResultExt as _;

use viewcount::api;
use viewcount::config::Config;
use viewcount::database::Database;
use viewcount::error::{ApplicationError, ConnectDatabaseSnafu};
use viewcount::logger;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config.server)?;
    tracing::info!(window = ?config.server.debounce, "starting view counter");

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let app = api::create_app(database, config.server.debounce);
    api::serve(app, config.server.host).await
}
