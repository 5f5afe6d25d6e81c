use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::Query;
use serde::Deserialize;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::instrument;

use super::{App, InvalidViewSnafu, Result, ViewNotFoundSnafu};
use crate::model::{ResourceType, ViewRecord};
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub resource: String,
    pub resource_type: String,
    pub user: String,
}

#[instrument(skip(app))]
pub async fn record<S: RecordStore>(
    State(app): State<App<S>>, Json(event): Json<ViewEvent>,
) -> Result<StatusCode> {
    let resource_type: ResourceType = event.resource_type.parse().context(InvalidViewSnafu)?;

    let outcome = app
        .recorder
        .record_view(&event.resource, resource_type, &event.user)
        .await?;
    tracing::info!(?outcome, "recorded view");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    #[serde(default)]
    pub resource: Vec<String>,
}

#[instrument(skip(app))]
pub async fn amount<S: RecordStore>(
    State(app): State<App<S>>, Query(query): Query<AmountQuery>,
) -> Result<Json<u64>> {
    let amount = app.queries.views_for_resource(query.resource).await?;
    Ok(Json(amount))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedQuery {
    pub user: String,
    pub resource_type: String,
}

#[instrument(skip(app))]
pub async fn viewed_resources<S: RecordStore>(
    State(app): State<App<S>>, Query(query): Query<ViewedQuery>,
) -> Result<Json<Vec<String>>> {
    let resource_type: ResourceType = query.resource_type.parse().context(InvalidViewSnafu)?;

    let resources = app
        .queries
        .viewed_resources_for_user_by_type(&query.user, resource_type)
        .await?;
    Ok(Json(resources))
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub resource: String,
    pub user: String,
}

#[instrument(skip(app))]
pub async fn one<S: RecordStore>(
    State(app): State<App<S>>, Query(query): Query<KeyQuery>,
) -> Result<Json<ViewRecord>> {
    let view = app
        .queries
        .view(&query.resource, &query.user)
        .await?
        .context(ViewNotFoundSnafu)?;
    Ok(Json(view))
}
