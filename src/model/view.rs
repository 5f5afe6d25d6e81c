use snafu::ensure;

use super::*;

/// Per (resource, user) view counter, the only persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub resource: String,
    pub resource_type: ResourceType,
    pub user: String,
    #[new(value = "1")]
    pub amount: i64,
    pub last_view_date: Timestamp,
}

/// A conjunction of optional criteria over [ViewRecord]. The default filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub resources: Option<Vec<String>>,
    pub user: Option<String>,
    pub resource_type: Option<ResourceType>,
}

impl ViewFilter {
    pub fn resources(mut self, resources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn matches(&self, record: &ViewRecord) -> bool {
        let resource = self
            .resources
            .as_ref()
            .map_or(true, |set| set.contains(&record.resource));
        let user = self.user.as_ref().map_or(true, |user| user == &record.user);
        let resource_type = self
            .resource_type
            .map_or(true, |kind| kind == record.resource_type);

        resource && user && resource_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ValidationError {
    #[snafu(display("resource identifier must not be empty"))]
    EmptyResource,

    #[snafu(display("user identifier must not be empty"))]
    EmptyUser,

    #[snafu(display("unknown resource type `{input}`, expected VIDEO or CHANNEL"))]
    UnknownResourceType { input: String },
}

pub fn validate_key(resource: &str, user: &str) -> Result<(), ValidationError> {
    ensure!(!resource.trim().is_empty(), EmptyResourceSnafu);
    ensure!(!user.trim().is_empty(), EmptyUserSnafu);
    Ok(())
}
