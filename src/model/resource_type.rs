use super::view::UnknownResourceTypeSnafu;
use super::*;

/// The kind of resource a view is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Video,
    Channel,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Video => "VIDEO",
            ResourceType::Channel => "CHANNEL",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "VIDEO" => Ok(ResourceType::Video),
            "CHANNEL" => Ok(ResourceType::Channel),
            _ => UnknownResourceTypeSnafu { input }.fail(),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
