//! Response shapes of the gallery `extensionquery` endpoint.

use serde::{Deserialize, Deserializer, Serialize};

/// Read an explicit `null` as the type's default (missing keys are covered
/// by `#[serde(default)]`).
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionQueryResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<ExtensionQueryResult>,
    #[serde(default)]
    pub paging_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionQueryResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub extensions: Vec<ExtensionMeta>,
}

/// One catalog entry, as returned by the gallery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub publisher: Publisher,
    #[serde(rename = "extensionId", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "extensionName", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub flags: String,
    pub last_updated: Option<String>,
    pub published_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub short_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub versions: Vec<Version>,
    #[serde(deserialize_with = "null_as_default")]
    pub statistics: Vec<Statistic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Publisher {
    #[serde(deserialize_with = "null_as_default")]
    pub publisher_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub publisher_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub flags: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Version {
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub flags: String,
    pub last_updated: Option<String>,
    pub target_platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistic {
    #[serde(deserialize_with = "null_as_default")]
    pub statistic_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: f64,
}

pub const STATISTIC_INSTALL: &str = "install";

impl ExtensionMeta {
    /// Newest version listed by the gallery (versions arrive newest first).
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.first().map(|v| v.version.as_str())
    }

    pub fn statistic(&self, name: &str) -> Option<f64> {
        self.statistics
            .iter()
            .find(|s| s.statistic_name.eq_ignore_ascii_case(name))
            .map(|s| s.value)
    }

    pub fn installs(&self) -> Option<f64> {
        self.statistic(STATISTIC_INSTALL)
    }

    /// Identifier shorthand that `install` accepts for this entry.
    pub fn install_with(&self) -> String {
        let base = format!("{}.{}", self.publisher.publisher_name, self.name);
        match self.latest_version() {
            Some(v) => format!("{base}@{v}"),
            None => base,
        }
    }
}
