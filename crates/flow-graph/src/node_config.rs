//! Per-subtype node configuration
//!
//! Each node subtype the catalog knows about has its own configuration
//! schema. Anything else (a subtype added by a newer backend, or a payload
//! that no longer fits its schema) is carried verbatim in
//! [`NodeConfig::Unknown`] so that loading and saving never loses data.
//!
//! Schema fields are optional and keys a schema does not declare land in its
//! `extra` map, so a known subtype encodes back to exactly what was read.
//! An empty object `{}` is always a valid configuration for a known subtype.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subtype identifiers for the typed configurations
pub mod subtypes {
    pub const WEBHOOK: &str = "webhook";
    pub const SCHEDULE: &str = "schedule";
    pub const MANUAL: &str = "manual";
    pub const CONDITION: &str = "condition";
    pub const DELAY: &str = "delay";
    pub const HTTP_REQUEST: &str = "http_request";
    pub const DATABASE_QUERY: &str = "database_query";
    pub const TRANSFORM: &str = "transform";
    pub const EMAIL: &str = "email";
    pub const SLACK: &str = "slack";
    pub const GITHUB_ISSUE: &str = "github_issue";
    pub const STORAGE_UPLOAD: &str = "storage_upload";
}

/// HTTP method used by webhook and request nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Cron expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManualConfig {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpRequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseQueryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformConfig {
    /// Mapping expression applied to the incoming payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlackConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GithubIssueConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageUploadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration of a node, keyed by its subtype
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Webhook(WebhookConfig),
    Schedule(ScheduleConfig),
    Manual(ManualConfig),
    Condition(ConditionConfig),
    Delay(DelayConfig),
    HttpRequest(HttpRequestConfig),
    DatabaseQuery(DatabaseQueryConfig),
    Transform(TransformConfig),
    Email(EmailConfig),
    Slack(SlackConfig),
    GithubIssue(GithubIssueConfig),
    StorageUpload(StorageUploadConfig),
    /// Subtype without a local schema; values are kept as received
    Unknown {
        subtype: String,
        values: Map<String, Value>,
    },
}

impl NodeConfig {
    /// The empty configuration template for a subtype
    pub fn default_for(subtype: &str) -> Self {
        Self::from_value(subtype, Value::Object(Map::new()))
    }

    /// Build a configuration from a wire value
    ///
    /// Never fails: a payload that does not match the subtype's schema, or
    /// that would not encode back to the same value, is preserved in
    /// `Unknown`.
    pub fn from_value(subtype: &str, value: Value) -> Self {
        let value = match value {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let typed = match subtype {
            subtypes::WEBHOOK => parse(&value).map(Self::Webhook),
            subtypes::SCHEDULE => parse(&value).map(Self::Schedule),
            subtypes::MANUAL => parse(&value).map(Self::Manual),
            subtypes::CONDITION => parse(&value).map(Self::Condition),
            subtypes::DELAY => parse(&value).map(Self::Delay),
            subtypes::HTTP_REQUEST => parse(&value).map(Self::HttpRequest),
            subtypes::DATABASE_QUERY => parse(&value).map(Self::DatabaseQuery),
            subtypes::TRANSFORM => parse(&value).map(Self::Transform),
            subtypes::EMAIL => parse(&value).map(Self::Email),
            subtypes::SLACK => parse(&value).map(Self::Slack),
            subtypes::GITHUB_ISSUE => parse(&value).map(Self::GithubIssue),
            subtypes::STORAGE_UPLOAD => parse(&value).map(Self::StorageUpload),
            _ => None,
        };

        let typed = typed.filter(|config| {
            let lossless = config.to_value() == value;
            if !lossless {
                log::warn!(
                    "Node config for '{}' does not round-trip its schema, keeping raw values",
                    subtype
                );
            }
            lossless
        });

        typed.unwrap_or_else(|| {
            let values = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            Self::Unknown {
                subtype: subtype.to_string(),
                values,
            }
        })
    }

    /// Subtype this configuration belongs to
    pub fn subtype(&self) -> &str {
        match self {
            Self::Webhook(_) => subtypes::WEBHOOK,
            Self::Schedule(_) => subtypes::SCHEDULE,
            Self::Manual(_) => subtypes::MANUAL,
            Self::Condition(_) => subtypes::CONDITION,
            Self::Delay(_) => subtypes::DELAY,
            Self::HttpRequest(_) => subtypes::HTTP_REQUEST,
            Self::DatabaseQuery(_) => subtypes::DATABASE_QUERY,
            Self::Transform(_) => subtypes::TRANSFORM,
            Self::Email(_) => subtypes::EMAIL,
            Self::Slack(_) => subtypes::SLACK,
            Self::GithubIssue(_) => subtypes::GITHUB_ISSUE,
            Self::StorageUpload(_) => subtypes::STORAGE_UPLOAD,
            Self::Unknown { subtype, .. } => subtype,
        }
    }

    /// Whether this subtype has a local schema
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }

    /// Wire representation of the configuration object
    pub fn to_value(&self) -> Value {
        let encoded = match self {
            Self::Webhook(c) => serde_json::to_value(c),
            Self::Schedule(c) => serde_json::to_value(c),
            Self::Manual(c) => serde_json::to_value(c),
            Self::Condition(c) => serde_json::to_value(c),
            Self::Delay(c) => serde_json::to_value(c),
            Self::HttpRequest(c) => serde_json::to_value(c),
            Self::DatabaseQuery(c) => serde_json::to_value(c),
            Self::Transform(c) => serde_json::to_value(c),
            Self::Email(c) => serde_json::to_value(c),
            Self::Slack(c) => serde_json::to_value(c),
            Self::GithubIssue(c) => serde_json::to_value(c),
            Self::StorageUpload(c) => serde_json::to_value(c),
            Self::Unknown { values, .. } => return Value::Object(values.clone()),
        };
        // Plain structs of strings, numbers and maps always encode
        encoded.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

fn parse<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Node config does not match its schema, keeping raw values: {}", e);
            None
        }
    }
}
