//! # RDS module
//!
//! This module provide the capability interface over the alibaba cloud
//! relational database service, its models and an implementation based on
//! the OpenAPI.

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};

pub mod client;
pub mod password;

// -----------------------------------------------------------------------------
// Constants

pub const ERROR_CODE_INSTANCE_ID_NOT_FOUND: &str = "InvalidDBInstanceId.NotFound";
pub const ERROR_CODE_INSTANCE_NAME_NOT_FOUND: &str = "InvalidDBInstanceName.NotFound";

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database instance '{0}' does not exist")]
    NotFound(String),
    #[error("access key identifier and access key secret must not be empty")]
    Credentials,
    #[error("failed to create request signer, {0}")]
    Signer(client::SignerError),
    #[error("failed to build request, {0}")]
    RequestBuilder(hyper::http::Error),
    #[error("failed to execute request '{0}', {1}")]
    Request(String, hyper::Error),
    #[error("failed to aggregate body of request '{0}', {1}")]
    BodyAggregation(String, hyper::Error),
    #[error("failed to deserialize body of request '{0}', {1}")]
    Deserialize(String, serde_json::Error),
    #[error("failed to execute request '{action}', got status code {status}, {code}: {message}")]
    Api {
        action: String,
        status: u16,
        code: String,
        message: String,
    },
}

impl Error {
    /// returns if the error means that the database instance is missing on the
    /// backend side
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { code, .. } => {
                code == ERROR_CODE_INSTANCE_ID_NOT_FOUND
                    || code == ERROR_CODE_INSTANCE_NAME_NOT_FOUND
            }
            _ => false,
        }
    }
}

// -----------------------------------------------------------------------------
// Endpoint structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Endpoint {
    #[serde(rename = "address")]
    pub address: String,
    #[serde(rename = "port")]
    pub port: String,
}

// -----------------------------------------------------------------------------
// InstanceStatus enumeration

/// lifecycle status of a database instance as reported by the backend, see
/// <https://www.alibabacloud.com/help/en/rds/developer-reference/instance-states>
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Creating,
    Running,
    Deleting,
    Rebooting,
    ClassChanging,
    Other(String),
}

impl Default for InstanceStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<&str> for InstanceStatus {
    fn from(s: &str) -> Self {
        match s {
            "Creating" => Self::Creating,
            "Running" => Self::Running,
            "Deleting" => Self::Deleting,
            "Rebooting" => Self::Rebooting,
            "DBInstanceClassChanging" => Self::ClassChanging,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "Creating"),
            Self::Running => write!(f, "Running"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Rebooting => write!(f, "Rebooting"),
            Self::ClassChanging => write!(f, "DBInstanceClassChanging"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

#[allow(clippy::from_over_into)]
impl Into<String> for InstanceStatus {
    fn into(self) -> String {
        self.to_string()
    }
}

impl JsonSchema for InstanceStatus {
    fn schema_name() -> String {
        "InstanceStatus".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

// -----------------------------------------------------------------------------
// DbInstance structure

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct DbInstance {
    pub id: String,
    pub status: InstanceStatus,
    pub endpoint: Option<Endpoint>,
}

// -----------------------------------------------------------------------------
// CreateDbInstanceRequest structure

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct CreateDbInstanceRequest {
    pub name: String,
    pub engine: String,
    pub engine_version: String,
    pub class: String,
    pub storage_in_gb: i32,
    pub security_ip_list: Vec<String>,
    pub master_username: String,
}

// -----------------------------------------------------------------------------
// Client trait

/// capability interface over the relational database service, an
/// implementation does not retry on its own.
#[async_trait]
pub trait Client: Send + Sync {
    async fn describe_instance(&self, id: &str) -> Result<DbInstance, Error>;

    async fn create_instance(&self, req: &CreateDbInstanceRequest) -> Result<DbInstance, Error>;

    async fn create_account(&self, id: &str, username: &str, password: &str)
        -> Result<(), Error>;

    async fn delete_instance(&self, id: &str) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_status_keeps_unknown_values() {
        let status = InstanceStatus::from("TRANSING");

        assert_eq!(status, InstanceStatus::Other("TRANSING".to_string()));
        assert_eq!(status.to_string(), "TRANSING");
        assert_eq!(
            InstanceStatus::from("DBInstanceClassChanging"),
            InstanceStatus::ClassChanging
        );
    }

    #[test]
    fn instance_status_serializes_as_string() {
        let json = serde_json::to_string(&InstanceStatus::Running).unwrap();
        assert_eq!(json, "\"Running\"");

        let status: InstanceStatus = serde_json::from_str("\"Creating\"").unwrap();
        assert_eq!(status, InstanceStatus::Creating);
    }

    #[test]
    fn not_found_covers_api_codes() {
        let err = Error::Api {
            action: "DeleteDBInstance".to_string(),
            status: 404,
            code: ERROR_CODE_INSTANCE_ID_NOT_FOUND.to_string(),
            message: "The specified instance is not found.".to_string(),
        };

        assert!(err.is_not_found());
        assert!(Error::NotFound("test".to_string()).is_not_found());
        assert!(!Error::Credentials.is_not_found());
    }
}
