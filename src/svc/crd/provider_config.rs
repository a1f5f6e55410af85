//! # ProviderConfig custom resource
//!
//! This module provide the provider configuration custom resource, which
//! holds the region and a reference to the credentials used to reach the
//! relational database service, its deprecated provider counterpart and the
//! usage custom resource which records that a provider configuration is in
//! use.

use std::fmt::{self, Display, Formatter};

use kube::CustomResource;
use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::svc::crd::Reference;

// -----------------------------------------------------------------------------
// Constants

pub const ACCESS_KEY_ID: &str = "accessKeyId";
pub const ACCESS_KEY_SECRET: &str = "accessKeySecret";

// -----------------------------------------------------------------------------
// CredentialsSource enum

/// where the credentials are read from, only [`CredentialsSource::Secret`] is
/// supported. Unknown values are kept as is, so they can be reported.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(from = "String", into = "String")]
pub enum CredentialsSource {
    None,
    Secret,
    InjectedIdentity,
    Environment,
    Filesystem,
    Other(String),
}

impl From<&str> for CredentialsSource {
    fn from(s: &str) -> Self {
        match s {
            "None" => Self::None,
            "Secret" => Self::Secret,
            "InjectedIdentity" => Self::InjectedIdentity,
            "Environment" => Self::Environment,
            "Filesystem" => Self::Filesystem,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for CredentialsSource {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl Display for CredentialsSource {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Secret => write!(f, "Secret"),
            Self::InjectedIdentity => write!(f, "InjectedIdentity"),
            Self::Environment => write!(f, "Environment"),
            Self::Filesystem => write!(f, "Filesystem"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

#[allow(clippy::from_over_into)]
impl Into<String> for CredentialsSource {
    fn into(self) -> String {
        self.to_string()
    }
}

impl JsonSchema for CredentialsSource {
    fn schema_name() -> String {
        "CredentialsSource".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

// -----------------------------------------------------------------------------
// SecretKeySelector structure

/// points to the secret holding the access key, the secret is expected to
/// contain the `accessKeyId` and `accessKeySecret` entries. The key is
/// accepted to stay compatible with crossplane selectors but not read.
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct SecretKeySelector {
    #[serde(rename = "namespace")]
    pub namespace: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

// -----------------------------------------------------------------------------
// ProviderCredentials structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct ProviderCredentials {
    #[serde(rename = "source")]
    pub source: CredentialsSource,
    #[serde(rename = "secretRef", default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[kube(group = "alibaba.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "ProviderConfig")]
#[kube(singular = "providerconfig")]
#[kube(plural = "providerconfigs")]
#[kube(derive = "PartialEq")]
#[kube(
    printcolumn = r#"{"name":"region", "type":"string", "description":"Region", "jsonPath":".spec.region"}"#
)]
#[kube(
    printcolumn = r#"{"name":"source", "type":"string", "description":"Credentials source", "jsonPath":".spec.credentials.source"}"#
)]
pub struct Spec {
    #[serde(rename = "credentials")]
    pub credentials: ProviderCredentials,
    #[serde(rename = "region")]
    pub region: String,
}

// -----------------------------------------------------------------------------
// ProviderSpec structure

/// deprecated way to give credentials to managed resources, still honored
/// when a resource sets `providerRef` and no `providerConfigRef`
#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[kube(group = "alibaba.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "Provider")]
#[kube(singular = "provider")]
#[kube(plural = "providers")]
#[kube(derive = "PartialEq")]
#[kube(
    printcolumn = r#"{"name":"region", "type":"string", "description":"Region", "jsonPath":".spec.region"}"#
)]
pub struct ProviderSpec {
    #[serde(rename = "credentialsSecretRef")]
    pub credentials_secret_ref: SecretKeySelector,
    #[serde(rename = "region")]
    pub region: String,
}

// -----------------------------------------------------------------------------
// ResourceReference structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct ResourceReference {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "kind")]
    pub kind: String,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

// -----------------------------------------------------------------------------
// UsageSpec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[kube(group = "alibaba.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "ProviderConfigUsage")]
#[kube(singular = "providerconfigusage")]
#[kube(plural = "providerconfigusages")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
#[kube(
    printcolumn = r#"{"name":"config", "type":"string", "description":"Provider configuration", "jsonPath":".spec.providerConfigRef.name"}"#
)]
#[kube(
    printcolumn = r#"{"name":"resource", "type":"string", "description":"Resource", "jsonPath":".spec.resourceRef.name"}"#
)]
pub struct UsageSpec {
    #[serde(rename = "providerConfigRef")]
    pub provider_config_ref: Reference,
    #[serde(rename = "resourceRef")]
    pub resource_ref: ResourceReference,
}
