//! # Client module
//!
//! This module provide a client of the alibaba cloud relational database
//! service OpenAPI using the remote procedure call style and its signature
//! algorithm.
//!
//! See following links for more details:
//! - <https://www.alibabacloud.com/help/en/sdk/product-overview/rpc-mechanism>
//! - <https://www.alibabacloud.com/help/en/rds/developer-reference/api-rds-2014-08-15-dir>

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_ENGINE, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use hyper::{client::HttpConnector, header, Body, Method};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{opts, register_counter_vec, CounterVec};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::svc::rds::{self, CreateDbInstanceRequest, DbInstance, Endpoint, Error};

// -----------------------------------------------------------------------------
// Types

type HmacSha1 = Hmac<Sha1>;

// -----------------------------------------------------------------------------
// Constants

pub const PUBLIC_ENDPOINT: &str = "https://rds.aliyuncs.com";
pub const API_VERSION: &str = "2014-08-15";

pub const RPC_ACCESS_KEY_ID: &str = "AccessKeyId";
pub const RPC_ACTION: &str = "Action";
pub const RPC_FORMAT: &str = "Format";
pub const RPC_FORMAT_JSON: &str = "JSON";
pub const RPC_REGION_ID: &str = "RegionId";
pub const RPC_SIGNATURE: &str = "Signature";
pub const RPC_SIGNATURE_METHOD: &str = "SignatureMethod";
pub const RPC_SIGNATURE_HMAC_SHA1: &str = "HMAC-SHA1";
pub const RPC_SIGNATURE_NONCE: &str = "SignatureNonce";
pub const RPC_SIGNATURE_VERSION: &str = "SignatureVersion";
pub const RPC_SIGNATURE_VERSION_1: &str = "1.0";
pub const RPC_TIMESTAMP: &str = "Timestamp";
pub const RPC_VERSION: &str = "Version";

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static CLIENT_REQUEST: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "rds_client_request",
            "number of request executed on the relational database service api",
        ),
        &["action", "status"]
    )
    .expect("metrics 'rds_client_request' to not be already registered")
});

// -----------------------------------------------------------------------------
// Credentials structure

#[derive(PartialEq, Eq, Clone, Default)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Rpc trait

pub trait Rpc {
    type Error;

    // `params` returns the common parameters without the signature one
    fn params(&self) -> BTreeMap<String, String>;

    // `signing_key` returns the key that is used to signed the signature
    fn signing_key(&self) -> String;

    // `signature` returns the computed signature from given parameters
    fn signature(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, Self::Error>;

    // `sign` returns the encoded query string including the signature
    fn sign(&self, method: &str, params: &BTreeMap<String, String>) -> Result<String, Self::Error> {
        let mut params = params.to_owned();

        params.extend(self.params());

        let signature = self.signature(method, &params)?;
        params.insert(RPC_SIGNATURE.to_string(), signature);

        Ok(canonicalize(&params))
    }
}

/// returns the parameters sorted by key and percent encoded as expected by
/// the signature algorithm
pub fn canonicalize(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// -----------------------------------------------------------------------------
// SignerError enum

#[derive(thiserror::Error, Debug)]
pub enum SignerError {
    #[error("failed to compute invalid key length, {0}")]
    Digest(hmac::digest::InvalidLength),
}

// -----------------------------------------------------------------------------
// Signer structure

pub struct Signer {
    pub nonce: String,
    pub timestamp: String,
    pub credentials: Credentials,
}

impl Rpc for Signer {
    type Error = SignerError;

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        params.insert(
            RPC_ACCESS_KEY_ID.to_string(),
            self.credentials.access_key_id.to_string(),
        );
        params.insert(RPC_FORMAT.to_string(), RPC_FORMAT_JSON.to_string());
        params.insert(RPC_REGION_ID.to_string(), self.credentials.region.to_string());
        params.insert(
            RPC_SIGNATURE_METHOD.to_string(),
            RPC_SIGNATURE_HMAC_SHA1.to_string(),
        );
        params.insert(RPC_SIGNATURE_NONCE.to_string(), self.nonce.to_string());
        params.insert(
            RPC_SIGNATURE_VERSION.to_string(),
            RPC_SIGNATURE_VERSION_1.to_string(),
        );
        params.insert(RPC_TIMESTAMP.to_string(), self.timestamp.to_string());
        params.insert(RPC_VERSION.to_string(), API_VERSION.to_string());
        params
    }

    fn signing_key(&self) -> String {
        format!("{}&", self.credentials.access_key_secret)
    }

    fn signature(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, Self::Error> {
        let base = format!(
            "{}&{}&{}",
            method,
            urlencoding::encode("/"),
            urlencoding::encode(&canonicalize(params))
        );

        let mut hasher = HmacSha1::new_from_slice(self.signing_key().as_bytes())
            .map_err(SignerError::Digest)?;

        hasher.update(base.as_bytes());

        let digest = hasher.finalize().into_bytes();
        Ok(BASE64_ENGINE.encode(digest.as_slice()))
    }
}

impl From<Credentials> for Signer {
    fn from(credentials: Credentials) -> Self {
        Self {
            nonce: Uuid::new_v4().to_string(),
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            credentials,
        }
    }
}

// -----------------------------------------------------------------------------
// Response structures

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ResponseError {
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct InstanceAttribute {
    #[serde(rename = "DBInstanceId")]
    pub id: String,
    #[serde(rename = "DBInstanceStatus", default)]
    pub status: String,
    #[serde(rename = "ConnectionString", default)]
    pub connection_string: String,
    #[serde(rename = "Port", default)]
    pub port: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct InstanceAttributeItems {
    #[serde(rename = "DBInstanceAttribute", default)]
    pub attributes: Vec<InstanceAttribute>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DescribeInstanceAttributeResponse {
    #[serde(rename = "Items", default)]
    pub items: InstanceAttributeItems,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CreateInstanceResponse {
    #[serde(rename = "DBInstanceId")]
    pub id: String,
    #[serde(rename = "ConnectionString", default)]
    pub connection_string: String,
    #[serde(rename = "Port", default)]
    pub port: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EmptyResponse {
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
}

/// returns the endpoint of the instance, if the backend already allocated one
pub fn endpoint(connection_string: &str, port: &str) -> Option<Endpoint> {
    if connection_string.is_empty() {
        return None;
    }

    Some(Endpoint {
        address: connection_string.to_string(),
        port: port.to_string(),
    })
}

impl From<InstanceAttribute> for DbInstance {
    fn from(attribute: InstanceAttribute) -> Self {
        Self {
            endpoint: endpoint(&attribute.connection_string, &attribute.port),
            status: attribute.status.into(),
            id: attribute.id,
        }
    }
}

impl From<CreateInstanceResponse> for DbInstance {
    fn from(res: CreateInstanceResponse) -> Self {
        Self {
            endpoint: endpoint(&res.connection_string, &res.port),
            status: rds::InstanceStatus::Creating,
            id: res.id,
        }
    }
}

// -----------------------------------------------------------------------------
// Client structure

#[derive(Clone)]
pub struct Client {
    inner: hyper::Client<HttpsConnector<HttpConnector>, Body>,
    endpoint: String,
    credentials: Credentials,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl Client {
    pub fn try_new(endpoint: &str, credentials: Credentials) -> Result<Self, Error> {
        if credentials.access_key_id.is_empty() || credentials.access_key_secret.is_empty() {
            return Err(Error::Credentials);
        }

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self {
            inner: hyper::Client::builder().build(connector),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self, params)))]
    pub async fn execute<T>(&self, action: &str, params: BTreeMap<String, String>) -> Result<T, Error>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let method = &Method::GET;
        let mut params = params;

        params.insert(RPC_ACTION.to_string(), action.to_string());

        let query = Signer::from(self.credentials.to_owned())
            .sign(method.as_str(), &params)
            .map_err(Error::Signer)?;

        let req = hyper::Request::builder()
            .method(method)
            .uri(format!("{}/?{}", self.endpoint, query))
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(Error::RequestBuilder)?;

        trace!(
            endpoint = &self.endpoint,
            method = method.as_str(),
            action = action,
            "Execute request"
        );

        let res = self
            .inner
            .request(req)
            .await
            .map_err(|err| Error::Request(action.to_string(), err))?;

        let status = res.status();
        let buf = hyper::body::to_bytes(res.into_body())
            .await
            .map_err(|err| Error::BodyAggregation(action.to_string(), err))?;

        trace!(
            endpoint = &self.endpoint,
            method = method.as_str(),
            action = action,
            status = status.as_u16(),
            "Got response"
        );

        #[cfg(feature = "metrics")]
        CLIENT_REQUEST
            .with_label_values(&[action, &status.as_u16().to_string()])
            .inc();

        if !status.is_success() {
            let err: ResponseError = serde_json::from_slice(&buf)
                .map_err(|err| Error::Deserialize(action.to_string(), err))?;

            return Err(Error::Api {
                action: action.to_string(),
                status: status.as_u16(),
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_slice(&buf).map_err(|err| Error::Deserialize(action.to_string(), err))
    }
}

#[async_trait]
impl rds::Client for Client {
    async fn describe_instance(&self, id: &str) -> Result<DbInstance, Error> {
        let params = BTreeMap::from([("DBInstanceId".to_string(), id.to_string())]);

        debug!(id = id, "Describe database instance");
        let res: DescribeInstanceAttributeResponse =
            self.execute("DescribeDBInstanceAttribute", params).await?;

        res.items
            .attributes
            .into_iter()
            .next()
            .map(DbInstance::from)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn create_instance(&self, req: &CreateDbInstanceRequest) -> Result<DbInstance, Error> {
        let params = BTreeMap::from([
            ("ClientToken".to_string(), req.name.chars().take(64).collect::<String>()),
            ("DBInstanceDescription".to_string(), req.name.to_owned()),
            ("Engine".to_string(), req.engine.to_owned()),
            ("EngineVersion".to_string(), req.engine_version.to_owned()),
            ("DBInstanceClass".to_string(), req.class.to_owned()),
            ("DBInstanceStorage".to_string(), req.storage_in_gb.to_string()),
            ("DBInstanceNetType".to_string(), "Internet".to_string()),
            ("SecurityIPList".to_string(), req.security_ip_list.join(",")),
            ("PayType".to_string(), "Postpaid".to_string()),
        ]);

        debug!(
            name = &req.name,
            engine = &req.engine,
            version = &req.engine_version,
            class = &req.class,
            "Create database instance"
        );

        let res: CreateInstanceResponse = self.execute("CreateDBInstance", params).await?;

        Ok(DbInstance::from(res))
    }

    async fn create_account(&self, id: &str, username: &str, password: &str) -> Result<(), Error> {
        let params = BTreeMap::from([
            ("DBInstanceId".to_string(), id.to_string()),
            ("AccountName".to_string(), username.to_string()),
            ("AccountPassword".to_string(), password.to_string()),
            ("AccountType".to_string(), "Super".to_string()),
        ]);

        debug!(id = id, username = username, "Create account on database instance");
        let _: EmptyResponse = self.execute("CreateAccount", params).await?;

        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> Result<(), Error> {
        let params = BTreeMap::from([("DBInstanceId".to_string(), id.to_string())]);

        debug!(id = id, "Delete database instance");
        let _: EmptyResponse = self.execute("DeleteDBInstance", params).await?;

        Ok(())
    }
}
