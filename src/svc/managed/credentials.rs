//! # Credentials module
//!
//! This module provide the resolution of the access key and region to use to
//! reach the relational database service from a provider configuration or,
//! for resources which still use it, from a deprecated provider.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use tracing::debug;

use crate::svc::{
    crd::{
        provider_config::{
            CredentialsSource, Provider, ProviderConfig, SecretKeySelector, ACCESS_KEY_ID,
            ACCESS_KEY_SECRET,
        },
        Reference,
    },
    managed::{BoxError, Error},
    rds::client::Credentials,
};

// -----------------------------------------------------------------------------
// Reader trait

/// read-only access to provider configurations and secrets
#[async_trait]
pub trait Reader: Send + Sync {
    async fn provider_config(&self, name: &str) -> Result<ProviderConfig, BoxError>;

    async fn provider(&self, name: &str) -> Result<Provider, BoxError>;

    async fn secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, BoxError>;
}

#[async_trait]
impl Reader for kube::Client {
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn provider_config(&self, name: &str) -> Result<ProviderConfig, BoxError> {
        debug!(name = name, "Execute a request to retrieve provider configuration");
        Ok(Api::<ProviderConfig>::all(self.to_owned()).get(name).await?)
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn provider(&self, name: &str) -> Result<Provider, BoxError> {
        debug!(name = name, "Execute a request to retrieve provider");
        Ok(Api::<Provider>::all(self.to_owned()).get(name).await?)
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, BoxError> {
        debug!(
            namespace = namespace,
            name = name,
            "Execute a request to retrieve secret"
        );

        let secret = Api::<Secret>::namespaced(self.to_owned(), namespace)
            .get(name)
            .await?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }
}

// -----------------------------------------------------------------------------
// helpers

/// returns the entry of the secret as a string, an empty string if the entry
/// is missing
fn entry(data: &BTreeMap<String, Vec<u8>>, key: &str) -> String {
    data.get(key)
        .map(|value| String::from_utf8_lossy(value).to_string())
        .unwrap_or_default()
}

/// resolves the credentials referenced by the given provider configuration.
/// Missing entries in the secret are returned as empty strings, the client
/// refuses them.
#[cfg_attr(feature = "trace", tracing::instrument(skip(reader)))]
pub async fn resolve(reader: &dyn Reader, reference: &Reference) -> Result<Credentials, Error> {
    let config = reader
        .provider_config(&reference.name)
        .await
        .map_err(|err| Error::ProviderConfigNotFound(reference.name.to_owned(), err))?;

    let credentials = &config.spec.credentials;
    if CredentialsSource::Secret != credentials.source {
        return Err(Error::UnsupportedCredentialsSource(
            credentials.source.to_string(),
        ));
    }

    let selector = credentials
        .secret_ref
        .as_ref()
        .ok_or_else(|| Error::NoConnectionSecret(reference.name.to_owned()))?;

    read(reader, selector, &config.spec.region).await
}

/// resolves the credentials referenced by the given deprecated provider
#[cfg_attr(feature = "trace", tracing::instrument(skip(reader)))]
pub async fn resolve_provider(
    reader: &dyn Reader,
    reference: &Reference,
) -> Result<Credentials, Error> {
    let provider = reader
        .provider(&reference.name)
        .await
        .map_err(|err| Error::ProviderNotFound(reference.name.to_owned(), err))?;

    read(reader, &provider.spec.credentials_secret_ref, &provider.spec.region).await
}

async fn read(
    reader: &dyn Reader,
    selector: &SecretKeySelector,
    region: &str,
) -> Result<Credentials, Error> {
    let data = reader
        .secret(&selector.namespace, &selector.name)
        .await
        .map_err(|err| {
            Error::SecretFetchFailed(selector.namespace.to_owned(), selector.name.to_owned(), err)
        })?;

    Ok(Credentials {
        access_key_id: entry(&data, ACCESS_KEY_ID),
        access_key_secret: entry(&data, ACCESS_KEY_SECRET),
        region: region.to_owned(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::svc::crd::provider_config::{ProviderCredentials, ProviderSpec, Spec};

    #[derive(Clone, Debug, Default)]
    pub struct FakeReader {
        pub config: Option<ProviderConfig>,
        pub provider: Option<Provider>,
        pub secret: Option<BTreeMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl Reader for FakeReader {
        async fn provider_config(&self, name: &str) -> Result<ProviderConfig, BoxError> {
            self.config
                .to_owned()
                .ok_or_else(|| format!("providerconfigs '{}' not found", name).into())
        }

        async fn provider(&self, name: &str) -> Result<Provider, BoxError> {
            self.provider
                .to_owned()
                .ok_or_else(|| format!("providers '{}' not found", name).into())
        }

        async fn secret(
            &self,
            _namespace: &str,
            name: &str,
        ) -> Result<BTreeMap<String, Vec<u8>>, BoxError> {
            self.secret
                .to_owned()
                .ok_or_else(|| format!("secrets '{}' not found", name).into())
        }
    }

    pub fn provider_config(source: CredentialsSource, with_secret: bool) -> ProviderConfig {
        ProviderConfig::new(
            "default",
            Spec {
                credentials: ProviderCredentials {
                    source,
                    secret_ref: with_secret.then(|| SecretKeySelector {
                        namespace: "crossplane-system".to_string(),
                        name: "alibaba-credentials".to_string(),
                        key: None,
                    }),
                },
                region: "cn-beijing".to_string(),
            },
        )
    }

    pub fn provider() -> Provider {
        Provider::new(
            "legacy",
            ProviderSpec {
                credentials_secret_ref: SecretKeySelector {
                    namespace: "crossplane-system".to_string(),
                    name: "alibaba-credentials".to_string(),
                    key: Some("credentials".to_string()),
                },
                region: "cn-hangzhou".to_string(),
            },
        )
    }

    pub fn secret() -> BTreeMap<String, Vec<u8>> {
        BTreeMap::from([
            (ACCESS_KEY_ID.to_string(), b"id".to_vec()),
            (ACCESS_KEY_SECRET.to_string(), b"secret".to_vec()),
        ])
    }

    #[tokio::test]
    async fn resolve_reads_secret_and_region() {
        let reader = FakeReader {
            config: Some(provider_config(CredentialsSource::Secret, true)),
            secret: Some(secret()),
            ..Default::default()
        };

        let credentials = resolve(&reader, &Reference::default()).await.unwrap();

        assert_eq!(credentials.access_key_id, "id");
        assert_eq!(credentials.access_key_secret, "secret");
        assert_eq!(credentials.region, "cn-beijing");
    }

    #[tokio::test]
    async fn resolve_fails_without_provider_config() {
        let reader = FakeReader::default();

        let err = resolve(&reader, &Reference::default()).await.unwrap_err();

        assert!(matches!(err, Error::ProviderConfigNotFound(name, _) if name == "default"));
    }

    #[tokio::test]
    async fn resolve_rejects_unsupported_source() {
        let reader = FakeReader {
            config: Some(provider_config(
                CredentialsSource::Other("wat".to_string()),
                true,
            )),
            secret: Some(secret()),
            ..Default::default()
        };

        let err = resolve(&reader, &Reference::default()).await.unwrap_err();

        assert!(matches!(&err, Error::UnsupportedCredentialsSource(source) if source == "wat"));
        assert!(err.to_string().contains("wat"));
    }

    #[tokio::test]
    async fn resolve_requires_secret_reference() {
        let reader = FakeReader {
            config: Some(provider_config(CredentialsSource::Secret, false)),
            secret: Some(secret()),
            ..Default::default()
        };

        let err = resolve(&reader, &Reference::default()).await.unwrap_err();

        assert!(matches!(err, Error::NoConnectionSecret(_)));
    }

    #[tokio::test]
    async fn resolve_fails_on_missing_secret() {
        let reader = FakeReader {
            config: Some(provider_config(CredentialsSource::Secret, true)),
            secret: None,
            ..Default::default()
        };

        let err = resolve(&reader, &Reference::default()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::SecretFetchFailed(namespace, name, _)
                if namespace == "crossplane-system" && name == "alibaba-credentials"
        ));
    }

    #[tokio::test]
    async fn resolve_returns_empty_values_for_missing_keys() {
        let reader = FakeReader {
            config: Some(provider_config(CredentialsSource::Secret, true)),
            secret: Some(BTreeMap::new()),
            ..Default::default()
        };

        let credentials = resolve(&reader, &Reference::default()).await.unwrap();

        assert!(credentials.access_key_id.is_empty());
        assert!(credentials.access_key_secret.is_empty());
    }

    #[tokio::test]
    async fn resolve_provider_reads_secret_and_region() {
        let reader = FakeReader {
            provider: Some(provider()),
            secret: Some(secret()),
            ..Default::default()
        };

        let reference = Reference {
            name: "legacy".to_string(),
        };

        let credentials = resolve_provider(&reader, &reference).await.unwrap();

        assert_eq!(credentials.access_key_id, "id");
        assert_eq!(credentials.access_key_secret, "secret");
        assert_eq!(credentials.region, "cn-hangzhou");
    }

    #[tokio::test]
    async fn resolve_provider_fails_without_provider() {
        let reader = FakeReader {
            config: Some(provider_config(CredentialsSource::Secret, true)),
            secret: Some(secret()),
            ..Default::default()
        };

        let reference = Reference {
            name: "legacy".to_string(),
        };

        let err = resolve_provider(&reader, &reference).await.unwrap_err();

        assert!(matches!(err, Error::ProviderNotFound(name, _) if name == "legacy"));
    }
}
