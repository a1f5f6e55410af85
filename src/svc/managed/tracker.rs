//! # Tracker module
//!
//! This module provide the tracking of provider configuration usages, so a
//! provider configuration is known to be in use by managed resources.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{
    api::{ObjectMeta, PostParams},
    Api,
};
use tracing::debug;

use crate::svc::{
    crd::provider_config::{ProviderConfigUsage, UsageSpec},
    managed::{BoxError, Managed},
};

// -----------------------------------------------------------------------------
// Tracker trait

#[async_trait]
pub trait Tracker: Send + Sync {
    /// records that the managed resource uses its provider configuration
    async fn track(&self, mg: &dyn Managed) -> Result<(), BoxError>;
}

// -----------------------------------------------------------------------------
// helpers

/// returns the usage record of the managed resource, owned by it and named
/// after its unique identifier
pub fn usage(mg: &dyn Managed) -> Result<ProviderConfigUsage, BoxError> {
    let reference = mg.resource_reference();
    let uid = reference
        .uid
        .to_owned()
        .ok_or_else(|| BoxError::from("managed resource has no unique identifier"))?;

    let owner = OwnerReference {
        api_version: reference.api_version.to_owned(),
        block_owner_deletion: Some(true),
        controller: Some(true),
        kind: reference.kind.to_owned(),
        name: reference.name.to_owned(),
        uid: uid.to_owned(),
    };

    Ok(ProviderConfigUsage {
        metadata: ObjectMeta {
            name: Some(uid),
            namespace: reference.namespace.to_owned(),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: UsageSpec {
            provider_config_ref: mg.provider_config_reference(),
            resource_ref: reference,
        },
    })
}

#[async_trait]
impl Tracker for kube::Client {
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn track(&self, mg: &dyn Managed) -> Result<(), BoxError> {
        let usage = usage(mg)?;
        let name = usage.metadata.name.to_owned().unwrap_or_default();
        let namespace = usage.metadata.namespace.to_owned().unwrap_or_default();
        let api: Api<ProviderConfigUsage> = Api::namespaced(self.to_owned(), &namespace);

        match api.get_opt(&name).await? {
            Some(existing) if existing.spec == usage.spec => Ok(()),
            Some(existing) => {
                debug!(
                    namespace = &namespace,
                    name = &name,
                    config = &usage.spec.provider_config_ref.name,
                    "Update provider configuration usage"
                );

                let mut usage = usage;
                usage.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&name, &PostParams::default(), &usage).await?;
                Ok(())
            }
            None => {
                debug!(
                    namespace = &namespace,
                    name = &name,
                    config = &usage.spec.provider_config_ref.name,
                    "Create provider configuration usage"
                );

                match api.create(&PostParams::default(), &usage).await {
                    Err(kube::Error::Api(err)) if err.code == 409 => Ok(()),
                    Err(err) => Err(err.into()),
                    Ok(_) => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svc::crd::{
        provider_config::ResourceReference, DeletionPolicy, Reference, DEFAULT_PROVIDER_CONFIG,
    };

    #[derive(Debug)]
    struct Resource {
        uid: Option<String>,
    }

    impl Managed for Resource {
        fn resource_reference(&self) -> ResourceReference {
            ResourceReference {
                api_version: "database.alibaba.crossplane.io/v1alpha1".to_string(),
                kind: "RdsInstance".to_string(),
                name: "test".to_string(),
                namespace: Some("default".to_string()),
                uid: self.uid.to_owned(),
            }
        }

        fn provider_config_reference(&self) -> Reference {
            Reference::default()
        }

        fn deletion_policy(&self) -> DeletionPolicy {
            DeletionPolicy::Delete
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn usage_is_owned_by_the_resource() {
        let mg = Resource {
            uid: Some("e1f3".to_string()),
        };

        let usage = usage(&mg).unwrap();
        let ObjectMeta {
            name,
            namespace,
            owner_references,
            ..
        } = usage.metadata;

        assert_eq!(name, Some("e1f3".to_string()));
        assert_eq!(namespace, Some("default".to_string()));
        assert_eq!(usage.spec.provider_config_ref.name, DEFAULT_PROVIDER_CONFIG);
        assert_eq!(usage.spec.resource_ref.name, "test");

        let owners = owner_references.unwrap_or_default();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "e1f3");
        assert_eq!(owners[0].kind, "RdsInstance");
    }

    #[test]
    fn usage_requires_an_identifier() {
        let mg = Resource { uid: None };

        assert!(usage(&mg).is_err());
    }
}
