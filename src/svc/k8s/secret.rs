//! # Secret module
//!
//! This module provide helpers to publish connection details of a custom
//! resource into a kubernetes secret

use k8s_openapi::{api::core::v1::Secret, ByteString};
use kube::{api::ObjectMeta, Client, CustomResourceExt, ResourceExt};
use tracing::debug;

use crate::svc::{crd::SecretReference, k8s::resource, managed::ConnectionDetails};

/// returns the secret described by the reference filled with the given
/// connection details, the secret is owned by the object when they live in
/// the same namespace
pub fn new<T>(obj: &T, reference: &SecretReference, details: ConnectionDetails) -> Secret
where
    T: ResourceExt + CustomResourceExt,
{
    let namespace = reference
        .namespace
        .to_owned()
        .or_else(|| obj.namespace())
        .unwrap_or_default();

    // owner references across namespaces are rejected by the garbage collector
    let owner_references = if obj.namespace().as_deref() == Some(namespace.as_str()) {
        Some(vec![resource::owner_reference(obj)])
    } else {
        None
    };

    Secret {
        metadata: ObjectMeta {
            name: Some(reference.name.to_owned()),
            namespace: Some(namespace),
            owner_references,
            ..Default::default()
        },
        data: Some(
            details
                .into_iter()
                .map(|(key, value)| (key, ByteString(value)))
                .collect(),
        ),
        ..Default::default()
    }
}

/// returns the existing secret with the keys of the given one written over,
/// keys which are only in the existing secret are kept
pub fn merge(existing: &Secret, secret: &Secret) -> Secret {
    let mut merged = existing.to_owned();
    let mut data = merged.data.take().unwrap_or_default();

    if let Some(entries) = &secret.data {
        data.extend(entries.to_owned());
    }

    merged.data = Some(data);
    if merged.metadata.owner_references.is_none() {
        merged.metadata.owner_references = secret.metadata.owner_references.to_owned();
    }

    merged
}

/// returns the merged secret and the patch to apply on the existing one, or
/// none when the existing secret already holds the data
pub fn changes(
    existing: &Secret,
    secret: &Secret,
) -> Result<Option<(Secret, json_patch::Patch)>, kube::Error> {
    let merged = merge(existing, secret);
    let patch = resource::diff(existing, &merged).map_err(kube::Error::SerdeError)?;
    if patch.0.is_empty() {
        return Ok(None);
    }

    Ok(Some((merged, patch)))
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client)))]
/// create or update the secret, returns the written secret or none when the
/// existing one already holds the same data
pub async fn upsert(client: Client, secret: &Secret) -> Result<Option<Secret>, kube::Error> {
    let (namespace, name) = resource::namespaced_name(secret);

    match resource::get::<Secret>(client.to_owned(), &namespace, &name).await? {
        Some(existing) => match changes(&existing, secret)? {
            Some((merged, patch)) => Ok(Some(resource::patch(client, &merged, patch).await?)),
            None => {
                debug!(
                    namespace = &namespace,
                    name = &name,
                    "Secret is already up to date",
                );

                Ok(None)
            }
        },
        None => Ok(Some(resource::create(client, secret).await?)),
    }
}
