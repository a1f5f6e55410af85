//! # Resource module
//!
//! This module provide helpers on kubernetes [`Resource`]

use std::fmt::Debug;

use k8s_openapi::{
    api::core::v1::ObjectReference, apimachinery::pkg::apis::meta::v1::OwnerReference,
    NamespaceResourceScope,
};
use kube::{
    api::{Patch, PatchParams, PostParams},
    Api, Client, CustomResourceExt, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

// -----------------------------------------------------------------------------
// Helpers functions

/// returns if the resource is considered from kubernetes point of view as deleted
pub fn deleted<T>(obj: &T) -> bool
where
    T: Resource,
{
    obj.meta().deletion_timestamp.is_some()
}

/// returns the namespace and name of the kubernetes resource, the namespace is
/// empty for cluster scoped resources
pub fn namespaced_name<T>(obj: &T) -> (String, String)
where
    T: ResourceExt,
{
    (obj.namespace().unwrap_or_default(), obj.name_any())
}

/// returns differnce between the two given object serialize as json patch
pub fn diff<T>(origin: &T, modified: &T) -> Result<json_patch::Patch, serde_json::Error>
where
    T: Serialize,
{
    Ok(json_patch::diff(
        &serde_json::to_value(origin)?,
        &serde_json::to_value(modified)?,
    ))
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client)))]
/// returns the resource with the given name in the namespace, if it exists
pub async fn get<T>(client: Client, namespace: &str, name: &str) -> Result<Option<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + DeserializeOwned + Clone + Debug,
    <T as Resource>::DynamicType: Default,
{
    debug!(
        kind = T::kind(&Default::default()).to_string(),
        namespace = namespace,
        name = name,
        "Execute a request to retrieve resource",
    );

    Api::namespaced(client, namespace).get_opt(name).await
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client)))]
/// make a create request on the given resource
pub async fn create<T>(client: Client, obj: &T) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + DeserializeOwned + Serialize + Clone + Debug,
    <T as Resource>::DynamicType: Default,
{
    let (namespace, name) = namespaced_name(obj);

    debug!(
        kind = T::kind(&Default::default()).to_string(),
        namespace = &namespace,
        name = &name,
        "Execute a request to create resource",
    );

    Api::namespaced(client, &namespace)
        .create(&PostParams::default(), obj)
        .await
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client)))]
/// make a patch request on the given resource using the given patch
pub async fn patch<T>(client: Client, obj: &T, patch: json_patch::Patch) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + DeserializeOwned + Serialize + Clone + Debug,
    <T as Resource>::DynamicType: Default,
{
    let (namespace, name) = namespaced_name(obj);

    if patch.0.is_empty() {
        debug!(
            namespace = &namespace,
            name = &name,
            "Skip patch request on resource, no operation to apply",
        );

        return Ok(obj.to_owned());
    }

    debug!(
        namespace = &namespace,
        name = &name,
        patch = %serde_json::to_string(&patch).unwrap_or_default(),
        "Execute patch request on resource",
    );

    Api::namespaced(client, &namespace)
        .patch(&name, &PatchParams::default(), &Patch::Json::<T>(patch))
        .await
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client)))]
/// make a patch request on the given resource's status using the given patch
pub async fn patch_status<T>(
    client: Client,
    obj: T,
    patch: json_patch::Patch,
) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + DeserializeOwned + Serialize + Clone + Debug,
    <T as Resource>::DynamicType: Default,
{
    let (namespace, name) = namespaced_name(&obj);

    if patch.0.is_empty() {
        debug!(
            namespace = &namespace,
            name = &name,
            "Skip patch request on resource's status, no operation to apply",
        );

        return Ok(obj);
    }

    debug!(
        namespace = &namespace,
        name = &name,
        patch = %serde_json::to_string(&patch).unwrap_or_default(),
        "Execute patch request on resource's status",
    );

    Api::namespaced(client, &namespace)
        .patch_status(&name, &PatchParams::default(), &Patch::Json::<T>(patch))
        .await
}

/// returns a owner references object pointing to the given resource
pub fn owner_reference<T>(obj: &T) -> OwnerReference
where
    T: ResourceExt + CustomResourceExt,
{
    let api_resource = T::api_resource();

    OwnerReference {
        api_version: api_resource.api_version,
        block_owner_deletion: Some(true),
        controller: None,
        kind: api_resource.kind,
        name: obj.name_any(),
        uid: obj.uid().unwrap_or_default(),
    }
}

/// returns an object reference pointing to the given resource
pub fn object_reference<T>(obj: &T) -> ObjectReference
where
    T: ResourceExt + CustomResourceExt,
{
    let api_resource = T::api_resource();

    ObjectReference {
        api_version: Some(api_resource.api_version),
        field_path: None,
        kind: Some(api_resource.kind),
        name: Some(obj.name_any()),
        namespace: obj.namespace(),
        resource_version: obj.resource_version(),
        uid: obj.uid(),
    }
}
