//! # RdsInstance custom resource
//!
//! This module provide the rds instance custom resource, its definition and
//! the reconciliation loop which drives the external database instance
//! through the [`managed`] lifecycle.

use std::{
    any::Any,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use async_trait::async_trait;
use futures::TryFutureExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller, watcher, Controller},
    Api, CustomResource, Resource, ResourceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::svc::{
    crd::{
        provider_config::ResourceReference, set_condition, Condition, DeletionPolicy, Reference,
        SecretReference,
    },
    k8s::{self, finalizer, recorder, resource, secret, Context, ControllerBuilder},
    managed::{self, ConnectionDetails, Connector, Managed, Operation},
    rds::{Endpoint, InstanceStatus},
};

// -----------------------------------------------------------------------------
// Constants

pub const KIND: &str = "RdsInstance";
pub const FINALIZER: &str = "database.alibaba.crossplane.io/rds-instance";
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

// -----------------------------------------------------------------------------
// Parameters structure

/// desired settings of the database instance
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Parameters {
    #[serde(rename = "masterUsername")]
    pub master_username: String,
    #[serde(rename = "engine")]
    pub engine: String,
    #[serde(rename = "engineVersion")]
    pub engine_version: String,
    #[serde(rename = "securityIPList", default)]
    pub security_ip_list: Vec<String>,
    #[serde(rename = "dbInstanceClass")]
    pub db_instance_class: String,
    #[serde(rename = "dbInstanceStorageInGB")]
    pub db_instance_storage_in_gb: i32,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[kube(group = "database.alibaba.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "RdsInstance")]
#[kube(singular = "rdsinstance")]
#[kube(plural = "rdsinstances")]
#[kube(shortname = "rds")]
#[kube(status = "Status")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
#[kube(
    printcolumn = r#"{"name":"engine", "type":"string", "description":"Engine", "jsonPath":".spec.forProvider.engine"}"#
)]
#[kube(
    printcolumn = r#"{"name":"instance", "type":"string", "description":"Instance identifier", "jsonPath":".status.atProvider.dbInstanceID"}"#
)]
#[kube(
    printcolumn = r#"{"name":"status", "type":"string", "description":"Instance status", "jsonPath":".status.atProvider.dbInstanceStatus"}"#
)]
pub struct Spec {
    #[serde(rename = "forProvider")]
    pub for_provider: Parameters,
    #[serde(
        rename = "providerConfigRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_config_ref: Option<Reference>,
    /// deprecated, use `providerConfigRef` instead
    #[serde(rename = "providerRef", default, skip_serializing_if = "Option::is_none")]
    pub provider_ref: Option<Reference>,
    #[serde(
        rename = "writeConnectionSecretToRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub write_connection_secret_to_ref: Option<SecretReference>,
    #[serde(rename = "deletionPolicy", default)]
    pub deletion_policy: DeletionPolicy,
}

// -----------------------------------------------------------------------------
// Observation structure

/// what is known about the database instance on the backend side
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Observation {
    #[serde(rename = "dbInstanceID", default, skip_serializing_if = "Option::is_none")]
    pub db_instance_id: Option<String>,
    #[serde(
        rename = "dbInstanceStatus",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_instance_status: Option<InstanceStatus>,
    #[serde(rename = "endpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(rename = "accountReady", default)]
    pub account_ready: bool,
}

// -----------------------------------------------------------------------------
// Status structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Status {
    #[serde(rename = "atProvider", default)]
    pub at_provider: Observation,
    #[serde(rename = "conditions", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// -----------------------------------------------------------------------------
// RdsInstance implementation

impl RdsInstance {
    /// returns the backend identifier of the database instance, if one has
    /// been recorded
    pub fn instance_id(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_instance_id.to_owned())
            .filter(|id| !id.is_empty())
    }

    pub fn external_name(&self) -> Option<String> {
        self.annotations()
            .get(EXTERNAL_NAME_ANNOTATION)
            .filter(|name| !name.is_empty())
            .cloned()
    }

    pub fn set_external_name(&mut self, name: &str) {
        self.annotations_mut()
            .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
    }

    pub fn observation(&self) -> Observation {
        self.status.to_owned().unwrap_or_default().at_provider
    }

    pub fn observation_mut(&mut self) -> &mut Observation {
        &mut self.status.get_or_insert_with(Status::default).at_provider
    }

    pub fn condition(&self, kind: &str) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.iter().find(|c| c.kind == kind))
    }

    /// set the condition on the status, returns if the status has changed
    pub fn set_condition(&mut self, condition: Condition) -> bool {
        let status = self.status.get_or_insert_with(Status::default);

        set_condition(&mut status.conditions, condition)
    }
}

impl Managed for RdsInstance {
    fn resource_reference(&self) -> ResourceReference {
        ResourceReference {
            api_version: Self::api_version(&()).to_string(),
            kind: Self::kind(&()).to_string(),
            name: self.name_any(),
            namespace: self.namespace(),
            uid: self.uid(),
        }
    }

    fn provider_config_reference(&self) -> Reference {
        self.spec.provider_config_ref.to_owned().unwrap_or_default()
    }

    fn provider_reference(&self) -> Option<Reference> {
        match &self.spec.provider_config_ref {
            Some(_) => None,
            None => self.spec.provider_ref.to_owned(),
        }
    }

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy.to_owned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// -----------------------------------------------------------------------------
// Action structure

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub enum Action {
    UpsertFinalizer,
    CreateInstance,
    UpdateInstance,
    UpsertSecret,
    SynchronizationFailed,
    DeleteInstance,
    DeleteFinalizer,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UpsertFinalizer => write!(f, "UpsertFinalizer"),
            Self::CreateInstance => write!(f, "CreateInstance"),
            Self::UpdateInstance => write!(f, "UpdateInstance"),
            Self::UpsertSecret => write!(f, "UpsertSecret"),
            Self::SynchronizationFailed => write!(f, "SynchronizationFailed"),
            Self::DeleteInstance => write!(f, "DeleteInstance"),
            Self::DeleteFinalizer => write!(f, "DeleteFinalizer"),
        }
    }
}

// -----------------------------------------------------------------------------
// ReconcilerError enum

#[derive(thiserror::Error, Debug)]
pub enum ReconcilerError {
    #[error("failed to reconcile resource, {0}")]
    Reconcile(String),
    #[error("failed to synchronize external resource, {0}")]
    Managed(managed::Error),
    #[error("failed to execute request on kubernetes api, {0}")]
    KubeClient(kube::Error),
    #[error("failed to compute diff between the original and modified object, {0}")]
    Diff(serde_json::Error),
    #[error("failed to reconcile resource in time, {0}")]
    Timeout(tokio::time::error::Elapsed),
}

impl From<kube::Error> for ReconcilerError {
    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn from(err: kube::Error) -> Self {
        Self::KubeClient(err)
    }
}

impl From<managed::Error> for ReconcilerError {
    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn from(err: managed::Error) -> Self {
        Self::Managed(err)
    }
}

impl From<tokio::time::error::Elapsed> for ReconcilerError {
    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err)
    }
}

impl From<controller::Error<Self, watcher::Error>> for ReconcilerError {
    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn from(err: controller::Error<ReconcilerError, watcher::Error>) -> Self {
        Self::Reconcile(err.to_string())
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// connects to the backend, observes the database instance and creates or
/// updates it as planned. returns the performed operation and the connection
/// details to publish.
#[cfg_attr(feature = "trace", tracing::instrument(skip(connector)))]
pub async fn synchronize(
    connector: &dyn Connector,
    obj: &mut RdsInstance,
) -> Result<(Operation, ConnectionDetails), managed::Error> {
    let external = connector.connect(&*obj).await?;
    let observation = external.observe(obj).await?;
    let operation = managed::plan(&observation, false, &obj.deletion_policy());

    let details = match operation {
        Operation::Create => external.create(obj).await?.connection_details,
        Operation::Update => {
            let mut details = observation.connection_details;
            details.extend(external.update(obj).await?.connection_details);
            details
        }
        _ => observation.connection_details,
    };

    Ok((operation, details))
}

/// connects to the backend, observes the database instance and deletes it
/// if the deletion policy allows it. returns the performed operation,
/// [`Operation::Release`] once the custom resource could be released.
#[cfg_attr(feature = "trace", tracing::instrument(skip(connector)))]
pub async fn terminate(
    connector: &dyn Connector,
    obj: &mut RdsInstance,
) -> Result<Operation, managed::Error> {
    let external = connector.connect(&*obj).await?;
    let observation = external.observe(obj).await?;
    let operation = managed::plan(&observation, true, &obj.deletion_policy());

    if Operation::Delete == operation {
        external.delete(obj).await?;
    }

    Ok(operation)
}

// -----------------------------------------------------------------------------
// Reconciler structure

#[derive(Clone, Default, Debug)]
pub struct Reconciler {}

impl Reconciler {
    /// set the synced condition following the result, persist annotations and
    /// status of the custom resource and warn on new failures
    async fn persist<T>(
        kube: &kube::Client,
        origin: &RdsInstance,
        mut modified: RdsInstance,
        result: &Result<T, managed::Error>,
    ) -> Result<RdsInstance, ReconcilerError> {
        let changed = match result {
            Ok(_) => modified.set_condition(Condition::reconcile_success()),
            Err(err) => modified.set_condition(Condition::reconcile_error(err)),
        };

        let patch = resource::diff(origin, &modified).map_err(ReconcilerError::Diff)?;
        let modified = resource::patch(kube.to_owned(), &modified, patch.to_owned())
            .and_then(|modified| resource::patch_status(kube.to_owned(), modified, patch))
            .await?;

        if let Err(err) = result {
            if changed {
                let action = &Action::SynchronizationFailed;
                let message = &err.to_string();
                recorder::warning(kube.to_owned(), &modified, action, message).await?;
            }
        }

        Ok(modified)
    }
}

impl ControllerBuilder<RdsInstance> for Reconciler {
    fn build(&self, ctx: Arc<Context>) -> Controller<RdsInstance> {
        let client = ctx.kube.to_owned();
        let secret = Api::<Secret>::all(client.to_owned());

        Controller::new(Api::all(client), watcher::Config::default())
            .owns(secret, watcher::Config::default())
    }
}

#[async_trait]
impl k8s::Reconciler<RdsInstance> for Reconciler {
    type Error = ReconcilerError;

    async fn upsert(ctx: Arc<Context>, origin: Arc<RdsInstance>) -> Result<(), ReconcilerError> {
        let Context {
            kube,
            connector,
            config: _,
        } = ctx.as_ref();

        let kind = RdsInstance::kind(&()).to_string();
        let (namespace, name) = resource::namespaced_name(&*origin);

        // ---------------------------------------------------------------------
        // Step 1: set finalizer

        let origin = if finalizer::contains(&*origin, FINALIZER) {
            (*origin).to_owned()
        } else {
            info!(
                kind = &kind,
                namespace = &namespace,
                name = &name,
                "Set finalizer on custom resource",
            );

            let modified = finalizer::add((*origin).to_owned(), FINALIZER);
            let patch = resource::diff(&*origin, &modified).map_err(ReconcilerError::Diff)?;
            let modified = resource::patch(kube.to_owned(), &modified, patch).await?;

            let action = &Action::UpsertFinalizer;
            let message = &format!("Create finalizer '{}'", FINALIZER);
            recorder::normal(kube.to_owned(), &modified, action, message).await?;

            modified
        };

        // ---------------------------------------------------------------------
        // Step 2: synchronize the database instance

        info!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Synchronize database instance of custom resource",
        );

        let mut modified = origin.to_owned();
        let result = synchronize(connector.as_ref(), &mut modified).await;

        // ---------------------------------------------------------------------
        // Step 3: update annotations and status

        debug!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Update information and status of custom resource",
        );

        let modified = Self::persist(kube, &origin, modified, &result).await?;
        let (operation, details) = result?;

        match operation {
            Operation::Create => {
                let action = &Action::CreateInstance;
                let message = &format!(
                    "Create database instance '{}'",
                    modified.instance_id().unwrap_or_default()
                );
                recorder::normal(kube.to_owned(), &modified, action, message).await?;
            }
            Operation::Update => {
                let action = &Action::UpdateInstance;
                let message = "Update database instance";
                recorder::normal(kube.to_owned(), &modified, action, message).await?;
            }
            _ => {}
        }

        // ---------------------------------------------------------------------
        // Step 4: publish connection details

        let reference = match &modified.spec.write_connection_secret_to_ref {
            Some(reference) if !details.is_empty() => reference.to_owned(),
            _ => return Ok(()),
        };

        let s = secret::new(&modified, &reference, details);
        let (s_ns, s_name) = resource::namespaced_name(&s);

        info!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            secret_namespace = &s_ns,
            secret_name = &s_name,
            "Upsert connection secret of custom resource",
        );

        if let Some(secret) = secret::upsert(kube.to_owned(), &s).await? {
            let action = &Action::UpsertSecret;
            let message = &format!("Update connection secret '{}'", secret.name_any());
            recorder::normal(kube.to_owned(), &modified, action, message).await?;
        }

        Ok(())
    }

    async fn delete(ctx: Arc<Context>, origin: Arc<RdsInstance>) -> Result<(), ReconcilerError> {
        let Context {
            kube,
            connector,
            config: _,
        } = ctx.as_ref();

        let kind = RdsInstance::kind(&()).to_string();
        let (namespace, name) = resource::namespaced_name(&*origin);

        // ---------------------------------------------------------------------
        // Step 1: delete the database instance

        info!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            policy = %origin.deletion_policy(),
            "Delete database instance of custom resource",
        );

        let mut modified = (*origin).to_owned();
        let result = terminate(connector.as_ref(), &mut modified).await;

        debug!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Update information and status of custom resource",
        );

        let modified = Self::persist(kube, &origin, modified, &result).await?;
        match result? {
            Operation::Release => {}
            Operation::Delete => {
                let action = &Action::DeleteInstance;
                let message = &format!(
                    "Delete database instance '{}'",
                    modified.instance_id().unwrap_or_default()
                );
                recorder::normal(kube.to_owned(), &modified, action, message).await?;

                // the finalizer is removed once the instance is gone, which
                // is observed on a next reconciliation
                return Ok(());
            }
            operation => {
                warn!(
                    kind = &kind,
                    namespace = &namespace,
                    name = &name,
                    operation = ?operation,
                    "Unexpected operation while deleting custom resource",
                );
                return Ok(());
            }
        }

        // ---------------------------------------------------------------------
        // Step 2: remove the finalizer

        info!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Remove finalizer on custom resource",
        );

        let released = finalizer::remove(modified.to_owned(), FINALIZER);

        let action = &Action::DeleteFinalizer;
        let message = "Delete finalizer from custom resource";
        recorder::normal(kube.to_owned(), &released, action, message).await?;

        debug!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Update information of custom resource",
        );

        let patch = resource::diff(&modified, &released).map_err(ReconcilerError::Diff)?;
        resource::patch(kube.to_owned(), &released, patch).await?;

        Ok(())
    }
}
