//! # Managed module
//!
//! This module provide the lifecycle contract of external resources managed
//! by the operator: a [`Connector`] which produces an [`ExternalClient`] able
//! to observe, create, update and delete the external resource backing a
//! custom resource.

use std::{any::Any, collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;

use crate::svc::{
    crd::{provider_config::ResourceReference, DeletionPolicy, Reference},
    rds,
};

pub mod connector;
pub mod credentials;
pub mod external;
pub mod tracker;

// -----------------------------------------------------------------------------
// Types

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// credentials published for consumers of the external resource, only keys
/// with a known value are present
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

// -----------------------------------------------------------------------------
// Constants

pub const CONNECTION_SECRET_USER_KEY: &str = "username";
pub const CONNECTION_SECRET_PASSWORD_KEY: &str = "password";
pub const CONNECTION_SECRET_ENDPOINT_KEY: &str = "endpoint";
pub const CONNECTION_SECRET_PORT_KEY: &str = "port";

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("managed resource is not a {0} custom resource")]
    NotSupportedType(&'static str),
    #[error("failed to track provider configuration usage, {0}")]
    UsageTrackingFailed(#[source] BoxError),
    #[error("failed to get provider configuration '{0}', {1}")]
    ProviderConfigNotFound(String, #[source] BoxError),
    #[error("failed to get provider '{0}', {1}")]
    ProviderNotFound(String, #[source] BoxError),
    #[error("credentials source '{0}' is not currently supported")]
    UnsupportedCredentialsSource(String),
    #[error("no connection secret specified in provider configuration '{0}'")]
    NoConnectionSecret(String),
    #[error("failed to get connection secret '{0}/{1}', {2}")]
    SecretFetchFailed(String, String, #[source] BoxError),
    #[error("failed to create rds client, {0}")]
    ClientConstructionFailed(#[source] rds::Error),
    #[error("failed to describe database instance, {0}")]
    DescribeFailed(#[source] rds::Error),
    #[error("failed to create database instance, {0}")]
    InstanceCreationFailed(#[source] rds::Error),
    #[error("failed to create account on database instance, {0}")]
    AccountCreationFailed(#[source] rds::Error),
    #[error("failed to delete database instance, {0}")]
    InstanceDeletionFailed(#[source] rds::Error),
}

// -----------------------------------------------------------------------------
// Managed trait

/// a custom resource which is backed by an external resource
pub trait Managed: Any + Debug + Send + Sync {
    /// returns the reference to the resource itself
    fn resource_reference(&self) -> ResourceReference;

    /// returns the reference to the provider configuration to use
    fn provider_config_reference(&self) -> Reference;

    /// returns the reference to the deprecated provider, if the resource
    /// still relies on it instead of a provider configuration
    fn provider_reference(&self) -> Option<Reference> {
        None
    }

    fn deletion_policy(&self) -> DeletionPolicy;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// -----------------------------------------------------------------------------
// Observation structures

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
}

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

// -----------------------------------------------------------------------------
// Connector trait

/// produces an [`ExternalClient`] for the given managed resource, a new
/// client is built on each call
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, mg: &dyn Managed) -> Result<Box<dyn ExternalClient>, Error>;
}

// -----------------------------------------------------------------------------
// ExternalClient trait

/// lifecycle operations on the external resource backing a managed resource.
/// Implementations record what they observe in the status of the resource and
/// never retry on their own.
#[async_trait]
pub trait ExternalClient: Send + Sync {
    async fn observe(&self, mg: &mut dyn Managed) -> Result<ExternalObservation, Error>;

    async fn create(&self, mg: &mut dyn Managed) -> Result<ExternalCreation, Error>;

    async fn update(&self, mg: &mut dyn Managed) -> Result<ExternalUpdate, Error>;

    async fn delete(&self, mg: &mut dyn Managed) -> Result<(), Error>;
}

// -----------------------------------------------------------------------------
// Operation enum

/// what to do next with the external resource
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// the external resource is in the desired state
    Nothing,
    /// the custom resource could be released, the external resource is gone
    /// or orphaned
    Release,
}

/// returns the operation to perform given what was observed, whether the
/// custom resource is being deleted and its deletion policy
pub fn plan(
    observation: &ExternalObservation,
    deleting: bool,
    policy: &DeletionPolicy,
) -> Operation {
    match (deleting, observation.resource_exists) {
        (true, false) => Operation::Release,
        (true, true) if DeletionPolicy::Orphan == *policy => Operation::Release,
        (true, true) => Operation::Delete,
        (false, false) => Operation::Create,
        (false, true) if !observation.resource_up_to_date => Operation::Update,
        (false, true) => Operation::Nothing,
    }
}
