//! # Recorder module
//!
//! This module publishes kubernetes events about the custom resources handled
//! by the operator, they are shown by `kubectl describe`.

use std::fmt::{Debug, Display};

use k8s_openapi::api::core::v1::Event;
use kube::{Client, CustomResourceExt, ResourceExt};
use tracing::debug;

use crate::svc::k8s::resource;

pub mod event;

// -----------------------------------------------------------------------------
// Type enumeration

/// type of a kubernetes event, the api server only accepts these two
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Type {
    Normal,
    Warning,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

// -----------------------------------------------------------------------------
// Helper functions

/// publish an event of the given type about the object
#[cfg_attr(feature = "trace", tracing::instrument(skip(client, obj)))]
pub async fn record<T, U>(
    client: Client,
    obj: &T,
    kind: Type,
    reason: &U,
    note: &str,
) -> Result<Event, kube::Error>
where
    T: ResourceExt + CustomResourceExt,
    U: Display + Debug,
{
    let event = event::new(obj, kind, &reason.to_string(), note);

    debug!(
        namespace = ?event.metadata.namespace,
        object = %obj.name_any(),
        kind = kind.as_str(),
        reason = %reason,
        "Publish event about resource",
    );

    resource::create(client, &event).await
}

pub async fn normal<T, U>(
    client: Client,
    obj: &T,
    reason: &U,
    note: &str,
) -> Result<Event, kube::Error>
where
    T: ResourceExt + CustomResourceExt,
    U: Display + Debug,
{
    record(client, obj, Type::Normal, reason, note).await
}

pub async fn warning<T, U>(
    client: Client,
    obj: &T,
    reason: &U,
    note: &str,
) -> Result<Event, kube::Error>
where
    T: ResourceExt + CustomResourceExt,
    U: Display + Debug,
{
    record(client, obj, Type::Warning, reason, note).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_matches_kubernetes_values() {
        assert_eq!(Type::Normal.as_str(), "Normal");
        assert_eq!(Type::Warning.as_str(), "Warning");
    }
}
