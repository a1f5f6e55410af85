//! # Event module
//!
//! This module builds core/v1 events which point to a custom resource

use chrono::Utc;
use k8s_openapi::{
    api::core::v1::{Event, EventSource},
    apimachinery::pkg::apis::meta::v1::{MicroTime, Time},
};
use kube::{api::ObjectMeta, CustomResourceExt, ResourceExt};

use crate::svc::k8s::{recorder::Type, resource};

// -----------------------------------------------------------------------------
// constants

pub const COMPONENT: &str = env!("CARGO_PKG_NAME");

// -----------------------------------------------------------------------------
// Helper functions

/// returns the name of the host running the operator
fn host() -> Option<String> {
    hostname::get()
        .ok()
        .map(|host| host.to_string_lossy().to_string())
}

/// returns a new event about the object, the api server completes the name
/// from the object's one
pub fn new<T>(obj: &T, kind: Type, reason: &str, note: &str) -> Event
where
    T: ResourceExt + CustomResourceExt,
{
    let now = Utc::now();
    let host = host();

    Event {
        metadata: ObjectMeta {
            namespace: obj.namespace(),
            generate_name: Some(format!("{}.", obj.name_any())),
            ..Default::default()
        },
        involved_object: resource::object_reference(obj),
        type_: Some(kind.as_str().to_string()),
        reason: Some(reason.to_string()),
        action: Some(reason.to_string()),
        message: Some(note.to_string()),
        count: Some(1),
        first_timestamp: Some(Time(now)),
        last_timestamp: Some(Time(now)),
        event_time: Some(MicroTime(now)),
        reporting_component: Some(COMPONENT.to_string()),
        reporting_instance: host.to_owned().or_else(|| Some(COMPONENT.to_string())),
        source: Some(EventSource {
            component: Some(COMPONENT.to_string()),
            host,
        }),
        ..Default::default()
    }
}
