//! # Custom resource definition module
//!
//! This module provide custom resource definition managed by the operator,
//! their structures, implementation and reconciliation loop.

use std::fmt::{self, Display, Formatter};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod provider_config;
pub mod rds_instance;

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_SYNCED: &str = "Synced";

pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

// -----------------------------------------------------------------------------
// Reference structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Reference {
    #[serde(rename = "name")]
    pub name: String,
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_CONFIG.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// SecretReference structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct SecretReference {
    #[serde(rename = "namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "name")]
    pub name: String,
}

// -----------------------------------------------------------------------------
// DeletionPolicy enum

/// tells whether the external resource is deleted along with the custom
/// resource or left behind
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Orphan,
}

impl Display for DeletionPolicy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "Delete"),
            Self::Orphan => write!(f, "Orphan"),
        }
    }
}

// -----------------------------------------------------------------------------
// Condition structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "status")]
    pub status: String,
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: String,
    #[serde(rename = "reason")]
    pub reason: String,
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(kind: &str, status: &str, reason: &str, message: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            status: status.to_string(),
            last_transition_time: Utc::now().to_rfc3339(),
            reason: reason.to_string(),
            message,
        }
    }

    pub fn available() -> Self {
        Self::new(CONDITION_READY, CONDITION_STATUS_TRUE, "Available", None)
    }

    pub fn creating() -> Self {
        Self::new(CONDITION_READY, CONDITION_STATUS_FALSE, "Creating", None)
    }

    pub fn deleting() -> Self {
        Self::new(CONDITION_READY, CONDITION_STATUS_FALSE, "Deleting", None)
    }

    pub fn unavailable() -> Self {
        Self::new(CONDITION_READY, CONDITION_STATUS_FALSE, "Unavailable", None)
    }

    pub fn reconcile_success() -> Self {
        Self::new(CONDITION_SYNCED, CONDITION_STATUS_TRUE, "ReconcileSuccess", None)
    }

    pub fn reconcile_error<E>(err: &E) -> Self
    where
        E: ToString,
    {
        Self::new(
            CONDITION_SYNCED,
            CONDITION_STATUS_FALSE,
            "ReconcileError",
            Some(err.to_string()),
        )
    }

    /// returns if both conditions describe the same state, regardless of the
    /// transition time
    pub fn equivalent(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// set the condition in the list, replacing the one of the same type. returns
/// false, if an equivalent condition is already present, in which case the
/// list is left untouched to keep the transition time.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.kind == condition.kind) {
        Some(existing) if existing.equivalent(&condition) => false,
        Some(existing) => {
            *existing = condition;
            true
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}
