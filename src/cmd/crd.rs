//! # Custom resource definition module
//!
//! This module provides custom resource module command line interface function
//! implementation

use std::{error::Error, str::FromStr, sync::Arc};

use async_trait::async_trait;
use clap::Subcommand;
use kube::CustomResourceExt;

use crate::{
    cmd::Executor,
    svc::{
        cfg::Configuration,
        crd::{
            provider_config::{Provider, ProviderConfig, ProviderConfigUsage},
            rds_instance::RdsInstance,
        },
    },
};

// -----------------------------------------------------------------------------
// CustomResource enum

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub enum CustomResource {
    RdsInstance,
    ProviderConfig,
    ProviderConfigUsage,
    Provider,
}

impl FromStr for CustomResource {
    type Err = Box<dyn Error + Send + Sync>;

    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rds-instance" => Ok(Self::RdsInstance),
            "provider-config" => Ok(Self::ProviderConfig),
            "provider-config-usage" => Ok(Self::ProviderConfigUsage),
            "provider" => Ok(Self::Provider),
            _ => Err(format!("failed to parse '{}', available options are 'rds-instance', 'provider-config', 'provider-config-usage' or 'provider'", s).into()),
        }
    }
}

impl CustomResource {
    /// returns the custom resource definition serialized as yaml
    pub fn to_yaml(&self) -> Result<String, CustomResourceDefinitionError> {
        match self {
            Self::RdsInstance => serde_yaml::to_string(&RdsInstance::crd()),
            Self::ProviderConfig => serde_yaml::to_string(&ProviderConfig::crd()),
            Self::ProviderConfigUsage => serde_yaml::to_string(&ProviderConfigUsage::crd()),
            Self::Provider => serde_yaml::to_string(&Provider::crd()),
        }
        .map_err(CustomResourceDefinitionError::Serialize)
    }
}

// -----------------------------------------------------------------------------
// CustomResourceDefinitionError enum

#[derive(thiserror::Error, Debug)]
pub enum CustomResourceDefinitionError {
    #[error("failed to serialize custom resource definition, {0}")]
    Serialize(serde_yaml::Error),
}

// -----------------------------------------------------------------------------
// CustomResourceDefinition enum

#[derive(Subcommand, Clone, Debug)]
pub enum CustomResourceDefinition {
    /// View custom resource definition
    #[clap(name = "view", aliases = &["v"])]
    View {
        #[clap(name = "custom-resource")]
        custom_resource: Option<CustomResource>,
    },
}

#[async_trait]
impl Executor for CustomResourceDefinition {
    type Error = CustomResourceDefinitionError;

    #[cfg_attr(feature = "trace", tracing::instrument(skip(config)))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        match self {
            Self::View { custom_resource } => view(config, custom_resource).await,
        }
    }
}

// -----------------------------------------------------------------------------
// view function

#[cfg_attr(feature = "trace", tracing::instrument(skip(_config)))]
pub async fn view(
    _config: Arc<Configuration>,
    custom_resource: &Option<CustomResource>,
) -> Result<(), CustomResourceDefinitionError> {
    let crds = match custom_resource {
        Some(cr) => vec![cr.to_yaml()?],
        None => vec![
            CustomResource::RdsInstance.to_yaml()?,
            CustomResource::ProviderConfig.to_yaml()?,
            CustomResource::ProviderConfigUsage.to_yaml()?,
            CustomResource::Provider.to_yaml()?,
        ],
    };

    print!("{}", crds.join("---\n"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_resource_is_parsed() {
        assert_eq!(
            CustomResource::from_str("RDS-Instance").unwrap(),
            CustomResource::RdsInstance
        );
        assert_eq!(
            CustomResource::from_str("provider-config").unwrap(),
            CustomResource::ProviderConfig
        );
        assert_eq!(
            CustomResource::from_str("provider-config-usage").unwrap(),
            CustomResource::ProviderConfigUsage
        );
        assert_eq!(
            CustomResource::from_str("provider").unwrap(),
            CustomResource::Provider
        );
        assert!(CustomResource::from_str("postgresql").is_err());
    }

    #[test]
    fn definitions_are_serialized() {
        let yaml = CustomResource::RdsInstance.to_yaml().unwrap();

        assert!(yaml.contains("rdsinstances.database.alibaba.crossplane.io"));
        assert!(yaml.contains("kind: CustomResourceDefinition"));
    }
}
