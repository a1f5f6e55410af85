//! # Connector module
//!
//! This module provide the connector which binds a [`RdsInstance`] custom
//! resource to a backend client built from the credentials of its provider
//! configuration, or of its deprecated provider.
//!
//! [`RdsInstance`]: crate::svc::crd::rds_instance::RdsInstance

use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use async_trait::async_trait;
use tracing::debug;

use crate::svc::{
    crd::rds_instance::{RdsInstance, KIND},
    managed::{
        self, credentials::Reader, external::External, tracker::Tracker, Error, ExternalClient,
        Managed,
    },
    rds::{self, client::Credentials, password::Generator},
};

// -----------------------------------------------------------------------------
// Types

/// builds a backend client from resolved credentials
pub type NewClientFn =
    Arc<dyn Fn(Credentials) -> Result<Arc<dyn rds::Client>, rds::Error> + Send + Sync>;

// -----------------------------------------------------------------------------
// Connector structure

#[derive(Clone)]
pub struct Connector {
    reader: Arc<dyn Reader>,
    tracker: Arc<dyn Tracker>,
    new_client: NewClientFn,
    password: Arc<dyn Generator>,
}

impl Debug for Connector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector").finish_non_exhaustive()
    }
}

impl Connector {
    pub fn new(
        reader: Arc<dyn Reader>,
        tracker: Arc<dyn Tracker>,
        new_client: NewClientFn,
        password: Arc<dyn Generator>,
    ) -> Self {
        Self {
            reader,
            tracker,
            new_client,
            password,
        }
    }
}

#[async_trait]
impl managed::Connector for Connector {
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn connect(&self, mg: &dyn Managed) -> Result<Box<dyn ExternalClient>, Error> {
        if mg.as_any().downcast_ref::<RdsInstance>().is_none() {
            return Err(Error::NotSupportedType(KIND));
        }

        let credentials = match mg.provider_reference() {
            Some(reference) => {
                let credentials =
                    managed::credentials::resolve_provider(self.reader.as_ref(), &reference)
                        .await?;

                debug!(
                    provider = &reference.name,
                    region = &credentials.region,
                    "Create rds client using deprecated provider"
                );

                credentials
            }
            None => {
                self.tracker
                    .track(mg)
                    .await
                    .map_err(Error::UsageTrackingFailed)?;

                let reference = mg.provider_config_reference();
                let credentials =
                    managed::credentials::resolve(self.reader.as_ref(), &reference).await?;

                debug!(
                    config = &reference.name,
                    region = &credentials.region,
                    "Create rds client using provider configuration"
                );

                credentials
            }
        };

        let client = (self.new_client)(credentials).map_err(Error::ClientConstructionFailed)?;

        Ok(Box::new(External::new(client, self.password.to_owned())))
    }
}
