//! # Kubernetes module
//!
//! This module provide kubernetes custom resources helpers, the reconciliation
//! traits and the context given to each reconciler

use std::{error::Error, fmt::Debug, hash::Hash, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::{
    runtime::{
        controller::{self, Action},
        watcher, Controller,
    },
    CustomResourceExt, Resource, ResourceExt,
};
#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{opts, register_counter_vec, CounterVec};
use serde::de::DeserializeOwned;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, trace};
#[cfg(feature = "trace")]
use tracing::Instrument;

use crate::svc::{cfg::Configuration, managed};

pub mod client;
pub mod finalizer;
pub mod recorder;
pub mod resource;
pub mod secret;

// -----------------------------------------------------------------------------
// Constants

pub const RECONCILIATION_UPSERT_EVENT: &str = "upsert";
pub const RECONCILIATION_DELETE_EVENT: &str = "delete";

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static RECONCILIATION_SUCCESS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_success",
            "number of successful reconciliation"
        ),
        &["kind"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_success' to not be already registered")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_FAILED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_failed",
            "number of failed reconciliation"
        ),
        &["kind"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_failed' to not be already registered")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_EVENT: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_event",
            "number of upsert or delete event",
        ),
        &["kind", "namespace", "event"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_event' to not be already registered")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_DURATION: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_duration",
            "duration of reconciliation",
        ),
        &["kind", "unit"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_duration' to not be already registered")
});

// -----------------------------------------------------------------------------
// Context structure

/// contains clients to interact with kubernetes and the connector used to
/// reach external resources
#[derive(Clone)]
pub struct Context {
    pub kube: kube::Client,
    pub connector: Arc<dyn managed::Connector>,
    pub config: Arc<Configuration>,
}

impl From<(kube::Client, Arc<dyn managed::Connector>, Arc<Configuration>)> for Context {
    fn from(
        (kube, connector, config): (kube::Client, Arc<dyn managed::Connector>, Arc<Configuration>),
    ) -> Self {
        Self {
            kube,
            connector,
            config,
        }
    }
}

impl Context {
    pub fn new(
        kube: kube::Client,
        connector: Arc<dyn managed::Connector>,
        config: Arc<Configuration>,
    ) -> Self {
        Self::from((kube, connector, config))
    }
}

// -----------------------------------------------------------------------------
// ControllerBuilder trait

/// provides a common way to create a kubernetes
/// controller [`Controller<T>`]
pub trait ControllerBuilder<T>
where
    T: Resource + Clone + Debug,
    <T as Resource>::DynamicType: Eq + Hash,
{
    /// returns a new created kubernetes controller
    fn build(&self, ctx: Arc<Context>) -> Controller<T>;
}

// -----------------------------------------------------------------------------
// Reconciler trait

/// provides two method which is given to a kubenetes controller
/// [`Controller<T>`]
#[async_trait]
pub trait Reconciler<T>
where
    T: ResourceExt + CustomResourceExt + Debug + Clone + Send + Sync + 'static,
{
    type Error: Error + From<tokio::time::error::Elapsed> + Send + Sync;

    /// create or update the object, this is part of the the reconcile function
    async fn upsert(ctx: Arc<Context>, obj: Arc<T>) -> Result<(), Self::Error>;

    /// delete the object from kubernetes and third parts
    async fn delete(ctx: Arc<Context>, obj: Arc<T>) -> Result<(), Self::Error>;

    /// returns a [`Action`] to perform following the given error
    fn retry(obj: Arc<T>, err: &Self::Error, ctx: Arc<Context>) -> Action {
        let interval = Duration::from_secs(ctx.config.operator.retry_interval);

        trace!(
            kind = %T::api_resource().kind,
            name = %obj.name_any(),
            namespace = ?obj.namespace(),
            duration = interval.as_millis() as u64,
            error = err.to_string(),
            "Requeue failed reconciliation",
        );

        Action::requeue(interval)
    }

    /// process the object and perform actions on kubernetes and/or the
    /// external resources, returns a [`Action`] to perform another
    /// reconciliation later or an error, if something gets wrong.
    async fn reconcile(obj: Arc<T>, ctx: Arc<Context>) -> Result<Action, Self::Error> {
        let (namespace, name) = resource::namespaced_name(&*obj);
        let api_resource = T::api_resource();
        let deadline = Duration::from_secs(ctx.config.operator.timeout);
        let interval = Duration::from_secs(ctx.config.operator.poll_interval);

        if resource::deleted(&*obj) {
            info!(
                kind = &api_resource.kind,
                uid = ?obj.meta().uid,
                name = &name,
                namespace = &namespace,
                "Received deletion event for custom resource",
            );

            #[cfg(feature = "metrics")]
            RECONCILIATION_EVENT
                .with_label_values(&[&api_resource.kind, &namespace, RECONCILIATION_DELETE_EVENT])
                .inc();

            #[cfg(not(feature = "trace"))]
            let result = timeout(deadline, Self::delete(ctx.to_owned(), obj.to_owned())).await;
            #[cfg(feature = "trace")]
            let result = timeout(deadline, Self::delete(ctx.to_owned(), obj.to_owned()))
                .instrument(tracing::info_span!("Reconciler::delete"))
                .await;

            if let Err(err) = result.unwrap_or_else(|elapsed| Err(elapsed.into())) {
                error!(
                    kind = &api_resource.kind,
                    uid = ?obj.meta().uid,
                    name = &name,
                    namespace = &namespace,
                    error = err.to_string(),
                    "Failed to delete custom resource",
                );

                return Err(err);
            }
        } else {
            info!(
                kind = &api_resource.kind,
                uid = ?obj.meta().uid,
                name = &name,
                namespace = &namespace,
                "Received upsertion event for custom resource",
            );

            #[cfg(feature = "metrics")]
            RECONCILIATION_EVENT
                .with_label_values(&[&api_resource.kind, &namespace, RECONCILIATION_UPSERT_EVENT])
                .inc();

            #[cfg(not(feature = "trace"))]
            let result = timeout(deadline, Self::upsert(ctx.to_owned(), obj.to_owned())).await;
            #[cfg(feature = "trace")]
            let result = timeout(deadline, Self::upsert(ctx.to_owned(), obj.to_owned()))
                .instrument(tracing::info_span!("Reconciler::upsert"))
                .await;

            if let Err(err) = result.unwrap_or_else(|elapsed| Err(elapsed.into())) {
                error!(
                    kind = &api_resource.kind,
                    uid = ?obj.meta().uid,
                    name = &name,
                    namespace = &namespace,
                    error = err.to_string(),
                    "Failed to upsert custom resource",
                );

                return Err(err);
            }
        }

        Ok(Action::requeue(interval))
    }
}

// -----------------------------------------------------------------------------
// WatcherError trait

/// group other trait needed to provide a default
/// implementation for [`Watcher<T>`] trait
pub trait WatcherError:
    From<kube::Error> + From<controller::Error<Self, watcher::Error>> + Error
where
    Self: 'static,
{
}

/// Blanket implementation of [`WatcherError<T>`]
impl<T> WatcherError for T
where
    T: From<kube::Error> + From<controller::Error<Self, watcher::Error>> + Error,
    Self: 'static,
{
}

// -----------------------------------------------------------------------------
// Watcher trait

/// provides a watch method that listen to events of
/// kubernetes custom resource using a [`Controller<T>`]
#[async_trait]
pub trait Watcher<T>: ControllerBuilder<T> + Reconciler<T>
where
    T: DeserializeOwned + ResourceExt + CustomResourceExt + Clone + Debug + Send + Sync + 'static,
    <T as Resource>::DynamicType: Unpin + Eq + Hash + Clone + Debug + Send + Sync,
    Self: Send + Sync + 'static,
    <Self as Reconciler<T>>::Error: WatcherError + Send + Sync,
{
    type Error: WatcherError + Send + Sync;

    /// listen for events of the custom resource as generic parameter
    async fn watch(&self, ctx: Arc<Context>) -> Result<(), <Self as Watcher<T>>::Error> {
        let api_resource = T::api_resource();
        let mut stream = self
            .build(ctx.to_owned())
            .run(Self::reconcile, Self::retry, ctx)
            .boxed();

        loop {
            let instant = Instant::now();

            match stream.try_next().await {
                Ok(None) => {
                    debug!("We have reached the end of the infinite watch stream");
                    return Ok(());
                }
                Ok(Some((obj, _action))) => {
                    info!(
                        kind = &api_resource.kind,
                        name = &obj.name,
                        namespace = ?obj.namespace,
                        "Successfully reconcile resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_SUCCESS
                        .with_label_values(&[&api_resource.kind])
                        .inc();
                }
                Err(controller::Error::ObjectNotFound(obj_ref)) => {
                    debug!(
                        name = &obj_ref.name,
                        namespace = ?obj_ref.namespace,
                        "Received an event about an already deleted resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_SUCCESS
                        .with_label_values(&[&api_resource.kind])
                        .inc();
                }
                Err(err) => {
                    error!(
                        kind = &api_resource.kind,
                        error = err.to_string(),
                        "Failed to reconcile resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_FAILED
                        .with_label_values(&[&api_resource.kind])
                        .inc();
                }
            }

            trace!(
                kind = &api_resource.kind,
                duration = Instant::now().duration_since(instant).as_millis() as u64,
                "Put watch event loop to bed",
            );

            #[cfg(feature = "metrics")]
            RECONCILIATION_DURATION
                .with_label_values(&[&api_resource.kind, "us"])
                .inc_by(Instant::now().duration_since(instant).as_micros() as f64);

            sleep_until(instant + Duration::from_millis(100)).await;
        }
    }
}

/// Blanket implementation for [`Watcher<T>`]
impl<T, U> Watcher<T> for U
where
    T: DeserializeOwned + ResourceExt + CustomResourceExt + Clone + Debug + Send + Sync + 'static,
    <T as Resource>::DynamicType: Unpin + Eq + Hash + Clone + Debug + Send + Sync,
    U: Reconciler<T> + ControllerBuilder<T>,
    U::Error: WatcherError + Send + Sync,
    Self: Send + Sync + 'static,
{
    type Error = U::Error;
}
