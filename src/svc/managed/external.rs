//! # External module
//!
//! This module provide the lifecycle engine of the database instance backing
//! a [`RdsInstance`] custom resource and the derivation of its connection
//! details.

use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::svc::{
    crd::{
        rds_instance::{RdsInstance, KIND},
        Condition,
    },
    managed::{
        ConnectionDetails, Error, ExternalClient, ExternalCreation, ExternalObservation,
        ExternalUpdate, Managed, CONNECTION_SECRET_ENDPOINT_KEY, CONNECTION_SECRET_PASSWORD_KEY,
        CONNECTION_SECRET_PORT_KEY, CONNECTION_SECRET_USER_KEY,
    },
    rds::{self, password::Generator, CreateDbInstanceRequest, DbInstance, InstanceStatus},
};

// -----------------------------------------------------------------------------
// helpers

fn downcast_mut(mg: &mut dyn Managed) -> Result<&mut RdsInstance, Error> {
    mg.as_any_mut()
        .downcast_mut::<RdsInstance>()
        .ok_or(Error::NotSupportedType(KIND))
}

/// returns the readiness condition matching the status of the database
/// instance
pub fn readiness(status: &InstanceStatus) -> Condition {
    match status {
        InstanceStatus::Running => Condition::available(),
        InstanceStatus::Creating => Condition::creating(),
        InstanceStatus::Deleting => Condition::deleting(),
        _ => Condition::unavailable(),
    }
}

/// returns the connection details to publish for the database instance, a
/// key is only present when its value is known and non-empty
pub fn connection_details(
    password: &str,
    obj: &RdsInstance,
    instance: &DbInstance,
) -> ConnectionDetails {
    let mut details = ConnectionDetails::new();
    let username = &obj.spec.for_provider.master_username;

    if !username.is_empty() {
        details.insert(
            CONNECTION_SECRET_USER_KEY.to_string(),
            username.as_bytes().to_vec(),
        );
    }

    if !password.is_empty() {
        details.insert(
            CONNECTION_SECRET_PASSWORD_KEY.to_string(),
            password.as_bytes().to_vec(),
        );
    }

    if let Some(endpoint) = &instance.endpoint {
        if !endpoint.address.is_empty() {
            details.insert(
                CONNECTION_SECRET_ENDPOINT_KEY.to_string(),
                endpoint.address.as_bytes().to_vec(),
            );
        }

        if !endpoint.port.is_empty() {
            details.insert(
                CONNECTION_SECRET_PORT_KEY.to_string(),
                endpoint.port.as_bytes().to_vec(),
            );
        }
    }

    details
}

// -----------------------------------------------------------------------------
// External structure

/// drives the database instance of a custom resource, bound to a backend
/// client for a single reconciliation
pub struct External {
    client: Arc<dyn rds::Client>,
    password: Arc<dyn Generator>,
}

impl External {
    pub fn new(client: Arc<dyn rds::Client>, password: Arc<dyn Generator>) -> Self {
        Self { client, password }
    }
}

#[async_trait]
impl ExternalClient for External {
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn observe(&self, mg: &mut dyn Managed) -> Result<ExternalObservation, Error> {
        let obj = downcast_mut(mg)?;
        let id = match obj.instance_id() {
            Some(id) => id,
            None => return Ok(ExternalObservation::default()),
        };

        debug!(id = &id, name = %obj.name_any(), "Observe database instance");
        let instance = match self.client.describe_instance(&id).await {
            Ok(instance) => instance,
            Err(err) if err.is_not_found() => {
                debug!(id = &id, "Database instance does not exist");
                return Ok(ExternalObservation::default());
            }
            Err(err) => return Err(Error::DescribeFailed(err)),
        };

        let observation = obj.observation_mut();
        observation.db_instance_status = Some(instance.status.to_owned());
        if instance.endpoint.is_some() {
            observation.endpoint = instance.endpoint.to_owned();
        }

        if InstanceStatus::Running == instance.status && !observation.account_ready {
            observation.account_ready = true;
        }

        obj.set_condition(readiness(&instance.status));

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: true,
            connection_details: connection_details("", obj, &instance),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn create(&self, mg: &mut dyn Managed) -> Result<ExternalCreation, Error> {
        let obj = downcast_mut(mg)?;
        obj.set_condition(Condition::creating());

        let password = self.password.generate();
        let name = match obj.external_name() {
            Some(name) => name,
            None => {
                let name = obj.name_any();
                obj.set_external_name(&name);
                name
            }
        };

        let parameters = &obj.spec.for_provider;
        let req = CreateDbInstanceRequest {
            name,
            engine: parameters.engine.to_owned(),
            engine_version: parameters.engine_version.to_owned(),
            class: parameters.db_instance_class.to_owned(),
            storage_in_gb: parameters.db_instance_storage_in_gb,
            security_ip_list: parameters.security_ip_list.to_owned(),
            master_username: parameters.master_username.to_owned(),
        };

        info!(name = &req.name, engine = &req.engine, "Create database instance");
        let instance = self
            .client
            .create_instance(&req)
            .await
            .map_err(Error::InstanceCreationFailed)?;

        let observation = obj.observation_mut();
        observation.db_instance_id = Some(instance.id.to_owned());
        observation.endpoint = instance.endpoint.to_owned();

        info!(
            id = &instance.id,
            username = &req.master_username,
            "Create account on database instance"
        );
        self.client
            .create_account(&instance.id, &req.master_username, &password)
            .await
            .map_err(Error::AccountCreationFailed)?;

        Ok(ExternalCreation {
            connection_details: connection_details(&password, obj, &instance),
        })
    }

    async fn update(&self, mg: &mut dyn Managed) -> Result<ExternalUpdate, Error> {
        downcast_mut(mg)?;

        Ok(ExternalUpdate::default())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn delete(&self, mg: &mut dyn Managed) -> Result<(), Error> {
        let obj = downcast_mut(mg)?;
        obj.set_condition(Condition::deleting());
        if Some(InstanceStatus::Deleting) == obj.observation().db_instance_status {
            debug!(name = %obj.name_any(), "Database instance is already being deleted");
            return Ok(());
        }

        let id = match obj.instance_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        info!(id = &id, "Delete database instance");
        match self.client.delete_instance(&id).await {
            Err(err) if err.is_not_found() => Ok(()),
            result => result.map_err(Error::InstanceDeletionFailed),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use kube::api::ObjectMeta;

    use super::*;
    use crate::svc::{
        crd::{
            provider_config::ResourceReference,
            rds_instance::{Parameters, Spec, EXTERNAL_NAME_ANNOTATION},
            DeletionPolicy, Reference, CONDITION_READY,
        },
        rds::{Endpoint, ERROR_CODE_INSTANCE_ID_NOT_FOUND},
    };

    pub const PASSWORD: &str = "p4ssw0rd!";

    type DescribeFn = Box<dyn Fn(&str) -> Result<DbInstance, rds::Error> + Send + Sync>;
    type CreateFn =
        Box<dyn Fn(&CreateDbInstanceRequest) -> Result<DbInstance, rds::Error> + Send + Sync>;
    type AccountFn = Box<dyn Fn(&str, &str, &str) -> Result<(), rds::Error> + Send + Sync>;
    type DeleteFn = Box<dyn Fn(&str) -> Result<(), rds::Error> + Send + Sync>;

    pub struct FakeClient {
        pub describe: DescribeFn,
        pub create: CreateFn,
        pub account: AccountFn,
        pub delete: DeleteFn,
        pub calls: Mutex<Vec<String>>,
    }

    impl Default for FakeClient {
        fn default() -> Self {
            Self {
                describe: Box::new(|id| Err(rds::Error::NotFound(id.to_string()))),
                create: Box::new(|_| Ok(DbInstance::default())),
                account: Box::new(|_, _, _| Ok(())),
                delete: Box::new(|_| Ok(())),
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl FakeClient {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().to_owned()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl rds::Client for FakeClient {
        async fn describe_instance(&self, id: &str) -> Result<DbInstance, rds::Error> {
            self.record(format!("describe:{}", id));
            (self.describe)(id)
        }

        async fn create_instance(
            &self,
            req: &CreateDbInstanceRequest,
        ) -> Result<DbInstance, rds::Error> {
            self.record(format!("create:{}", req.name));
            (self.create)(req)
        }

        async fn create_account(
            &self,
            id: &str,
            username: &str,
            password: &str,
        ) -> Result<(), rds::Error> {
            self.record(format!("account:{}:{}", id, username));
            (self.account)(id, username, password)
        }

        async fn delete_instance(&self, id: &str) -> Result<(), rds::Error> {
            self.record(format!("delete:{}", id));
            (self.delete)(id)
        }
    }

    #[derive(Debug)]
    pub struct Bogus;

    impl Managed for Bogus {
        fn resource_reference(&self) -> ResourceReference {
            ResourceReference::default()
        }

        fn provider_config_reference(&self) -> Reference {
            Reference::default()
        }

        fn deletion_policy(&self) -> DeletionPolicy {
            DeletionPolicy::Delete
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    pub fn instance() -> RdsInstance {
        let mut obj = RdsInstance::new(
            "test",
            Spec {
                for_provider: Parameters {
                    master_username: "root".to_string(),
                    engine: "PostgreSQL".to_string(),
                    engine_version: "10.0".to_string(),
                    security_ip_list: vec!["0.0.0.0/0".to_string()],
                    db_instance_class: "rds.pg.s1.small".to_string(),
                    db_instance_storage_in_gb: 20,
                },
                provider_config_ref: None,
                provider_ref: None,
                write_connection_secret_to_ref: None,
                deletion_policy: DeletionPolicy::Delete,
            },
        );

        obj.metadata = ObjectMeta {
            name: Some("test".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("9c2b7a5e-0d57-4d4c-8a44-0b6f3c1e2d7a".to_string()),
            ..Default::default()
        };

        obj
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            address: "172.0.0.1".to_string(),
            port: "8888".to_string(),
        }
    }

    fn external(client: Arc<FakeClient>) -> External {
        External::new(client, Arc::new(|| PASSWORD.to_string()))
    }

    fn ready_reason(obj: &RdsInstance) -> Option<String> {
        obj.condition(CONDITION_READY).map(|c| c.reason.to_owned())
    }

    fn details(entries: &[(&str, &str)]) -> ConnectionDetails {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn observe_rejects_other_kinds() {
        let client = Arc::new(FakeClient::default());

        let err = external(client).observe(&mut Bogus).await.unwrap_err();

        assert!(matches!(err, Error::NotSupportedType(KIND)));
    }

    #[tokio::test]
    async fn observe_without_identifier_does_not_call_backend() {
        let client = Arc::new(FakeClient::default());
        let mut obj = instance();

        let observation = external(client.to_owned()).observe(&mut obj).await.unwrap();

        assert!(!observation.resource_exists);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn observe_missing_instance() {
        let client = Arc::new(FakeClient {
            describe: Box::new(|_| {
                Err(rds::Error::Api {
                    action: "DescribeDBInstanceAttribute".to_string(),
                    status: 404,
                    code: ERROR_CODE_INSTANCE_ID_NOT_FOUND.to_string(),
                    message: "The specified instance is not found.".to_string(),
                })
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        let observation = external(client.to_owned()).observe(&mut obj).await.unwrap();

        assert!(!observation.resource_exists);
        assert_eq!(client.calls(), vec!["describe:rm-1234".to_string()]);
    }

    #[tokio::test]
    async fn observe_fails_on_backend_error() {
        let client = Arc::new(FakeClient {
            describe: Box::new(|_| {
                Err(rds::Error::Api {
                    action: "DescribeDBInstanceAttribute".to_string(),
                    status: 500,
                    code: "InternalError".to_string(),
                    message: "boom".to_string(),
                })
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        let err = external(client).observe(&mut obj).await.unwrap_err();

        assert!(matches!(err, Error::DescribeFailed(_)));
    }

    #[tokio::test]
    async fn observe_running_instance() {
        let client = Arc::new(FakeClient {
            describe: Box::new(|id| {
                Ok(DbInstance {
                    id: id.to_string(),
                    status: InstanceStatus::Running,
                    endpoint: Some(endpoint()),
                })
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        let observation = external(client).observe(&mut obj).await.unwrap();

        assert!(observation.resource_exists);
        assert!(observation.resource_up_to_date);
        assert_eq!(
            observation.connection_details,
            details(&[
                (CONNECTION_SECRET_USER_KEY, "root"),
                (CONNECTION_SECRET_ENDPOINT_KEY, "172.0.0.1"),
                (CONNECTION_SECRET_PORT_KEY, "8888"),
            ])
        );

        let at_provider = obj.observation();
        assert_eq!(at_provider.db_instance_status, Some(InstanceStatus::Running));
        assert_eq!(at_provider.endpoint, Some(endpoint()));
        assert!(at_provider.account_ready);
        assert_eq!(ready_reason(&obj), Some("Available".to_string()));
    }

    #[tokio::test]
    async fn observe_creating_instance_is_not_ready() {
        let client = Arc::new(FakeClient {
            describe: Box::new(|id| {
                Ok(DbInstance {
                    id: id.to_string(),
                    status: InstanceStatus::Creating,
                    endpoint: None,
                })
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());
        obj.observation_mut().endpoint = Some(endpoint());

        let observation = external(client).observe(&mut obj).await.unwrap();

        assert!(observation.resource_exists);
        assert!(!obj.observation().account_ready);
        assert_eq!(obj.observation().endpoint, Some(endpoint()));
        assert_eq!(ready_reason(&obj), Some("Creating".to_string()));
    }

    #[tokio::test]
    async fn observe_never_resets_account_readiness() {
        let client = Arc::new(FakeClient {
            describe: Box::new(|id| {
                Ok(DbInstance {
                    id: id.to_string(),
                    status: InstanceStatus::ClassChanging,
                    endpoint: None,
                })
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());
        obj.observation_mut().account_ready = true;

        external(client).observe(&mut obj).await.unwrap();

        assert!(obj.observation().account_ready);
        assert_eq!(ready_reason(&obj), Some("Unavailable".to_string()));
    }

    #[tokio::test]
    async fn create_instance_and_account() {
        let client = Arc::new(FakeClient {
            create: Box::new(|req| {
                assert_eq!(req.name, "test");
                assert_eq!(req.engine, "PostgreSQL");
                assert_eq!(req.engine_version, "10.0");
                assert_eq!(req.class, "rds.pg.s1.small");
                assert_eq!(req.storage_in_gb, 20);
                assert_eq!(req.security_ip_list, vec!["0.0.0.0/0".to_string()]);

                Ok(DbInstance {
                    id: "rm-1234".to_string(),
                    status: InstanceStatus::Creating,
                    endpoint: Some(endpoint()),
                })
            }),
            account: Box::new(|id, username, password| {
                assert_eq!(id, "rm-1234");
                assert_eq!(username, "root");
                assert_eq!(password, PASSWORD);
                Ok(())
            }),
            ..Default::default()
        });

        let mut obj = instance();
        let creation = external(client.to_owned()).create(&mut obj).await.unwrap();

        assert_eq!(
            creation.connection_details,
            details(&[
                (CONNECTION_SECRET_USER_KEY, "root"),
                (CONNECTION_SECRET_PASSWORD_KEY, PASSWORD),
                (CONNECTION_SECRET_ENDPOINT_KEY, "172.0.0.1"),
                (CONNECTION_SECRET_PORT_KEY, "8888"),
            ])
        );

        assert_eq!(obj.instance_id(), Some("rm-1234".to_string()));
        assert_eq!(obj.observation().endpoint, Some(endpoint()));
        assert_eq!(obj.external_name(), Some("test".to_string()));
        assert_eq!(ready_reason(&obj), Some("Creating".to_string()));
        assert_eq!(
            client.calls(),
            vec!["create:test".to_string(), "account:rm-1234:root".to_string()]
        );
    }

    #[tokio::test]
    async fn create_reuses_external_name() {
        let client = Arc::new(FakeClient::default());
        let mut obj = instance();
        obj.annotations_mut()
            .insert(EXTERNAL_NAME_ANNOTATION.to_string(), "my-db".to_string());

        external(client.to_owned()).create(&mut obj).await.unwrap();
        external(client.to_owned()).create(&mut obj).await.unwrap();

        assert_eq!(obj.external_name(), Some("my-db".to_string()));
        assert_eq!(
            client
                .calls()
                .into_iter()
                .filter(|call| call.starts_with("create:"))
                .collect::<Vec<_>>(),
            vec!["create:my-db".to_string(), "create:my-db".to_string()]
        );
    }

    #[tokio::test]
    async fn create_retries_with_the_same_name() {
        let client = Arc::new(FakeClient::default());
        let obj = instance();
        assert_eq!(obj.external_name(), None);

        external(client.to_owned())
            .create(&mut obj.to_owned())
            .await
            .unwrap();
        external(client.to_owned())
            .create(&mut obj.to_owned())
            .await
            .unwrap();

        let names: Vec<_> = client
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("create:"))
            .collect();

        assert_eq!(names, vec!["create:test".to_string(), "create:test".to_string()]);
    }

    #[tokio::test]
    async fn create_fails_without_account_on_backend_error() {
        let client = Arc::new(FakeClient {
            create: Box::new(|_| Err(rds::Error::Credentials)),
            ..Default::default()
        });

        let mut obj = instance();
        let err = external(client.to_owned()).create(&mut obj).await.unwrap_err();

        assert!(matches!(err, Error::InstanceCreationFailed(_)));
        assert_eq!(obj.instance_id(), None);
        assert_eq!(client.calls(), vec!["create:test".to_string()]);
    }

    #[tokio::test]
    async fn create_keeps_identifier_when_account_fails() {
        let client = Arc::new(FakeClient {
            create: Box::new(|_| {
                Ok(DbInstance {
                    id: "rm-1234".to_string(),
                    ..Default::default()
                })
            }),
            account: Box::new(|id, _, _| Err(rds::Error::NotFound(id.to_string()))),
            ..Default::default()
        });

        let mut obj = instance();
        let err = external(client).create(&mut obj).await.unwrap_err();

        assert!(matches!(err, Error::AccountCreationFailed(_)));
        assert_eq!(obj.instance_id(), Some("rm-1234".to_string()));
    }

    #[tokio::test]
    async fn update_is_a_no_op() {
        let client = Arc::new(FakeClient::default());
        let mut obj = instance();

        let update = external(client.to_owned()).update(&mut obj).await.unwrap();

        assert_eq!(update, ExternalUpdate::default());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_without_identifier_does_not_call_backend() {
        let client = Arc::new(FakeClient::default());
        let mut obj = instance();

        external(client.to_owned()).delete(&mut obj).await.unwrap();

        assert!(client.calls().is_empty());
        assert_eq!(ready_reason(&obj), Some("Deleting".to_string()));
    }

    #[tokio::test]
    async fn delete_recorded_instance() {
        let client = Arc::new(FakeClient {
            delete: Box::new(|id| {
                if id != "rm-1234" {
                    return Err(rds::Error::NotFound(id.to_string()));
                }

                Ok(())
            }),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        external(client.to_owned()).delete(&mut obj).await.unwrap();

        assert_eq!(client.calls(), vec!["delete:rm-1234".to_string()]);
        assert_eq!(ready_reason(&obj), Some("Deleting".to_string()));
    }

    #[tokio::test]
    async fn delete_is_not_sent_twice() {
        let client = Arc::new(FakeClient::default());

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());
        obj.observation_mut().db_instance_status = Some(InstanceStatus::Deleting);

        external(client.to_owned()).delete(&mut obj).await.unwrap();

        assert!(!client
            .calls()
            .iter()
            .any(|call| call.starts_with("delete:")));
        assert_eq!(ready_reason(&obj), Some("Deleting".to_string()));
    }

    #[tokio::test]
    async fn delete_ignores_missing_instance() {
        let client = Arc::new(FakeClient {
            delete: Box::new(|id| Err(rds::Error::NotFound(id.to_string()))),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        assert!(external(client).delete(&mut obj).await.is_ok());
    }

    #[tokio::test]
    async fn delete_fails_on_backend_error() {
        let client = Arc::new(FakeClient {
            delete: Box::new(|_| Err(rds::Error::Credentials)),
            ..Default::default()
        });

        let mut obj = instance();
        obj.observation_mut().db_instance_id = Some("rm-1234".to_string());

        let err = external(client).delete(&mut obj).await.unwrap_err();

        assert!(matches!(err, Error::InstanceDeletionFailed(_)));
    }

    #[test]
    fn connection_details_skip_empty_values() {
        let mut obj = instance();
        obj.spec.for_provider.master_username = String::new();

        let instance = DbInstance {
            id: "rm-1234".to_string(),
            status: InstanceStatus::Running,
            endpoint: Some(endpoint()),
        };

        assert_eq!(
            connection_details("", &obj, &instance),
            details(&[
                (CONNECTION_SECRET_ENDPOINT_KEY, "172.0.0.1"),
                (CONNECTION_SECRET_PORT_KEY, "8888"),
            ])
        );
    }

    #[test]
    fn connection_details_without_password() {
        let mut obj = instance();
        obj.spec.for_provider.master_username = "test".to_string();

        let instance = DbInstance {
            id: "rm-1234".to_string(),
            status: InstanceStatus::Running,
            endpoint: Some(Endpoint {
                address: "0.0.0.0".to_string(),
                port: "3346".to_string(),
            }),
        };

        assert_eq!(
            connection_details("", &obj, &instance),
            details(&[
                (CONNECTION_SECRET_USER_KEY, "test"),
                (CONNECTION_SECRET_ENDPOINT_KEY, "0.0.0.0"),
                (CONNECTION_SECRET_PORT_KEY, "3346"),
            ])
        );
    }

    #[test]
    fn connection_details_without_endpoint() {
        let obj = instance();
        let instance = DbInstance::default();

        assert_eq!(
            connection_details(PASSWORD, &obj, &instance),
            details(&[
                (CONNECTION_SECRET_USER_KEY, "root"),
                (CONNECTION_SECRET_PASSWORD_KEY, PASSWORD),
            ])
        );
    }

    #[test]
    fn readiness_follows_backend_status() {
        assert_eq!(readiness(&InstanceStatus::Running).reason, "Available");
        assert_eq!(readiness(&InstanceStatus::Creating).reason, "Creating");
        assert_eq!(readiness(&InstanceStatus::Deleting).reason, "Deleting");
        assert_eq!(readiness(&InstanceStatus::Rebooting).reason, "Unavailable");
    }
}
