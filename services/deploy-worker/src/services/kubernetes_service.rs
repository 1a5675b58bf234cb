use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment as K8sDeployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Namespace, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{DeleteParams, ObjectMeta, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use shared::utilities::errors::AppError;

const REPLICAS: i32 = 2;
const CONTAINER_PORT: i32 = 80;
const HPA_MIN_REPLICAS: i32 = 2;
const HPA_MAX_REPLICAS: i32 = 10;
const HPA_TARGET_CPU_PERCENT: i32 = 80;

/// What to do with an object that already exists on the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnExisting {
    /// Replace the live object so the new spec (notably a new image) rolls
    /// out.
    Update,
    /// Leave the live object alone; re-rollouts must not disturb stable
    /// routing.
    Keep,
}

#[derive(Clone)]
pub struct KubernetesService {
    pub client: Client,
    pub namespace: String,
    pub base_domain: String,
}

impl KubernetesService {
    /// Cluster-side name shared by all of a deployment's objects.
    pub fn object_name(deployment_id: Uuid) -> String {
        format!("app-{}", &deployment_id.to_string()[..8])
    }

    /// Converge one cluster object: create it when absent, otherwise apply
    /// the `OnExisting` policy. All ensure operations funnel through here, so
    /// a redelivered event converges to the same cluster state as the first.
    async fn reconcile<K>(
        api: &Api<K>,
        name: &str,
        mut desired: K,
        on_existing: OnExisting,
    ) -> Result<(), AppError>
    where
        K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
    {
        match api.get(name).await {
            Ok(existing) => match on_existing {
                OnExisting::Keep => Ok(()),
                OnExisting::Update => {
                    desired.meta_mut().resource_version = existing.resource_version();
                    api.replace(name, &PostParams::default(), &desired).await?;
                    Ok(())
                }
            },
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                api.create(&PostParams::default(), &desired).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn ensure_namespace(&self) -> Result<(), AppError> {
        let api: Api<Namespace> = Api::all(self.client.clone());

        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(self.namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        Self::reconcile(&api, &self.namespace, namespace, OnExisting::Keep).await
    }

    pub async fn ensure_workload(&self, name: &str, image: &str) -> Result<(), AppError> {
        let api: Api<K8sDeployment> = Api::namespaced(self.client.clone(), &self.namespace);

        Self::reconcile(
            &api,
            name,
            workload(&self.namespace, name, image),
            OnExisting::Update,
        )
        .await?;

        info!("Workload {} reconciled in namespace {}", name, self.namespace);
        Ok(())
    }

    pub async fn ensure_service(&self, name: &str) -> Result<(), AppError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);

        Self::reconcile(&api, name, service(&self.namespace, name), OnExisting::Keep).await?;

        info!("Service {} reconciled in namespace {}", name, self.namespace);
        Ok(())
    }

    pub async fn ensure_ingress(&self, name: &str, subdomain: &str) -> Result<(), AppError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &self.namespace);

        let host = route_host(subdomain, &self.base_domain);
        Self::reconcile(
            &api,
            name,
            ingress(&self.namespace, name, &host),
            OnExisting::Keep,
        )
        .await?;

        info!("Ingress {} reconciled for host {}", name, host);
        Ok(())
    }

    pub async fn ensure_autoscaler(&self, name: &str) -> Result<(), AppError> {
        let api: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.client.clone(), &self.namespace);

        Self::reconcile(&api, name, autoscaler(&self.namespace, name), OnExisting::Keep).await?;

        info!("Autoscaler {} reconciled in namespace {}", name, self.namespace);
        Ok(())
    }

    /// Cleanup path: tear the objects down in reverse dependency order,
    /// ignoring anything that is already gone.
    pub async fn delete_all(&self, name: &str) -> Result<(), AppError> {
        let delete_params = DeleteParams::default();

        let hpa_api: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.client.clone(), &self.namespace);
        let _ = hpa_api.delete(name, &delete_params).await;

        let ingress_api: Api<Ingress> = Api::namespaced(self.client.clone(), &self.namespace);
        let _ = ingress_api.delete(name, &delete_params).await;

        let service_api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let _ = service_api.delete(name, &delete_params).await;

        let workload_api: Api<K8sDeployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let _ = workload_api.delete(name, &delete_params).await;

        info!("Cluster objects for {} deleted", name);
        Ok(())
    }
}

pub fn route_host(subdomain: &str, base_domain: &str) -> String {
    format!("{subdomain}.{base_domain}")
}

fn app_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), name.to_string());
    labels
}

fn workload(namespace: &str, name: &str, image: &str) -> K8sDeployment {
    let labels = app_labels(name);

    let mut resource_requests = BTreeMap::new();
    resource_requests.insert("cpu".to_string(), Quantity("100m".to_string()));
    resource_requests.insert("memory".to_string(), Quantity("128Mi".to_string()));

    let mut resource_limits = BTreeMap::new();
    resource_limits.insert("cpu".to_string(), Quantity("500m".to_string()));
    resource_limits.insert("memory".to_string(), Quantity("512Mi".to_string()));

    K8sDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::Int(1)),
                    max_unavailable: Some(IntOrString::Int(0)),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "app".to_string(),
                        image: Some(image.to_string()),
                        ports: Some(vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        resources: Some(ResourceRequirements {
                            requests: Some(resource_requests),
                            limits: Some(resource_limits),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service(namespace: &str, name: &str) -> Service {
    let labels = app_labels(name);

    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: CONTAINER_PORT,
                target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn ingress(namespace: &str, name: &str, host: &str) -> Ingress {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        "kubernetes.io/ingress.class".to_string(),
        "traefik".to_string(),
    );

    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(app_labels(name)),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: name.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(CONTAINER_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn autoscaler(namespace: &str, name: &str) -> HorizontalPodAutoscaler {
    HorizontalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: name.to_string(),
            },
            min_replicas: Some(HPA_MIN_REPLICAS),
            max_replicas: HPA_MAX_REPLICAS,
            metrics: Some(vec![MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: "cpu".to_string(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(HPA_TARGET_CPU_PERCENT),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_use_the_short_deployment_id() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(KubernetesService::object_name(id), "app-a1b2c3d4");
    }

    #[test]
    fn route_host_is_subdomain_dot_base_domain() {
        assert_eq!(route_host("app-a1b2c3d4", "dejavu.local"), "app-a1b2c3d4.dejavu.local");
    }

    #[test]
    fn workload_rolls_out_two_replicas_without_downtime() {
        let workload = workload("dejavu-apps", "app-a1b2c3d4", "reg/dejavu/p:1");
        let spec = workload.spec.unwrap();

        assert_eq!(spec.replicas, Some(2));

        let strategy = spec.strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        let rolling = strategy.rolling_update.unwrap();
        assert_eq!(rolling.max_surge, Some(IntOrString::Int(1)));
        assert_eq!(rolling.max_unavailable, Some(IntOrString::Int(0)));

        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("reg/dejavu/p:1"));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 80);

        let resources = container.resources.as_ref().unwrap();
        assert_eq!(resources.requests.as_ref().unwrap()["cpu"].0, "100m");
        assert_eq!(resources.limits.as_ref().unwrap()["memory"].0, "512Mi");
    }

    #[test]
    fn selector_labels_line_up_across_workload_and_service() {
        let name = "app-a1b2c3d4";
        let workload = workload("dejavu-apps", name, "image");
        let service = service("dejavu-apps", name);

        let selector = workload.spec.unwrap().selector.match_labels.unwrap();
        assert_eq!(selector["app"], name);
        assert_eq!(service.spec.unwrap().selector.unwrap(), selector);
    }

    #[test]
    fn ingress_routes_the_host_prefix_to_the_service() {
        let ingress = ingress("dejavu-apps", "app-a1b2c3d4", "app-a1b2c3d4.dejavu.local");
        let rules = ingress.spec.unwrap().rules.unwrap();

        assert_eq!(rules[0].host.as_deref(), Some("app-a1b2c3d4.dejavu.local"));
        let path = &rules[0].http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        assert_eq!(path.path_type, "Prefix");
        assert_eq!(
            path.backend.service.as_ref().unwrap().port.as_ref().unwrap().number,
            Some(80)
        );
    }

    #[test]
    fn autoscaler_targets_cpu_utilization_between_bounds() {
        let hpa = autoscaler("dejavu-apps", "app-a1b2c3d4");
        let spec = hpa.spec.unwrap();

        assert_eq!(spec.scale_target_ref.kind, "Deployment");
        assert_eq!(spec.min_replicas, Some(2));
        assert_eq!(spec.max_replicas, 10);

        let metric = &spec.metrics.unwrap()[0];
        let resource = metric.resource.as_ref().unwrap();
        assert_eq!(resource.name, "cpu");
        assert_eq!(resource.target.average_utilization, Some(80));
    }
}
