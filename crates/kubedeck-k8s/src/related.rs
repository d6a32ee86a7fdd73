//! A pod's neighborhood
//!
//! Starting from a pod, find the workload that owns it, the Services selecting
//! it, Ingresses and mesh routes in front of those Services, and the config
//! objects it references. Only the ReplicaSet lookup in the owner walk can fail
//! the whole call; every other lookup degrades to an empty section.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Endpoints, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::ApiResource;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

use kubedeck_types::{
    GatewayInfo, GatewayServer, IngressInfo, OwnerInfo, OwnerRef, RelatedResources, ServiceInfo,
    VirtualServiceInfo,
};

use crate::client::{KubeRepository, best_effort, get_named, list_all};
use crate::dynamic;
use crate::error::Result;
use crate::pods::ref_name;
use crate::status::{labels_match, owner_of};

const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

// ============================================================================
// Services and ingresses
// ============================================================================

fn selector_of(service: &Service) -> Option<&BTreeMap<String, String>> {
    service
        .spec
        .as_ref()
        .and_then(|s| s.selector.as_ref())
        .filter(|s| !s.is_empty())
}

/// Services whose non-empty selector matches `labels`
pub fn services_for_pod<'a>(
    services: &'a [Service],
    labels: &BTreeMap<String, String>,
) -> Vec<&'a Service> {
    services
        .iter()
        .filter(|svc| selector_of(svc).is_some_and(|sel| labels_match(sel, labels)))
        .collect()
}

/// Ready addresses across all subsets; zero when there are no endpoints
pub fn count_ready_endpoints(endpoints: Option<&Endpoints>) -> usize {
    endpoints
        .and_then(|e| e.subsets.as_ref())
        .map(|subsets| {
            subsets
                .iter()
                .map(|s| s.addresses.as_ref().map(Vec::len).unwrap_or(0))
                .sum()
        })
        .unwrap_or(0)
}

pub fn service_to_info(service: &Service, endpoints: Option<&Endpoints>) -> ServiceInfo {
    let spec = service.spec.as_ref();
    ServiceInfo {
        name: service.metadata.name.clone().unwrap_or_default(),
        service_type: spec
            .and_then(|s| s.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
        ports: spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| format!("{}:{}", p.protocol.as_deref().unwrap_or("TCP"), p.port))
                    .collect()
            })
            .unwrap_or_default(),
        ready_endpoints: count_ready_endpoints(endpoints),
    }
}

/// True when any HTTP rule path routes to `service`. Rules without an HTTP
/// section are skipped.
pub fn ingress_references_service(ingress: &Ingress, service: &str) -> bool {
    ingress
        .spec
        .iter()
        .flat_map(|s| s.rules.iter().flatten())
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter())
        .any(|path| {
            path.backend
                .service
                .as_ref()
                .is_some_and(|b| b.name == service)
        })
}

pub fn ingress_to_info(ingress: &Ingress) -> IngressInfo {
    let spec = ingress.spec.as_ref();
    let class = spec
        .and_then(|s| s.ingress_class_name.clone())
        .or_else(|| {
            ingress
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(INGRESS_CLASS_ANNOTATION).cloned())
        })
        .unwrap_or_default();

    let rules = spec.and_then(|s| s.rules.as_deref()).unwrap_or(&[]);
    let hosts = rules
        .iter()
        .filter_map(|r| r.host.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let paths = rules
        .iter()
        .filter_map(|r| r.http.as_ref())
        .flat_map(|http| http.paths.iter())
        .map(|p| p.path.clone().unwrap_or_else(|| "/".to_string()))
        .collect();
    let tls_hosts = spec
        .and_then(|s| s.tls.as_ref())
        .into_iter()
        .flatten()
        .flat_map(|t| t.hosts.iter().flatten().cloned())
        .collect();

    IngressInfo {
        name: ingress.metadata.name.clone().unwrap_or_default(),
        class,
        hosts,
        paths,
        tls_hosts,
    }
}

// ============================================================================
// Mesh routes
// ============================================================================

/// Route destinations of every HTTP route
fn destination_hosts(vs: &Value) -> impl Iterator<Item = &Value> {
    dynamic::array_at(vs, &["spec", "http"])
        .iter()
        .flat_map(|http| dynamic::array_at(http, &["route"]).iter())
        .filter_map(|route| route.get("destination"))
}

/// A destination host names `service` by short name or by its namespaced forms
pub fn host_targets_service(host: &str, service: &str, namespace: &str) -> bool {
    host == service
        || host == format!("{service}.{namespace}")
        || host == format!("{service}.{namespace}.svc")
        || host == format!("{service}.{namespace}.svc.cluster.local")
}

pub fn virtual_service_matches(vs: &DynamicObject, services: &[String], namespace: &str) -> bool {
    destination_hosts(&vs.data).any(|dest| {
        dest.get("host")
            .and_then(Value::as_str)
            .is_some_and(|host| {
                services
                    .iter()
                    .any(|svc| host_targets_service(host, svc, namespace))
            })
    })
}

pub fn virtual_service_to_info(vs: &DynamicObject) -> VirtualServiceInfo {
    let data = &vs.data;
    let destinations = destination_hosts(data)
        .filter_map(|dest| {
            let host = dest.get("host").and_then(Value::as_str)?;
            Some(match dynamic::int_at(dest, &["port", "number"]) {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
        })
        .collect();
    VirtualServiceInfo {
        name: vs.metadata.name.clone().unwrap_or_default(),
        namespace: vs.metadata.namespace.clone().unwrap_or_default(),
        hosts: dynamic::strings_at(data, &["spec", "hosts"]),
        gateways: dynamic::strings_at(data, &["spec", "gateways"]),
        destinations,
    }
}

/// `(namespace, name)` of each gateway a virtual service binds to. Bare names
/// live in the virtual service's namespace; the reserved `mesh` gateway is skipped.
pub fn gateway_refs(vs: &VirtualServiceInfo) -> Vec<(String, String)> {
    vs.gateways
        .iter()
        .filter(|g| g.as_str() != "mesh")
        .map(|g| match g.split_once('/') {
            Some((ns, name)) => (ns.to_string(), name.to_string()),
            None => (vs.namespace.clone(), g.clone()),
        })
        .collect()
}

pub fn gateway_to_info(gateway: &DynamicObject) -> GatewayInfo {
    let servers = dynamic::array_at(&gateway.data, &["spec", "servers"])
        .iter()
        .map(|server| GatewayServer {
            port: dynamic::int_at(server, &["port", "number"]).unwrap_or(0),
            protocol: dynamic::str_at(server, &["port", "protocol"])
                .unwrap_or_default()
                .to_string(),
            hosts: dynamic::strings_at(server, &["hosts"]),
            tls_mode: dynamic::str_at(server, &["tls", "mode"])
                .unwrap_or_default()
                .to_string(),
        })
        .collect();
    GatewayInfo {
        name: gateway.metadata.name.clone().unwrap_or_default(),
        namespace: gateway.metadata.namespace.clone().unwrap_or_default(),
        servers,
    }
}

// ============================================================================
// Config references
// ============================================================================

/// ConfigMap and Secret names a pod references through `envFrom` or volumes,
/// each deduplicated and sorted
pub fn config_refs(pod: &Pod) -> (Vec<String>, Vec<String>) {
    let mut config_maps = BTreeSet::new();
    let mut secrets = BTreeSet::new();

    if let Some(spec) = &pod.spec {
        let containers = spec
            .init_containers
            .iter()
            .flatten()
            .chain(spec.containers.iter());
        for source in containers.flat_map(|c| c.env_from.iter().flatten()) {
            if let Some(cm) = &source.config_map_ref {
                config_maps.extend(ref_name(cm.name.clone()));
            }
            if let Some(secret) = &source.secret_ref {
                secrets.extend(ref_name(secret.name.clone()));
            }
        }
        for volume in spec.volumes.iter().flatten() {
            if let Some(cm) = &volume.config_map {
                config_maps.extend(ref_name(cm.name.clone()));
            }
            if let Some(secret) = &volume.secret {
                secrets.extend(ref_name(secret.secret_name.clone()));
            }
        }
    }

    (config_maps.into_iter().collect(), secrets.into_iter().collect())
}

// ============================================================================
// Owner walk
// ============================================================================

fn rollout_counts(rollout: &DynamicObject) -> (i32, i32) {
    let data = &rollout.data;
    let replicas = dynamic::i32_at(data, &["spec", "replicas"]).unwrap_or(1);
    let ready = dynamic::i32_at(data, &["status", "readyReplicas"])
        .or_else(|| dynamic::i32_at(data, &["status", "availableReplicas"]))
        .unwrap_or(0);
    (replicas, ready)
}

fn owner_info(owner: &OwnerRef, (replicas, ready_replicas): (i32, i32)) -> OwnerInfo {
    OwnerInfo {
        kind: owner.kind.clone(),
        name: owner.name.clone(),
        replicas,
        ready_replicas,
    }
}

impl KubeRepository {
    /// Desired and ready replicas of an owning workload
    async fn owner_counts(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        owner: &OwnerRef,
    ) -> Result<(i32, i32)> {
        let name = owner.name.as_str();
        match owner.kind.as_str() {
            "Deployment" => {
                let api: Api<Deployment> = self.namespaced(namespace);
                let d = get_named(cancel, &api, "Deployment", name).await?;
                let replicas = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let ready = d.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok((replicas, ready))
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = self.namespaced(namespace);
                let s = get_named(cancel, &api, "StatefulSet", name).await?;
                let replicas = s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let ready = s.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok((replicas, ready))
            }
            "DaemonSet" => {
                let api: Api<DaemonSet> = self.namespaced(namespace);
                let d = get_named(cancel, &api, "DaemonSet", name).await?;
                let status = d.status.as_ref();
                Ok((
                    status.map(|s| s.desired_number_scheduled).unwrap_or(0),
                    status.map(|s| s.number_ready).unwrap_or(0),
                ))
            }
            "Job" => {
                let api: Api<Job> = self.namespaced(namespace);
                let j = get_named(cancel, &api, "Job", name).await?;
                let completions = j.spec.as_ref().and_then(|s| s.completions).unwrap_or(1);
                let succeeded = j.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0);
                Ok((completions, succeeded))
            }
            "ReplicaSet" => {
                let api: Api<ReplicaSet> = self.namespaced(namespace);
                let rs = get_named(cancel, &api, "ReplicaSet", name).await?;
                let replicas = rs.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
                let ready = rs.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok((replicas, ready))
            }
            "Rollout" => match self.capabilities().rollouts.as_ref() {
                Some(ar) => {
                    let api: Api<DynamicObject> =
                        Api::namespaced_with(self.client(), namespace, ar);
                    let rollout = get_named(cancel, &api, "Rollout", name).await?;
                    Ok(rollout_counts(&rollout))
                }
                None => Ok((0, 0)),
            },
            _ => Ok((0, 0)),
        }
    }

    /// The workload owning a pod. A ReplicaSet owner is replaced by its own
    /// owner; failing to read that ReplicaSet fails the walk.
    async fn resolve_owner(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &Pod,
    ) -> Result<Option<OwnerInfo>> {
        let mut owner = owner_of(&pod.metadata);
        if owner.is_empty() {
            return Ok(None);
        }

        if owner.kind == "ReplicaSet" {
            let api: Api<ReplicaSet> = self.namespaced(namespace);
            let rs = get_named(cancel, &api, "ReplicaSet", &owner.name).await?;
            let parent = owner_of(&rs.metadata);
            if !parent.is_empty() {
                owner = parent;
            }
        }

        let counts = best_effort(
            self.owner_counts(cancel, namespace, &owner).await,
            "owner replicas",
        )?
        .unwrap_or((0, 0));
        Ok(Some(owner_info(&owner, counts)))
    }

    async fn related_services(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ServiceInfo>> {
        let api: Api<Service> = self.namespaced(namespace);
        let Some(services) =
            best_effort(list_all(cancel, &api, &ListParams::default()).await, "services")?
        else {
            return Ok(Vec::new());
        };

        let endpoints_api: Api<Endpoints> = self.namespaced(namespace);
        let mut out = Vec::new();
        for svc in services_for_pod(&services, labels) {
            let name = svc.metadata.name.as_deref().unwrap_or_default();
            let endpoints = best_effort(
                get_named(cancel, &endpoints_api, "Endpoints", name).await,
                "endpoints",
            )?;
            out.push(service_to_info(svc, endpoints.as_ref()));
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn related_ingresses(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        services: &[String],
    ) -> Result<Vec<IngressInfo>> {
        if services.is_empty() {
            return Ok(Vec::new());
        }
        let api: Api<Ingress> = self.namespaced(namespace);
        let listed = list_all(cancel, &api, &ListParams::default()).await;
        let ingresses = best_effort(listed, "ingresses")?.unwrap_or_default();
        let mut out: Vec<IngressInfo> = ingresses
            .iter()
            .filter(|ing| services.iter().any(|s| ingress_references_service(ing, s)))
            .map(ingress_to_info)
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn related_mesh(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        services: &[String],
    ) -> Result<(Vec<VirtualServiceInfo>, Vec<GatewayInfo>)> {
        let caps = self.capabilities();
        let Some(vs_resource) = caps.virtual_services.as_ref() else {
            return Ok((Vec::new(), Vec::new()));
        };
        if services.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let api: Api<DynamicObject> = Api::namespaced_with(self.client(), namespace, vs_resource);
        let items = best_effort(
            list_all(cancel, &api, &ListParams::default()).await,
            "virtual services",
        )?
        .unwrap_or_default();
        let mut virtual_services: Vec<VirtualServiceInfo> = items
            .iter()
            .filter(|vs| virtual_service_matches(vs, services, namespace))
            .map(virtual_service_to_info)
            .collect();
        virtual_services.sort_by(|a, b| a.name.cmp(&b.name));

        let refs: BTreeSet<(String, String)> =
            virtual_services.iter().flat_map(gateway_refs).collect();
        let mut gateways = Vec::new();
        if let Some(gw_resource) = caps.gateways.as_ref() {
            for (gw_namespace, name) in refs {
                if let Some(gw) = self
                    .fetch_gateway(cancel, gw_resource, &gw_namespace, &name)
                    .await?
                {
                    gateways.push(gw);
                }
            }
        }
        Ok((virtual_services, gateways))
    }

    async fn fetch_gateway(
        &self,
        cancel: &CancellationToken,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<GatewayInfo>> {
        let api: Api<DynamicObject> = Api::namespaced_with(self.client(), namespace, resource);
        let found = best_effort(get_named(cancel, &api, "Gateway", name).await, "gateway")?;
        Ok(found.as_ref().map(gateway_to_info))
    }

    pub(crate) async fn related_for_pod(
        &self,
        cancel: &CancellationToken,
        pod: &Pod,
    ) -> Result<RelatedResources> {
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        let labels = pod.metadata.labels.clone().unwrap_or_default();

        let owner = self.resolve_owner(cancel, &namespace, pod).await?;
        let services = self.related_services(cancel, &namespace, &labels).await?;
        let service_names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();
        let ingresses = self
            .related_ingresses(cancel, &namespace, &service_names)
            .await?;
        let (virtual_services, gateways) = self
            .related_mesh(cancel, &namespace, &service_names)
            .await?;
        let (config_maps, secrets) = config_refs(pod);

        tracing::debug!(
            namespace = %namespace,
            pod = ?pod.metadata.name,
            services = services.len(),
            ingresses = ingresses.len(),
            "resolved related resources"
        );
        Ok(RelatedResources {
            owner,
            services,
            ingresses,
            virtual_services,
            gateways,
            config_maps,
            secrets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service(name: &str, selector: Option<serde_json::Value>) -> Service {
        let mut spec = json!({"type": "ClusterIP", "clusterIP": "10.96.0.10",
                              "ports": [{"port": 80, "protocol": "TCP"}]});
        if let Some(sel) = selector {
            spec["selector"] = sel;
        }
        serde_json::from_value(json!({
            "metadata": {"name": name, "namespace": "default"},
            "spec": spec
        }))
        .unwrap()
    }

    fn ingress_to(service: &str) -> Ingress {
        serde_json::from_value(json!({
            "metadata": {"name": "web", "namespace": "default",
                         "annotations": {"kubernetes.io/ingress.class": "nginx"}},
            "spec": {
                "rules": [
                    {"host": "metrics.example.com"},
                    {"host": "web.example.com", "http": {"paths": [
                        {"path": "/", "pathType": "Prefix",
                         "backend": {"service": {"name": service, "port": {"number": 80}}}}
                    ]}}
                ],
                "tls": [{"hosts": ["web.example.com"], "secretName": "web-tls"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pod_neighborhood_services_and_ingress() {
        let pod_labels = labels(&[("app", "web")]);
        let services = vec![
            service("web", Some(json!({"app": "web"}))),
            service("headless-external", None),
            service("api", Some(json!({"app": "api"}))),
        ];
        let matched = services_for_pod(&services, &pod_labels);
        assert_eq!(matched.len(), 1);
        let info = service_to_info(matched[0], None);
        assert_eq!(info.name, "web");
        assert_eq!(info.ports, vec!["TCP:80"]);
        assert_eq!(info.ready_endpoints, 0);

        let ingresses = [ingress_to("web")];
        let routed: Vec<_> = ingresses
            .iter()
            .filter(|i| ingress_references_service(i, "web"))
            .map(ingress_to_info)
            .collect();
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].class, "nginx");
        assert_eq!(routed[0].paths, vec!["/"]);
        assert!(routed[0].has_tls());
        assert_eq!(
            routed[0].hosts,
            vec!["metrics.example.com", "web.example.com"]
        );
    }

    #[test]
    fn ingress_to_other_service_is_not_related() {
        assert!(!ingress_references_service(&ingress_to("api"), "web"));
    }

    #[test]
    fn ready_endpoints_are_counted() {
        assert_eq!(count_ready_endpoints(None), 0);
        let endpoints: Endpoints = serde_json::from_value(json!({
            "metadata": {"name": "web"},
            "subsets": [
                {"addresses": [{"ip": "10.0.0.1"}, {"ip": "10.0.0.2"}],
                 "notReadyAddresses": [{"ip": "10.0.0.3"}]},
                {"addresses": [{"ip": "10.0.0.4"}]},
                {}
            ]
        }))
        .unwrap();
        assert_eq!(count_ready_endpoints(Some(&endpoints)), 3);
    }

    #[test]
    fn virtual_service_routes_and_gateways() {
        let vs: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "networking.istio.io/v1beta1",
            "kind": "VirtualService",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "hosts": ["web.example.com"],
                "gateways": ["mesh", "public-gw", "istio-system/shared-gw"],
                "http": [{"route": [
                    {"destination": {"host": "web.default.svc.cluster.local",
                                     "port": {"number": 8080.0}}}
                ]}]
            }
        }))
        .unwrap();
        assert!(virtual_service_matches(&vs, &["web".into()], "default"));
        assert!(!virtual_service_matches(&vs, &["api".into()], "default"));

        let info = virtual_service_to_info(&vs);
        assert_eq!(info.destinations, vec!["web.default.svc.cluster.local:8080"]);
        assert_eq!(
            gateway_refs(&info),
            vec![
                ("default".to_string(), "public-gw".to_string()),
                ("istio-system".to_string(), "shared-gw".to_string())
            ]
        );
    }

    #[test]
    fn gateway_servers_accept_float_ports() {
        let gw: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "networking.istio.io/v1beta1",
            "kind": "Gateway",
            "metadata": {"name": "public-gw", "namespace": "default"},
            "spec": {"servers": [
                {"port": {"number": 443.0, "protocol": "HTTPS"}, "hosts": ["*.example.com"],
                 "tls": {"mode": "SIMPLE"}},
                {"port": {"number": 80, "protocol": "HTTP"}, "hosts": ["*"]}
            ]}
        }))
        .unwrap();
        let info = gateway_to_info(&gw);
        assert_eq!(info.servers.len(), 2);
        assert_eq!(info.servers[0].port, 443);
        assert_eq!(info.servers[0].tls_mode, "SIMPLE");
        assert_eq!(info.servers[1].port, 80);
        assert_eq!(info.servers[1].tls_mode, "");
    }

    #[test]
    fn config_refs_are_deduplicated_and_sorted() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "containers": [
                    {"name": "app", "envFrom": [
                        {"configMapRef": {"name": "web-env"}},
                        {"secretRef": {"name": "web-secrets"}}
                    ]},
                    {"name": "sidecar", "envFrom": [{"configMapRef": {"name": "common"}}]}
                ],
                "volumes": [
                    {"name": "cfg", "configMap": {"name": "web-env"}},
                    {"name": "tls", "secret": {"secretName": "web-tls"}},
                    {"name": "data", "emptyDir": {}}
                ]
            }
        }))
        .unwrap();
        let (config_maps, secrets) = config_refs(&pod);
        assert_eq!(config_maps, vec!["common", "web-env"]);
        assert_eq!(secrets, vec!["web-secrets", "web-tls"]);
    }

    #[test]
    fn rollout_counts_accept_floats() {
        let rollout: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Rollout",
            "metadata": {"name": "canary"},
            "spec": {"replicas": 5.0},
            "status": {"readyReplicas": 4}
        }))
        .unwrap();
        assert_eq!(rollout_counts(&rollout), (5, 4));
    }
}
