//! Optional API groups
//!
//! Rollouts, the Istio mesh kinds and the metrics API are not part of every
//! cluster. They are discovered once when connecting; an absent group means the
//! matching features return empty results (or `Unavailable` for metrics).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use kube::Client;
use kube::discovery::ApiResource;

const ROLLOUTS_GROUP: &str = "argoproj.io";
const ROLLOUTS_VERSION: &str = "v1alpha1";
const ISTIO_GROUP: &str = "networking.istio.io";
const ISTIO_VERSION: &str = "v1beta1";
const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version: format!("{group}/{version}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

pub fn rollout_resource() -> ApiResource {
    api_resource(ROLLOUTS_GROUP, ROLLOUTS_VERSION, "Rollout", "rollouts")
}

pub fn virtual_service_resource() -> ApiResource {
    api_resource(ISTIO_GROUP, ISTIO_VERSION, "VirtualService", "virtualservices")
}

pub fn gateway_resource() -> ApiResource {
    api_resource(ISTIO_GROUP, ISTIO_VERSION, "Gateway", "gateways")
}

pub fn pod_metrics_resource() -> ApiResource {
    api_resource(METRICS_GROUP, METRICS_VERSION, "PodMetrics", "pods")
}

/// Dynamic resources available in the connected cluster
#[derive(Clone, Debug, Default)]
pub struct Capabilities {
    pub rollouts: Option<ApiResource>,
    pub virtual_services: Option<ApiResource>,
    pub gateways: Option<ApiResource>,
    pub pod_metrics: Option<ApiResource>,
}

impl Capabilities {
    /// Query the server's API groups. Discovery failure leaves every
    /// optional subsystem disabled rather than failing the connection.
    pub async fn discover(client: &Client) -> Self {
        match client.list_api_groups().await {
            Ok(groups) => Self::from_groups(&groups),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "API group discovery failed, optional features disabled"
                );
                Self::default()
            }
        }
    }

    pub fn from_groups(groups: &APIGroupList) -> Self {
        let serves = |group: &str, version: &str| {
            groups.groups.iter().any(|g| {
                g.name == group && g.versions.iter().any(|v| v.version == version)
            })
        };

        let istio = serves(ISTIO_GROUP, ISTIO_VERSION);
        Self {
            rollouts: serves(ROLLOUTS_GROUP, ROLLOUTS_VERSION).then(rollout_resource),
            virtual_services: istio.then(virtual_service_resource),
            gateways: istio.then(gateway_resource),
            pod_metrics: serves(METRICS_GROUP, METRICS_VERSION).then(pod_metrics_resource),
        }
    }
}
