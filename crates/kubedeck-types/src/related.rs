use serde::Serialize;

/// Workload that ultimately owns a pod
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OwnerInfo {
    pub kind: String,
    pub name: String,
    pub replicas: i32,
    pub ready_replicas: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub service_type: String,
    pub cluster_ip: String,
    /// "protocol:port" entries
    pub ports: Vec<String>,
    pub ready_endpoints: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngressInfo {
    pub name: String,
    pub class: String,
    pub hosts: Vec<String>,
    pub paths: Vec<String>,
    pub tls_hosts: Vec<String>,
}

impl IngressInfo {
    pub fn has_tls(&self) -> bool {
        !self.tls_hosts.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VirtualServiceInfo {
    pub name: String,
    pub namespace: String,
    pub hosts: Vec<String>,
    pub gateways: Vec<String>,
    /// "host:port" of every HTTP route destination
    pub destinations: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GatewayServer {
    pub port: i64,
    pub protocol: String,
    pub hosts: Vec<String>,
    pub tls_mode: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GatewayInfo {
    pub name: String,
    pub namespace: String,
    pub servers: Vec<GatewayServer>,
}

/// A pod's neighborhood
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelatedResources {
    pub owner: Option<OwnerInfo>,
    pub services: Vec<ServiceInfo>,
    pub ingresses: Vec<IngressInfo>,
    pub virtual_services: Vec<VirtualServiceInfo>,
    pub gateways: Vec<GatewayInfo>,
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
}
