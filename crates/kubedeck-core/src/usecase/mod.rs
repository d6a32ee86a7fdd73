//! Application flows built from the repository ports

mod cluster;
mod config;
mod namespace;
mod pod;
mod workload;

pub use cluster::ClusterUseCase;
pub use config::ConfigUseCase;
pub use namespace::NamespaceUseCase;
pub use pod::PodUseCase;
pub use workload::WorkloadUseCase;

use std::sync::Arc;

use kubedeck_k8s::KubernetesRepository;

/// All use cases over one shared repository
#[derive(Clone)]
pub struct UseCases {
    pub pods: PodUseCase,
    pub workloads: WorkloadUseCase,
    pub namespaces: NamespaceUseCase,
    pub configs: ConfigUseCase,
    pub cluster: ClusterUseCase,
}

impl UseCases {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self {
            pods: PodUseCase::new(Arc::clone(&repo)),
            workloads: WorkloadUseCase::new(Arc::clone(&repo)),
            namespaces: NamespaceUseCase::new(Arc::clone(&repo)),
            configs: ConfigUseCase::new(Arc::clone(&repo)),
            cluster: ClusterUseCase::new(repo),
        }
    }
}
