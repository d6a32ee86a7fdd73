//! Use cases for kubedeck
//!
//! Everything here is written against the repository ports of `kubedeck-k8s`,
//! so the same flows run against a live cluster or an in-memory fake.

mod diagnostics;
pub mod usecase;

#[cfg(test)]
mod testing;

pub use diagnostics::analyze_pod_issues;
pub use usecase::{
    ClusterUseCase, ConfigUseCase, NamespaceUseCase, PodUseCase, UseCases, WorkloadUseCase,
};

// Error type shared with the access layer
pub use kubedeck_k8s::{Error, Result};
