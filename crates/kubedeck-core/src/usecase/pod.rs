use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use kubedeck_k8s::{KubernetesRepository, Result, best_effort};
use kubedeck_types::{
    EventInfo, LogLine, LogOptions, PodDetails, PodInfo, PodMetrics, RelatedResources,
};

use crate::diagnostics::analyze_pod_issues;

/// Pod views: listings, details, logs and deletion
#[derive(Clone)]
pub struct PodUseCase {
    repo: Arc<dyn KubernetesRepository>,
}

impl PodUseCase {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_pods(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodInfo>> {
        self.repo.list_all_pods(cancel, namespace).await
    }

    pub async fn get_pod(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<PodInfo> {
        self.repo.get_pod(cancel, namespace, name).await
    }

    /// Everything the detail view shows.
    ///
    /// Only the pod lookup can fail the call. The remaining fetches run one
    /// after another and leave their field empty when they fail; cancellation
    /// still aborts. Hints are computed last from what was gathered.
    pub async fn get_pod_details(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        log_tail: i64,
    ) -> Result<PodDetails> {
        let pod = self.repo.get_pod(cancel, namespace, name).await?;

        let logs = best_effort(
            self.repo
                .get_all_container_logs(cancel, namespace, name, log_tail)
                .await,
            "pod logs",
        )?
        .unwrap_or_default();

        let events = best_effort(
            self.repo.get_pod_events(cancel, namespace, name).await,
            "pod events",
        )?
        .unwrap_or_default();

        let metrics = best_effort(
            self.repo.get_pod_metrics(cancel, namespace, name).await,
            "pod metrics",
        )?;

        let related = best_effort(
            self.repo.get_related_resources(cancel, namespace, name).await,
            "related resources",
        )?;

        let node = if pod.node_name.is_empty() {
            None
        } else {
            best_effort(self.repo.get_node(cancel, &pod.node_name).await, "node")?
        };

        let debug_helpers = analyze_pod_issues(Some(&pod), &events);
        debug!(
            namespace = %namespace,
            pod = %name,
            logs = logs.len(),
            events = events.len(),
            hints = debug_helpers.len(),
            "Collected pod details"
        );

        Ok(PodDetails {
            pod,
            logs,
            events,
            metrics,
            related,
            node,
            debug_helpers,
        })
    }

    pub async fn get_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<Vec<LogLine>> {
        self.repo.get_pod_logs(cancel, namespace, pod, options).await
    }

    pub async fn get_all_container_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        self.repo
            .get_all_container_logs(cancel, namespace, pod, tail_lines)
            .await
    }

    pub async fn get_previous_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        self.repo
            .get_previous_logs(cancel, namespace, pod, container, tail_lines)
            .await
    }

    /// Merged logs of every container containing `query`, case-insensitively
    pub async fn search_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
        query: &str,
    ) -> Result<Vec<LogLine>> {
        let logs = self
            .get_all_container_logs(cancel, namespace, pod, tail_lines)
            .await?;
        Ok(kubedeck_logs::search_logs(&logs, query))
    }

    pub async fn get_error_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        let logs = self
            .get_all_container_logs(cancel, namespace, pod, tail_lines)
            .await?;
        Ok(kubedeck_logs::filter_error_logs(&logs))
    }

    /// Merged logs within `window_minutes` of `target`, e.g. around an event
    pub async fn get_logs_around(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
        target: DateTime<Utc>,
        window_minutes: i64,
    ) -> Result<Vec<LogLine>> {
        let logs = self
            .get_all_container_logs(cancel, namespace, pod, tail_lines)
            .await?;
        Ok(kubedeck_logs::logs_around_time(&logs, target, window_minutes))
    }

    pub async fn get_pod_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<EventInfo>> {
        self.repo.get_pod_events(cancel, namespace, pod).await
    }

    pub async fn get_pod_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<PodMetrics> {
        self.repo.get_pod_metrics(cancel, namespace, pod).await
    }

    pub async fn get_namespace_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodMetrics>> {
        self.repo.get_namespace_metrics(cancel, namespace).await
    }

    pub async fn get_related_resources(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<RelatedResources> {
        self.repo.get_related_resources(cancel, namespace, pod).await
    }

    pub async fn delete_pod(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.repo.delete_pod(cancel, namespace, name).await
    }
}
