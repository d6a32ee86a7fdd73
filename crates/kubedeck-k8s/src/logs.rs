//! Batch log fetches

use futures::future::join_all;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, LogParams};
use tokio_util::sync::CancellationToken;

use kubedeck_logs::{merge_container_logs, parse_log_stream, per_container_tail};
use kubedeck_types::{LogLine, LogOptions};

use crate::client::{KubeRepository, guard};
use crate::error::{Error, Result};

/// Request parameters for a one-shot log read
pub fn log_params(options: &LogOptions) -> LogParams {
    LogParams {
        container: (!options.container.is_empty()).then(|| options.container.clone()),
        tail_lines: (options.tail_lines > 0).then_some(options.tail_lines),
        since_seconds: options
            .since
            .filter(|d| !d.is_zero())
            .map(|d| {
                let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
                i64::try_from(secs).unwrap_or(i64::MAX)
            }),
        previous: options.previous,
        timestamps: options.timestamps,
        follow: false,
        ..Default::default()
    }
}

impl KubeRepository {
    pub(crate) async fn fetch_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<Vec<LogLine>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let params = log_params(options);
        tracing::debug!(
            namespace = %namespace,
            pod = %pod,
            container = %options.container,
            previous = options.previous,
            "fetching logs"
        );
        guard(cancel, async {
            let stream = api
                .log_stream(pod, &params)
                .await
                .map_err(|e| Error::from_kube(e, "Pod", pod))?;
            let lines =
                parse_log_stream(Box::pin(stream), &options.container, options.timestamps).await?;
            Ok(lines)
        })
        .await
    }

    /// Fetch every container concurrently and merge by timestamp. Containers
    /// whose fetch fails are left out.
    pub(crate) async fn fetch_merged_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        containers: &[String],
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        let tail = per_container_tail(tail_lines, containers.len());
        let fetches = containers.iter().map(|container| {
            let options = LogOptions::for_container(container.as_str(), tail);
            async move { (container, self.fetch_logs(cancel, namespace, pod, &options).await) }
        });

        let mut batches = Vec::with_capacity(containers.len());
        for (container, result) in join_all(fetches).await {
            match result {
                Ok(lines) => batches.push(lines),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::debug!(
                        pod = %pod,
                        container = %container,
                        error = %e,
                        "skipping container logs",
                    );
                }
            }
        }
        Ok(merge_container_logs(batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_options_map_to_params() {
        let params = log_params(&LogOptions::default());
        assert_eq!(params.container, None);
        assert_eq!(params.tail_lines, Some(100));
        assert_eq!(params.since_seconds, None);
        assert!(params.timestamps);
        assert!(!params.previous);
        assert!(!params.follow);
    }

    #[test]
    fn zero_values_mean_unlimited() {
        let options = LogOptions {
            container: "app".into(),
            tail_lines: 0,
            since: Some(Duration::ZERO),
            previous: true,
            follow: true,
            timestamps: false,
        };
        let params = log_params(&options);
        assert_eq!(params.container.as_deref(), Some("app"));
        assert_eq!(params.tail_lines, None);
        assert_eq!(params.since_seconds, None);
        assert!(params.previous);
        assert!(!params.follow);
    }

    #[test]
    fn since_rounds_up_to_a_second() {
        let options = LogOptions {
            since: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        assert_eq!(log_params(&options).since_seconds, Some(1));
    }
}
