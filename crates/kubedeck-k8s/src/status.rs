//! Status derivation shared by list and detail views

use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use kubedeck_types::OwnerRef;

/// Display status of a pod. First match wins:
/// deletion in progress, a waiting reason, a terminated reason, then the phase.
pub fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or(&[]);

    let waiting = statuses.iter().find_map(|cs| {
        cs.state
            .as_ref()
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.clone())
            .filter(|r| !r.is_empty())
    });
    if let Some(reason) = waiting {
        return reason;
    }

    let terminated = statuses.iter().find_map(|cs| {
        cs.state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .and_then(|t| t.reason.clone())
            .filter(|r| !r.is_empty())
    });
    if let Some(reason) = terminated {
        return reason;
    }

    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .filter(|p| !p.is_empty())
        .unwrap_or("Unknown");
    title_case(phase)
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Sum of container restart counts
pub fn pod_restarts(pod: &Pod) -> i32 {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().map(|c| c.restart_count).sum())
        .unwrap_or(0)
}

/// "ready/total" over regular containers
pub fn pod_ready(pod: &Pod) -> String {
    let total = pod.spec.as_ref().map(|s| s.containers.len()).unwrap_or(0);
    let ready = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().filter(|c| c.ready).count())
        .unwrap_or(0);
    format!("{ready}/{total}")
}

/// Deployments, StatefulSets, DaemonSets and Rollouts: all replicas ready or not
pub fn replica_status(ready: i32, desired: i32) -> &'static str {
    if ready == desired {
        "Running"
    } else {
        "Progressing"
    }
}

pub fn job_status(job: &Job) -> &'static str {
    let status = job.status.as_ref();
    let failed = status.and_then(|s| s.failed).unwrap_or(0);
    let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);
    let completions = job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1);

    if failed > 0 {
        "Failed"
    } else if succeeded >= completions {
        "Completed"
    } else {
        "Running"
    }
}

pub fn cronjob_status(cronjob: &CronJob) -> &'static str {
    let suspended = cronjob
        .spec
        .as_ref()
        .and_then(|s| s.suspend)
        .unwrap_or(false);
    if suspended { "Suspended" } else { "Active" }
}

/// Every selector entry must be present in `labels` with the same value.
/// An empty selector matches everything.
pub fn labels_match(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

/// First owner reference, or empty strings
pub fn owner_of(meta: &ObjectMeta) -> OwnerRef {
    meta.owner_references
        .as_ref()
        .and_then(|refs| refs.first())
        .map(|r| OwnerRef {
            kind: r.kind.clone(),
            name: r.name.clone(),
        })
        .unwrap_or_default()
}

/// Label selector string for list calls, e.g. `app=web,tier=frontend`
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
