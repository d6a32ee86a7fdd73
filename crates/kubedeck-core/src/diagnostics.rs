//! Heuristic pod issue analysis

use kubedeck_types::{DebugHelper, EventInfo, PodInfo, Severity};

const CRASH_LOOP: &[&str] = &[
    "Check the container logs, including the previous instance",
    "Verify resource limits are sufficient for the workload",
    "Review the liveness probe timing and endpoint",
    "Check that the application's startup dependencies are reachable",
];

const IMAGE_PULL: &[&str] = &[
    "Verify the image name and tag",
    "Check registry credentials and imagePullSecrets",
    "Confirm the node can reach the registry",
    "Make sure the image exists in the registry",
];

const PENDING: &[&str] = &[
    "Check scheduler events for this pod",
    "Verify the nodes have enough free capacity",
    "Review node selectors, affinity rules and tolerations",
];

const OUT_OF_MEMORY: &[&str] = &[
    "Raise the container's memory limit",
    "Investigate the application for memory leaks",
    "Review memory usage metrics over time",
    "Scale horizontally to spread the load",
];

const NO_MEMORY_LIMIT: &[&str] = &[
    "Set resources.limits.memory so one container cannot starve the node",
];

const FAILED_SCHEDULING: &[&str] = &[
    "Check node resources and allocatable capacity",
    "Review taints, tolerations and node selectors",
];

fn status_helper(status: &str) -> Option<DebugHelper> {
    let helper = match status {
        "CrashLoopBackOff" => DebugHelper::new("Container Crash Loop", Severity::High, CRASH_LOOP),
        "ImagePullBackOff" | "ErrImagePull" => {
            DebugHelper::new("Image Pull Failure", Severity::High, IMAGE_PULL)
        }
        "Pending" => DebugHelper::new("Pod Pending", Severity::Medium, PENDING),
        "OOMKilled" => DebugHelper::new("Out of Memory", Severity::High, OUT_OF_MEMORY),
        _ => return None,
    };
    Some(helper)
}

/// Hints for a pod, in order: its status, containers without a memory limit,
/// then scheduling failures reported by events. No pod means no hints.
pub fn analyze_pod_issues(pod: Option<&PodInfo>, events: &[EventInfo]) -> Vec<DebugHelper> {
    let Some(pod) = pod else {
        return Vec::new();
    };

    let mut helpers: Vec<DebugHelper> = status_helper(&pod.status).into_iter().collect();

    helpers.extend(
        pod.containers
            .iter()
            .filter(|c| c.lacks_memory_limit())
            .map(|c| {
                DebugHelper::new(
                    format!("No memory limit on container {}", c.name),
                    Severity::Warning,
                    NO_MEMORY_LIMIT,
                )
            }),
    );

    helpers.extend(
        events
            .iter()
            .filter(|e| e.is_warning() && e.reason == "FailedScheduling")
            .map(|e| {
                DebugHelper::new(
                    format!("Scheduling failed: {}", e.message),
                    Severity::High,
                    FAILED_SCHEDULING,
                )
            }),
    );

    helpers
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubedeck_types::ContainerInfo;

    fn pod(status: &str) -> PodInfo {
        let mut pod = PodInfo::new("web-1".into(), "default".into());
        pod.status = status.to_string();
        pod
    }

    fn with_limit(name: &str, limit: &str) -> ContainerInfo {
        let mut c = ContainerInfo::new(name.into());
        c.resources.memory_limit = limit.into();
        c
    }

    fn warning(reason: &str, message: &str) -> EventInfo {
        EventInfo {
            event_type: "Warning".into(),
            reason: reason.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    #[test]
    fn no_pod_no_hints() {
        assert!(analyze_pod_issues(None, &[warning("FailedScheduling", "x")]).is_empty());
    }

    #[test]
    fn oom_then_scheduling_failure() {
        let helpers = analyze_pod_issues(
            Some(&pod("OOMKilled")),
            &[warning("FailedScheduling", "insufficient memory")],
        );
        assert_eq!(helpers.len(), 2);
        assert_eq!(helpers[0].issue, "Out of Memory");
        assert_eq!(helpers[0].severity, Severity::High);
        assert_eq!(helpers[1].severity, Severity::High);
        assert!(helpers[1].issue.contains("insufficient memory"));
    }

    #[test]
    fn status_rules() {
        let cases = [
            ("CrashLoopBackOff", "Container Crash Loop", Severity::High),
            ("ImagePullBackOff", "Image Pull Failure", Severity::High),
            ("ErrImagePull", "Image Pull Failure", Severity::High),
            ("Pending", "Pod Pending", Severity::Medium),
        ];
        for (status, issue, severity) in cases {
            let helpers = analyze_pod_issues(Some(&pod(status)), &[]);
            assert_eq!(helpers.len(), 1, "{status}");
            assert_eq!(helpers[0].issue, issue);
            assert_eq!(helpers[0].severity, severity);
            assert!(!helpers[0].suggestions.is_empty());
        }
        assert!(analyze_pod_issues(Some(&pod("Running")), &[]).is_empty());
    }

    #[test]
    fn containers_without_memory_limit() {
        let mut p = pod("Running");
        p.containers = vec![
            with_limit("app", "512Mi"),
            with_limit("sidecar", ""),
            with_limit("debug", "0"),
        ];
        let helpers = analyze_pod_issues(Some(&p), &[]);
        let issues: Vec<_> = helpers.iter().map(|h| h.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec![
                "No memory limit on container sidecar",
                "No memory limit on container debug"
            ]
        );
        assert!(helpers.iter().all(|h| h.severity == Severity::Warning));
    }

    #[test]
    fn only_warning_scheduling_events_count() {
        let normal = EventInfo {
            event_type: "Normal".into(),
            reason: "FailedScheduling".into(),
            ..Default::default()
        };
        let other = warning("BackOff", "restarting");
        assert!(analyze_pod_issues(Some(&pod("Running")), &[normal, other]).is_empty());
    }
}
