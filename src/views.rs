//! Plain text renderings of the kubedeck value types

use std::fmt::Write;

use kubedeck_k8s::format::{format_cpu, format_memory};
use kubedeck_types::{
    ConfigMapData, ConfigMapInfo, ContextInfo, EventInfo, ForceDeleteReport, HpaData, HpaInfo,
    LogLine, NamespaceInfo, NamespaceResources, NodeInfo, PodDetails, PodInfo, PodMetrics,
    RelatedResources, SecretData, SecretInfo, WorkloadInfo,
};

use crate::output::{Table, join_or_dash, or_dash};

pub fn contexts(contexts: &[ContextInfo]) -> Table {
    let mut table = Table::new(&["CURRENT", "NAME", "CLUSTER", "USER", "NAMESPACE"]);
    for ctx in contexts {
        table.row([
            if ctx.is_current { "*" } else { "" }.to_string(),
            ctx.name.clone(),
            ctx.cluster.clone(),
            ctx.user.clone(),
            ctx.namespace.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn namespaces(namespaces: &[NamespaceInfo]) -> Table {
    let mut table = Table::new(&["NAME", "STATUS", "AGE"]);
    for ns in namespaces {
        table.row([ns.name.as_str(), ns.status.as_str(), ns.age.as_str()]);
    }
    table
}

pub fn namespace_resources(resources: &NamespaceResources) -> String {
    format!(
        "Pods:\n{}\nConfigMaps:\n{}\nSecrets:\n{}",
        pods(&resources.pods).render(),
        config_maps(&resources.config_maps).render(),
        secrets(&resources.secrets).render()
    )
}

pub fn workloads(workloads: &[WorkloadInfo]) -> Table {
    let mut table = Table::new(&["NAME", "READY", "STATUS", "RESTARTS", "AGE"]);
    for w in workloads {
        table.row([
            w.name.clone(),
            w.ready.clone(),
            or_dash(&w.status),
            w.restart_count.to_string(),
            w.age.clone(),
        ]);
    }
    table
}

pub fn pods(pods: &[PodInfo]) -> Table {
    let mut table = Table::new(&["NAME", "READY", "STATUS", "RESTARTS", "AGE", "IP", "NODE"]);
    for pod in pods {
        table.row([
            pod.name.clone(),
            pod.ready.clone(),
            pod.status.clone(),
            pod.restarts.to_string(),
            pod.age.clone(),
            or_dash(&pod.pod_ip),
            or_dash(&pod.node_name),
        ]);
    }
    table
}

pub fn events(events: &[EventInfo]) -> Table {
    let mut table = Table::new(&["LAST SEEN", "TYPE", "REASON", "OBJECT", "COUNT", "MESSAGE"]);
    for e in events {
        table.row([
            e.age.clone(),
            e.event_type.clone(),
            e.reason.clone(),
            e.object.clone(),
            e.count.to_string(),
            e.message.clone(),
        ]);
    }
    table
}

pub fn logs(lines: &[LogLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let ts = line
            .timestamp
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{ts} [{}] {}", line.container, line.content);
    }
    out
}

pub fn nodes(nodes: &[NodeInfo]) -> Table {
    let mut table = Table::new(&["NAME", "STATUS", "ROLES", "AGE", "VERSION", "PODS"]);
    for node in nodes {
        let status = if node.unschedulable {
            format!("{},SchedulingDisabled", node.status)
        } else {
            node.status.clone()
        };
        table.row([
            node.name.clone(),
            status,
            node.roles.clone(),
            node.age.clone(),
            node.kubelet_version.clone(),
            node.pod_count.to_string(),
        ]);
    }
    table
}

pub fn node(node: &NodeInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:               {}", node.name);
    let _ = writeln!(out, "Status:             {}", node.status);
    let _ = writeln!(out, "Roles:              {}", node.roles);
    let _ = writeln!(out, "Age:                {}", node.age);
    let _ = writeln!(out, "Internal IP:        {}", or_dash(&node.internal_ip));
    let _ = writeln!(out, "Kubelet:            {}", node.kubelet_version);
    let _ = writeln!(out, "OS image:           {}", node.os_image);
    let _ = writeln!(out, "Container runtime:  {}", node.container_runtime);
    let _ = writeln!(
        out,
        "Capacity:           cpu={} memory={}",
        node.cpu, node.memory
    );
    let _ = writeln!(
        out,
        "Allocatable:        cpu={} memory={}",
        node.allocatable_cpu, node.allocatable_memory
    );
    let _ = writeln!(out, "Pods:               {}", node.pod_count);
    let _ = writeln!(out, "Unschedulable:      {}", node.unschedulable);
    let _ = writeln!(out, "Taints:             {}", join_or_dash(&node.taints));
    out
}

pub fn config_maps(items: &[ConfigMapInfo]) -> Table {
    let mut table = Table::new(&["NAME", "DATA", "AGE"]);
    for cm in items {
        table.row([cm.name.clone(), cm.key_count.to_string(), cm.age.clone()]);
    }
    table
}

pub fn config_map(cm: &ConfigMapData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:       {}", cm.name);
    let _ = writeln!(out, "Namespace:  {}", cm.namespace);
    let _ = writeln!(out, "Age:        {}", cm.age);
    key_values(&mut out, cm.data.iter());
    out
}

pub fn secrets(items: &[SecretInfo]) -> Table {
    let mut table = Table::new(&["NAME", "TYPE", "DATA", "AGE"]);
    for s in items {
        table.row([
            s.name.clone(),
            s.secret_type.clone(),
            s.key_count.to_string(),
            s.age.clone(),
        ]);
    }
    table
}

pub fn secret(secret: &SecretData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:       {}", secret.name);
    let _ = writeln!(out, "Namespace:  {}", secret.namespace);
    let _ = writeln!(out, "Type:       {}", secret.secret_type);
    let _ = writeln!(out, "Age:        {}", secret.age);
    key_values(&mut out, secret.data.iter());
    out
}

fn key_values<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a String)>) {
    let _ = writeln!(out, "\nData");
    let _ = writeln!(out, "====");
    for (key, value) in entries {
        let _ = writeln!(out, "{key}:\n----\n{value}\n");
    }
}

pub fn hpas(items: &[HpaInfo]) -> Table {
    let mut table = Table::new(&[
        "NAME",
        "REFERENCE",
        "TARGETS",
        "MINPODS",
        "MAXPODS",
        "REPLICAS",
        "AGE",
    ]);
    for hpa in items {
        table.row([
            hpa.name.clone(),
            hpa.reference.clone(),
            hpa.targets.clone(),
            hpa.min_replicas.to_string(),
            hpa.max_replicas.to_string(),
            hpa.current_replicas.to_string(),
            hpa.age.clone(),
        ]);
    }
    table
}

pub fn hpa(hpa: &HpaData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:       {}", hpa.name);
    let _ = writeln!(out, "Namespace:  {}", hpa.namespace);
    let _ = writeln!(out, "Reference:  {}", hpa.reference);
    let _ = writeln!(
        out,
        "Replicas:   {} current / {} desired (min {}, max {})",
        hpa.current_replicas, hpa.desired_replicas, hpa.min_replicas, hpa.max_replicas
    );
    if let Some(ts) = hpa.last_scale_time {
        let _ = writeln!(out, "Last scale: {}", ts.to_rfc3339());
    }

    let mut metrics = Table::new(&["TYPE", "NAME", "CURRENT", "TARGET"]);
    for m in &hpa.metrics {
        metrics.row([
            m.metric_type.to_string(),
            m.name.clone(),
            m.current.clone(),
            m.target.clone(),
        ]);
    }
    let _ = writeln!(out, "\nMetrics:\n{}", metrics.render());

    let mut conditions = Table::new(&["TYPE", "STATUS", "REASON", "MESSAGE"]);
    for c in &hpa.conditions {
        conditions.row([
            c.condition_type.as_str(),
            c.status.as_str(),
            c.reason.as_str(),
            c.message.as_str(),
        ]);
    }
    let _ = write!(out, "Conditions:\n{}", conditions.render());
    out
}

pub fn metrics(items: &[PodMetrics]) -> Table {
    let mut table = Table::new(&["POD", "CONTAINER", "CPU", "CPU%", "MEMORY", "MEM%"]);
    for pod in items {
        for c in &pod.containers {
            table.row([
                pod.name.clone(),
                c.name.clone(),
                c.cpu_usage.clone(),
                percent(c.cpu_percent),
                c.memory_usage.clone(),
                percent(c.mem_percent),
            ]);
        }
    }
    table
}

fn percent(value: Option<f64>) -> String {
    value.map(|p| format!("{p:.0}%")).unwrap_or_else(|| "-".to_string())
}

pub fn related(related: &RelatedResources) -> String {
    let mut out = String::new();
    match &related.owner {
        Some(owner) => {
            let _ = writeln!(
                out,
                "Owner:     {}/{} ({}/{} ready)",
                owner.kind, owner.name, owner.ready_replicas, owner.replicas
            );
        }
        None => {
            let _ = writeln!(out, "Owner:     -");
        }
    }

    for svc in &related.services {
        let _ = writeln!(
            out,
            "Service:   {} {} {} [{}] endpoints={}",
            svc.name,
            svc.service_type,
            or_dash(&svc.cluster_ip),
            svc.ports.join(","),
            svc.ready_endpoints
        );
    }
    for ing in &related.ingresses {
        let _ = writeln!(
            out,
            "Ingress:   {} class={} hosts={} paths={}{}",
            ing.name,
            or_dash(&ing.class),
            join_or_dash(&ing.hosts),
            join_or_dash(&ing.paths),
            if ing.has_tls() { " tls" } else { "" }
        );
    }
    for vs in &related.virtual_services {
        let _ = writeln!(
            out,
            "VirtualService: {}/{} hosts={} gateways={} -> {}",
            vs.namespace,
            vs.name,
            join_or_dash(&vs.hosts),
            join_or_dash(&vs.gateways),
            join_or_dash(&vs.destinations)
        );
    }
    for gw in &related.gateways {
        let servers: Vec<String> = gw
            .servers
            .iter()
            .map(|s| format!("{}/{}", s.port, s.protocol))
            .collect();
        let _ = writeln!(
            out,
            "Gateway:   {}/{} servers={}",
            gw.namespace,
            gw.name,
            join_or_dash(&servers)
        );
    }
    let _ = writeln!(out, "ConfigMaps: {}", join_or_dash(&related.config_maps));
    let _ = writeln!(out, "Secrets:    {}", join_or_dash(&related.secrets));
    out
}

pub fn pod_details(details: &PodDetails) -> String {
    let pod = &details.pod;
    let mut out = String::new();
    let _ = writeln!(out, "Name:        {}", pod.name);
    let _ = writeln!(out, "Namespace:   {}", pod.namespace);
    let _ = writeln!(out, "Node:        {}", or_dash(&pod.node_name));
    let _ = writeln!(out, "Status:      {}", pod.status);
    let _ = writeln!(out, "Ready:       {}", pod.ready);
    let _ = writeln!(out, "Restarts:    {}", pod.restarts);
    let _ = writeln!(out, "IP:          {}", or_dash(&pod.pod_ip));
    let _ = writeln!(out, "QoS:         {}", or_dash(&pod.qos_class));
    let _ = writeln!(out, "Age:         {}", pod.age);
    if !pod.owner.is_empty() {
        let _ = writeln!(out, "Controlled by: {}/{}", pod.owner.kind, pod.owner.name);
    }

    let mut containers = Table::new(&[
        "CONTAINER", "IMAGE", "STATE", "READY", "RESTARTS", "CPU REQ/LIM", "MEM REQ/LIM",
    ]);
    for c in &pod.containers {
        containers.row([
            c.name.clone(),
            c.image.clone(),
            c.state.as_str().to_string(),
            c.ready.to_string(),
            c.restart_count.to_string(),
            format!(
                "{}/{}",
                or_dash(&c.resources.cpu_request),
                or_dash(&c.resources.cpu_limit)
            ),
            format!(
                "{}/{}",
                or_dash(&c.resources.memory_request),
                or_dash(&c.resources.memory_limit)
            ),
        ]);
    }
    let _ = write!(out, "\n{}", containers.render());

    if let Some(metrics) = &details.metrics {
        let _ = writeln!(
            out,
            "\nUsage: cpu={} memory={}",
            format_cpu(metrics.total_cpu_millis()),
            format_memory(metrics.total_memory_bytes())
        );
    }

    if !details.debug_helpers.is_empty() {
        let _ = writeln!(out, "\nHints:");
        for helper in &details.debug_helpers {
            let _ = writeln!(out, "  [{}] {}", helper.severity, helper.issue);
            for suggestion in &helper.suggestions {
                let _ = writeln!(out, "      - {suggestion}");
            }
        }
    }

    if let Some(related) = &details.related {
        let _ = write!(out, "\n{}", self::related(related));
    }

    if !details.events.is_empty() {
        let _ = write!(out, "\nEvents:\n{}", events(&details.events).render());
    }

    if !details.logs.is_empty() {
        let _ = write!(out, "\nLogs:\n{}", logs(&details.logs));
    }
    out
}

pub fn force_delete_report(report: &ForceDeleteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Namespace {}: deleted {} objects, finalizers removed: {}",
        report.namespace, report.deleted, report.finalizers_removed
    );
    for failure in &report.failures {
        let _ = writeln!(out, "  failed: {failure}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubedeck_types::{DebugHelper, OwnerInfo, Severity};

    #[test]
    fn pod_details_include_hints_and_owner() {
        let mut pod = PodInfo::new("web-0".into(), "default".into());
        pod.status = "CrashLoopBackOff".into();
        let details = PodDetails {
            pod,
            logs: vec![LogLine::new("app", "boom")],
            events: Vec::new(),
            metrics: None,
            related: Some(RelatedResources {
                owner: Some(OwnerInfo {
                    kind: "Deployment".into(),
                    name: "web".into(),
                    replicas: 3,
                    ready_replicas: 2,
                }),
                ..Default::default()
            }),
            node: None,
            debug_helpers: vec![DebugHelper::new(
                "Container Crash Loop",
                Severity::High,
                &["Check the logs"],
            )],
        };

        let text = pod_details(&details);
        assert!(text.contains("Status:      CrashLoopBackOff"));
        assert!(text.contains("[High] Container Crash Loop"));
        assert!(text.contains("Owner:     Deployment/web (2/3 ready)"));
        assert!(text.contains(" [app] boom"));
        assert!(!text.contains("Events:"));
    }

    #[test]
    fn unschedulable_nodes_are_marked() {
        let node = NodeInfo {
            name: "node-a".into(),
            status: "Ready".into(),
            unschedulable: true,
            ..Default::default()
        };
        assert!(nodes(&[node]).render().contains("Ready,SchedulingDisabled"));
    }

    #[test]
    fn missing_percentages_render_as_dash() {
        assert_eq!(percent(None), "-");
        assert_eq!(percent(Some(42.4)), "42%");
    }
}
