use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use kubedeck_types::ResourceType;

use crate::config::OutputFormat;

/// Kubedeck - browse, diagnose and operate Kubernetes clusters from the terminal
#[derive(Parser, Debug)]
#[command(name = "kubedeck")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Kubeconfig context (defaults to the current context)
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Namespace (defaults to the config file, then the context's namespace)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List kubeconfig contexts
    Contexts,

    /// List namespaces
    Namespaces,

    /// Pods, ConfigMaps and Secrets of the namespace
    Resources,

    /// List workloads of one kind
    ///
    /// Kinds: deployments, statefulsets, daemonsets, jobs, cronjobs, rollouts, pods
    Workloads { resource_type: ResourceType },

    /// Show one workload with its pods and events
    Workload {
        resource_type: ResourceType,
        name: String,
    },

    /// List pods of the namespace, or of a node across namespaces
    Pods {
        #[arg(long)]
        node: Option<String>,
    },

    /// Pod details with logs, events, related resources and hints
    Pod {
        name: String,

        /// Log lines to include
        #[arg(long)]
        tail: Option<i64>,
    },

    /// Pod logs, all containers merged unless one is named
    Logs {
        pod: String,

        /// Restrict to these containers; repeatable
        #[arg(short, long = "container", value_name = "NAME")]
        containers: Vec<String>,

        #[arg(long)]
        tail: Option<i64>,

        /// Logs of the previous container instance
        #[arg(short, long)]
        previous: bool,

        /// Only lines that look like errors
        #[arg(long)]
        errors: bool,

        /// Only lines matching this pattern, ignoring case
        #[arg(long, value_name = "PATTERN")]
        grep: Option<String>,

        /// Drop lines matching --grep instead of keeping them
        #[arg(long, requires = "grep")]
        invert: bool,
    },

    /// Namespace events, most recent first
    Events {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Recent warning events
    Warnings {
        /// Look-back window
        #[arg(long)]
        minutes: Option<u64>,
    },

    /// List nodes
    Nodes,

    /// Node details
    Node { name: String },

    /// List ConfigMaps, or show one
    Configmaps { name: Option<String> },

    /// List Secrets, or show one decoded
    Secrets { name: Option<String> },

    /// List HorizontalPodAutoscalers
    Hpas,

    /// HorizontalPodAutoscaler details
    Hpa { name: String },

    /// Owner, services, ingresses, mesh routes and config of a pod
    Related { pod: String },

    /// Resource usage of one pod or the whole namespace
    Metrics { pod: Option<String> },

    /// Set the replica count of a deployment, statefulset or rollout
    Scale {
        resource_type: ResourceType,
        name: String,
        replicas: i32,
    },

    /// Rolling restart of a deployment, statefulset, daemonset or rollout
    Restart {
        resource_type: ResourceType,
        name: String,
    },

    /// Delete a pod
    DeletePod { name: String },

    /// Copy a ConfigMap into another namespace, overwriting its data there
    CopyConfigmap {
        name: String,
        target_namespace: String,
    },

    /// Copy a Secret into another namespace, overwriting its data there
    CopySecret {
        name: String,
        target_namespace: String,
    },

    /// Delete everything in a namespace, strip its finalizers and delete it
    ForceDeleteNamespace {
        namespace: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "kubedeck", "workloads", "deploy", "-n", "payments", "-o", "json", "-vv",
        ])
        .unwrap();
        assert_eq!(args.namespace.as_deref(), Some("payments"));
        assert_eq!(args.output, Some(OutputFormat::Json));
        assert_eq!(args.verbose, 2);
        assert!(matches!(
            args.command,
            Command::Workloads {
                resource_type: ResourceType::Deployments
            }
        ));
    }

    #[test]
    fn parses_kebab_case_subcommands() {
        let args =
            Args::try_parse_from(["kubedeck", "copy-secret", "db-creds", "staging"]).unwrap();
        assert!(matches!(args.command, Command::CopySecret { .. }));

        let args =
            Args::try_parse_from(["kubedeck", "force-delete-namespace", "old", "--yes"]).unwrap();
        assert!(matches!(args.command, Command::ForceDeleteNamespace { yes: true, .. }));
    }

    #[test]
    fn rejects_unknown_resource_type() {
        assert!(Args::try_parse_from(["kubedeck", "workloads", "replicasets"]).is_err());
    }

    #[test]
    fn logs_container_set_and_invert() {
        let args = Args::try_parse_from([
            "kubedeck", "logs", "web-0", "-c", "app", "-c", "sidecar", "--grep", "healthz",
            "--invert",
        ])
        .unwrap();
        match args.command {
            Command::Logs {
                containers, invert, ..
            } => {
                assert_eq!(containers, vec!["app".to_string(), "sidecar".to_string()]);
                assert!(invert);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Args::try_parse_from(["kubedeck", "logs", "web-0", "--invert"]).is_err());
    }

    #[test]
    fn logs_flags() {
        let args = Args::try_parse_from([
            "kubedeck", "logs", "web-0", "-c", "app", "--previous", "--grep", "timeout",
        ])
        .unwrap();
        match args.command {
            Command::Logs {
                containers,
                previous,
                grep,
                errors,
                invert,
                ..
            } => {
                assert_eq!(containers, vec!["app".to_string()]);
                assert!(!invert);
                assert!(previous);
                assert!(!errors);
                assert_eq!(grep.as_deref(), Some("timeout"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
