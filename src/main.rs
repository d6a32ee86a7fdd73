use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use kubedeck_core::UseCases;
use kubedeck_k8s::KubeRepository;
use kubedeck_logs::LogFilter;
use kubedeck_types::{EventInfo, LogOptions, PodInfo, WorkloadInfo};

mod cli;
mod config;
mod output;
mod views;

use cli::{Args, Command};
use config::{Config, OutputFormat};
use output::{emit_table, emit_text};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Ctrl-C cancels whatever request is in flight
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match run(args, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Settings after merging flags, config file and kubeconfig
struct Session {
    uc: UseCases,
    namespace: String,
    output: OutputFormat,
    config: Config,
}

async fn connect(args: &Args, cancel: &CancellationToken) -> Result<Session> {
    let config = Config::load(args.config.as_deref())?;
    let context = args.context.clone().or_else(|| config.context.clone());

    let repo = tokio::select! {
        biased;
        _ = cancel.cancelled() => bail!("interrupted while connecting"),
        repo = KubeRepository::connect(context.as_deref()) => {
            repo.context("Failed to connect to cluster")?
        }
    };
    let uc = UseCases::new(Arc::new(repo));

    let namespace = args
        .namespace
        .clone()
        .or_else(|| config.namespace.clone())
        .or_else(|| {
            let (contexts, _) = uc.cluster.list_contexts();
            contexts
                .into_iter()
                .find(|c| c.is_current)
                .and_then(|c| c.namespace)
        })
        .unwrap_or_else(|| "default".to_string());

    Ok(Session {
        uc,
        namespace,
        output: args.output.unwrap_or(config.output),
        config,
    })
}

#[derive(Serialize)]
struct WorkloadView {
    workload: WorkloadInfo,
    pods: Vec<PodInfo>,
    events: Vec<EventInfo>,
}

async fn run(args: Args, cancel: &CancellationToken) -> Result<()> {
    let Session {
        uc,
        namespace: ns,
        output,
        config,
    } = connect(&args, cancel).await?;

    match args.command {
        Command::Contexts => {
            let (contexts, _) = uc.cluster.list_contexts();
            emit_table(output, &contexts, |c| views::contexts(c))?;
        }

        Command::Namespaces => {
            let namespaces = uc.namespaces.list_namespaces(cancel).await?;
            emit_table(output, &namespaces, |n| views::namespaces(n))?;
        }

        Command::Resources => {
            let resources = uc.namespaces.get_namespace_resources(cancel, &ns).await?;
            emit_text(output, &resources, views::namespace_resources)?;
        }

        Command::Workloads { resource_type } => {
            let workloads = uc.workloads.list_workloads(cancel, &ns, resource_type).await?;
            emit_table(output, &workloads, |w| views::workloads(w))?;
        }

        Command::Workload {
            resource_type,
            name,
        } => {
            let workload = uc
                .workloads
                .get_workload(cancel, &ns, resource_type, &name)
                .await?;
            let pods = uc.workloads.get_workload_pods(cancel, &workload).await?;
            let events = uc.workloads.get_workload_events(cancel, &workload).await?;
            let view = WorkloadView {
                workload,
                pods,
                events,
            };
            emit_text(output, &view, |v| {
                let mut text = views::workloads(std::slice::from_ref(&v.workload)).render();
                text.push_str(&format!("\nPods:\n{}", views::pods(&v.pods).render()));
                text.push_str(&format!("\nEvents:\n{}", views::events(&v.events).render()));
                text
            })?;
        }

        Command::Pods { node } => {
            let pods = match node {
                Some(node) => uc.cluster.list_pods_by_node(cancel, &node).await?,
                None => uc.pods.list_pods(cancel, &ns).await?,
            };
            emit_table(output, &pods, |p| views::pods(p))?;
        }

        Command::Pod { name, tail } => {
            let details = uc
                .pods
                .get_pod_details(cancel, &ns, &name, tail.unwrap_or(config.log_tail))
                .await
                .with_context(|| format!("Failed to load pod {ns}/{name}"))?;
            emit_text(output, &details, views::pod_details)?;
        }

        Command::Logs {
            pod,
            containers,
            tail,
            previous,
            errors,
            grep,
            invert,
        } => {
            let tail = tail.unwrap_or(config.log_tail);
            let lines = if previous {
                let container = match containers.as_slice() {
                    [] => uc
                        .pods
                        .get_pod(cancel, &ns, &pod)
                        .await?
                        .containers
                        .first()
                        .map(|c| c.name.clone())
                        .with_context(|| format!("Pod {pod} has no containers"))?,
                    [container] => container.clone(),
                    _ => bail!("--previous takes a single container"),
                };
                uc.pods
                    .get_previous_logs(cancel, &ns, &pod, &container, tail)
                    .await?
            } else if let [container] = containers.as_slice() {
                let options = LogOptions::for_container(container.clone(), tail);
                uc.pods.get_logs(cancel, &ns, &pod, &options).await?
            } else {
                uc.pods.get_all_container_logs(cancel, &ns, &pod, tail).await?
            };

            let filter = LogFilter::new()
                .pattern(grep.as_deref().unwrap_or_default())
                .context("Invalid --grep pattern")?
                .containers(containers)
                .errors_only(errors)
                .invert(invert);
            let lines = filter.apply(&lines);
            emit_text(output, &lines, |l| views::logs(l))?;
        }

        Command::Events { limit } => {
            let events = uc
                .cluster
                .get_namespace_events(cancel, &ns, limit.unwrap_or(config.event_limit))
                .await?;
            emit_table(output, &events, |e| views::events(e))?;
        }

        Command::Warnings { minutes } => {
            let window = minutes.unwrap_or(config.warning_window_minutes);
            let events = uc
                .cluster
                .get_recent_warnings(cancel, &ns, Duration::from_secs(window * 60))
                .await?;
            emit_table(output, &events, |e| views::events(e))?;
        }

        Command::Nodes => {
            let nodes = uc.cluster.list_nodes(cancel).await?;
            emit_table(output, &nodes, |n| views::nodes(n))?;
        }

        Command::Node { name } => {
            let node = uc.cluster.get_node(cancel, &name).await?;
            emit_text(output, &node, views::node)?;
        }

        Command::Configmaps { name: None } => {
            let items = uc.configs.list_config_maps(cancel, &ns).await?;
            emit_table(output, &items, |i| views::config_maps(i))?;
        }

        Command::Configmaps { name: Some(name) } => {
            let cm = uc.configs.get_config_map(cancel, &ns, &name).await?;
            emit_text(output, &cm, views::config_map)?;
        }

        Command::Secrets { name: None } => {
            let items = uc.configs.list_secrets(cancel, &ns).await?;
            emit_table(output, &items, |i| views::secrets(i))?;
        }

        Command::Secrets { name: Some(name) } => {
            let secret = uc.configs.get_secret(cancel, &ns, &name).await?;
            emit_text(output, &secret, views::secret)?;
        }

        Command::Hpas => {
            let items = uc.workloads.list_hpas(cancel, &ns).await?;
            emit_table(output, &items, |i| views::hpas(i))?;
        }

        Command::Hpa { name } => {
            let hpa = uc.workloads.get_hpa(cancel, &ns, &name).await?;
            emit_text(output, &hpa, views::hpa)?;
        }

        Command::Related { pod } => {
            let related = uc.pods.get_related_resources(cancel, &ns, &pod).await?;
            emit_text(output, &related, views::related)?;
        }

        Command::Metrics { pod } => {
            let metrics = match pod {
                Some(pod) => vec![uc.pods.get_pod_metrics(cancel, &ns, &pod).await?],
                None => uc.pods.get_namespace_metrics(cancel, &ns).await?,
            };
            emit_table(output, &metrics, |m| views::metrics(m))?;
        }

        Command::Scale {
            resource_type,
            name,
            replicas,
        } => {
            uc.workloads
                .scale(cancel, &ns, resource_type, &name, replicas)
                .await?;
            println!("{}/{name} scaled to {replicas}", resource_type.scale_resource_type());
        }

        Command::Restart {
            resource_type,
            name,
        } => {
            uc.workloads
                .restart(cancel, &ns, resource_type, &name)
                .await?;
            println!("{resource_type}/{name} restarted");
        }

        Command::DeletePod { name } => {
            uc.pods.delete_pod(cancel, &ns, &name).await?;
            println!("pod/{name} deleted");
        }

        Command::CopyConfigmap {
            name,
            target_namespace,
        } => {
            uc.configs
                .copy_config_map(cancel, &ns, &name, &target_namespace)
                .await?;
            println!("configmap/{name} copied to {target_namespace}");
        }

        Command::CopySecret {
            name,
            target_namespace,
        } => {
            uc.configs
                .copy_secret(cancel, &ns, &name, &target_namespace)
                .await?;
            println!("secret/{name} copied to {target_namespace}");
        }

        Command::ForceDeleteNamespace { namespace, yes } => {
            if !yes {
                bail!("refusing to force delete namespace {namespace} without --yes");
            }
            let report = uc
                .namespaces
                .force_delete_namespace(cancel, &namespace)
                .await?;
            emit_text(output, &report, views::force_delete_report)?;
        }
    }

    Ok(())
}
