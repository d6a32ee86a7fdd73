//! Force deletion of a namespace
//!
//! Every namespaced, deletable resource type the server advertises is listed
//! in the namespace and each item deleted. The namespace's finalizers are then
//! cleared through the `finalize` subresource and the namespace itself deleted.
//! Only the initial namespace lookup can fail the sweep; everything after it is
//! recorded in the report.

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::discovery::ApiResource;
use tokio_util::sync::CancellationToken;

use kubedeck_types::ForceDeleteReport;

use crate::client::{KubeRepository, get_named, guard, list_all};
use crate::error::{Error, Result};

/// Split a discovery group version into (group, version). Core is `v1`.
fn split_group_version(group_version: &str) -> (&str, &str) {
    group_version
        .split_once('/')
        .unwrap_or(("", group_version))
}

/// Resource types the sweep visits, in discovery order. Cluster-scoped
/// resources, subresources and types without a `delete` verb are skipped.
pub fn sweep_targets(lists: &[APIResourceList]) -> Vec<ApiResource> {
    lists
        .iter()
        .flat_map(|list| {
            let (group, version) = split_group_version(&list.group_version);
            list.resources
                .iter()
                .filter(|r| r.namespaced)
                .filter(|r| !r.name.contains('/'))
                .filter(|r| r.verbs.iter().any(|v| v == "delete"))
                .map(move |r| ApiResource {
                    group: group.to_string(),
                    version: version.to_string(),
                    api_version: list.group_version.clone(),
                    kind: r.kind.clone(),
                    plural: r.name.clone(),
                })
        })
        .collect()
}

/// Record a non-fatal failure, passing cancellation through
fn record(report: &mut ForceDeleteReport, what: String, err: Error) -> Result<()> {
    if err.is_cancelled() {
        return Err(err);
    }
    tracing::warn!(
        namespace = %report.namespace,
        what = %what,
        error = %err,
        "force delete step failed",
    );
    report.failures.push(format!("{what}: {err}"));
    Ok(())
}

impl KubeRepository {
    /// Resource lists for the core group and each group's preferred version
    async fn discover_resource_lists(
        &self,
        cancel: &CancellationToken,
        report: &mut ForceDeleteReport,
    ) -> Result<Vec<APIResourceList>> {
        let client = self.client();
        let mut lists = Vec::new();

        match guard(cancel, async { Ok(client.list_core_api_versions().await?) }).await {
            Ok(core) => {
                for version in &core.versions {
                    let resources = guard(cancel, async {
                        Ok(client.list_core_api_resources(version).await?)
                    });
                    match resources.await {
                        Ok(list) => lists.push(list),
                        Err(e) => record(report, format!("discover core/{version}"), e)?,
                    }
                }
            }
            Err(e) => record(report, "discover core versions".to_string(), e)?,
        }

        match guard(cancel, async { Ok(client.list_api_groups().await?) }).await {
            Ok(groups) => {
                for group in &groups.groups {
                    let Some(gv) = group
                        .preferred_version
                        .as_ref()
                        .or_else(|| group.versions.first())
                    else {
                        continue;
                    };
                    let group_version = gv.group_version.as_str();
                    match guard(cancel, async {
                        Ok(client.list_api_group_resources(group_version).await?)
                    })
                    .await
                    {
                        Ok(list) => lists.push(list),
                        Err(e) => record(report, format!("discover {group_version}"), e)?,
                    }
                }
            }
            Err(e) => record(report, "discover API groups".to_string(), e)?,
        }
        Ok(lists)
    }

    async fn delete_all_of(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource: &ApiResource,
        report: &mut ForceDeleteReport,
    ) -> Result<()> {
        let api: Api<DynamicObject> = Api::namespaced_with(self.client(), namespace, resource);
        let items = match list_all(cancel, &api, &ListParams::default()).await {
            Ok(items) => items,
            Err(e) => return record(report, format!("list {}", resource.plural), e),
        };

        for item in items {
            let Some(name) = item.metadata.name else {
                continue;
            };
            let deleted = guard(cancel, async {
                Ok(api.delete(&name, &DeleteParams::default()).await?)
            })
            .await;
            match deleted {
                Ok(_) => report.deleted += 1,
                Err(e) => record(report, format!("delete {}/{name}", resource.kind), e)?,
            }
        }
        Ok(())
    }

    /// Clear `spec.finalizers` through the `finalize` subresource
    async fn remove_finalizers(
        &self,
        cancel: &CancellationToken,
        api: &Api<Namespace>,
        mut namespace: Namespace,
        report: &mut ForceDeleteReport,
    ) -> Result<()> {
        let has_finalizers = namespace
            .spec
            .as_ref()
            .and_then(|s| s.finalizers.as_ref())
            .is_some_and(|f| !f.is_empty());
        if !has_finalizers {
            return Ok(());
        }

        if let Some(spec) = namespace.spec.as_mut() {
            spec.finalizers = Some(Vec::new());
        }
        let body = match serde_json::to_vec(&namespace) {
            Ok(body) => body,
            Err(e) => {
                report.failures.push(format!("encode namespace: {e}"));
                return Ok(());
            }
        };
        let name = report.namespace.clone();
        let result = guard(cancel, async {
            Ok(api
                .replace_subresource("finalize", &name, &PostParams::default(), body)
                .await?)
        })
        .await;
        match result {
            Ok(_) => {
                report.finalizers_removed = true;
                Ok(())
            }
            Err(e) => record(report, "remove finalizers".to_string(), e),
        }
    }

    pub(crate) async fn sweep_namespace(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<ForceDeleteReport> {
        let api: Api<Namespace> = self.cluster();
        get_named(cancel, &api, "Namespace", namespace).await?;

        tracing::info!(namespace = %namespace, "force deleting namespace");
        let mut report = ForceDeleteReport::new(namespace);

        let lists = self.discover_resource_lists(cancel, &mut report).await?;
        for resource in sweep_targets(&lists) {
            self.delete_all_of(cancel, namespace, &resource, &mut report)
                .await?;
        }

        match get_named(cancel, &api, "Namespace", namespace).await {
            Ok(current) => {
                self.remove_finalizers(cancel, &api, current, &mut report)
                    .await?;
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    namespace = %namespace,
                    deleted = report.deleted,
                    "namespace already gone",
                );
                return Ok(report);
            }
            Err(e) => record(&mut report, "refetch namespace".to_string(), e)?,
        }

        let deleted = guard(cancel, async {
            api.delete(namespace, &DeleteParams::default())
                .await
                .map_err(|e| Error::from_kube(e, "Namespace", namespace))
        })
        .await;
        match deleted {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => record(&mut report, "delete namespace".to_string(), e)?,
        }

        tracing::info!(
            namespace = %namespace,
            deleted = report.deleted,
            failures = report.failures.len(),
            "force delete finished"
        );
        Ok(report)
    }
}
