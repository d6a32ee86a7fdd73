//! Kubeconfig contexts

use kube::config::{KubeConfigOptions, Kubeconfig};

use kubedeck_types::ContextInfo;

use crate::client::KubeRepository;
use crate::error::{Error, Result};
use crate::repository::ContextRepository;

/// Contexts from the user's kubeconfig, if one could be read
#[derive(Clone, Debug, Default)]
pub struct KubeContexts {
    kubeconfig: Option<Kubeconfig>,
    /// Context the client was built for
    active_context: Option<String>,
}

impl KubeContexts {
    /// Read the kubeconfig from the usual locations. A missing kubeconfig is
    /// not an error; in-cluster configuration is used instead.
    pub fn load() -> Self {
        match Kubeconfig::read() {
            Ok(kubeconfig) => Self::from_kubeconfig(kubeconfig),
            Err(e) => {
                tracing::debug!(error = %e, "no kubeconfig, assuming in-cluster");
                Self::default()
            }
        }
    }

    pub fn from_kubeconfig(kubeconfig: Kubeconfig) -> Self {
        let active_context = kubeconfig.current_context.clone();
        Self {
            kubeconfig: Some(kubeconfig),
            active_context,
        }
    }

    /// Get all available contexts from kubeconfig
    pub fn contexts(&self) -> Vec<ContextInfo> {
        let Some(kubeconfig) = &self.kubeconfig else {
            return Vec::new();
        };
        kubeconfig
            .contexts
            .iter()
            .map(|ctx| {
                let context = ctx.context.as_ref();
                ContextInfo::new(
                    ctx.name.clone(),
                    context.map(|c| c.cluster.clone()).unwrap_or_default(),
                    context.and_then(|c| c.user.clone()).unwrap_or_default(),
                    context.and_then(|c| c.namespace.clone()),
                    Some(&ctx.name) == self.active_context.as_ref(),
                )
            })
            .collect()
    }

    pub fn current_context(&self) -> Option<&str> {
        self.active_context.as_deref()
    }

    /// Default namespace of the active context
    pub fn default_namespace(&self) -> Option<String> {
        let active = self.active_context.as_ref()?;
        self.kubeconfig
            .as_ref()?
            .contexts
            .iter()
            .find(|c| &c.name == active)
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
    }

    /// Build a client for `context` (or the current one) and remember it as active
    pub async fn client_for(&mut self, context: Option<&str>) -> Result<kube::Client> {
        let config = match &self.kubeconfig {
            Some(kubeconfig) => {
                if let Some(name) = context {
                    if !kubeconfig.contexts.iter().any(|c| c.name == name) {
                        return Err(Error::Config(format!(
                            "context '{name}' not found in kubeconfig"
                        )));
                    }
                    self.active_context = Some(name.to_string());
                }
                kube::Config::from_custom_kubeconfig(
                    kubeconfig.clone(),
                    &KubeConfigOptions {
                        context: self.active_context.clone(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| Error::Config(e.to_string()))?
            }
            None => kube::Config::incluster().map_err(|e| Error::Config(e.to_string()))?,
        };

        kube::Client::try_from(config).map_err(|e| Error::Config(e.to_string()))
    }
}

impl ContextRepository for KubeRepository {
    fn current_context(&self) -> Option<String> {
        self.contexts().current_context().map(str::to_string)
    }

    fn list_contexts(&self) -> (Vec<ContextInfo>, Option<String>) {
        (self.contexts().contexts(), self.current_context())
    }
}
