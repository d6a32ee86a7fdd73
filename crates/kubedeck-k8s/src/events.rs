//! Events

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use kube::api::{Api, ListParams};
use std::cmp::Reverse;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use kubedeck_types::EventInfo;

use crate::client::{KubeRepository, list_all};
use crate::error::Result;
use crate::format::age_since;
use crate::repository::EventRepository;

/// Event row. Legacy first/last timestamps fall back to `eventTime`, and
/// `last_seen` never precedes `first_seen`.
pub fn event_to_info(event: &Event, now: DateTime<Utc>) -> EventInfo {
    let event_time = event.event_time.as_ref().map(|t| t.0);
    let first_seen = event
        .first_timestamp
        .as_ref()
        .map(|t| t.0)
        .or(event_time)
        .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0));
    let last_seen = event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or(event_time)
        .or(first_seen);
    let last_seen = match (first_seen, last_seen) {
        (Some(first), Some(last)) if last < first => Some(first),
        (_, last) => last,
    };

    let source = event
        .source
        .as_ref()
        .and_then(|s| s.component.clone())
        .filter(|c| !c.is_empty())
        .or_else(|| event.reporting_component.clone())
        .unwrap_or_default();

    let count = event
        .count
        .or_else(|| event.series.as_ref().and_then(|s| s.count))
        .filter(|c| *c > 0)
        .unwrap_or(1);

    let involved = &event.involved_object;
    EventInfo {
        event_type: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.clone().unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        source,
        age: age_since(last_seen, now),
        count,
        first_seen,
        last_seen,
        object: format!(
            "{}/{}",
            involved.kind.as_deref().unwrap_or_default(),
            involved.name.as_deref().unwrap_or_default()
        ),
    }
}

/// Most recently seen first; events without timestamps go last
pub fn sort_events(events: &mut [EventInfo]) {
    events.sort_by_key(|e| Reverse(e.last_seen));
}

/// Warnings last seen at or after `cutoff`
pub fn recent_warnings(events: Vec<EventInfo>, cutoff: DateTime<Utc>) -> Vec<EventInfo> {
    events
        .into_iter()
        .filter(|e| e.is_warning() && e.last_seen.is_some_and(|t| t >= cutoff))
        .collect()
}

impl KubeRepository {
    async fn list_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        lp: &ListParams,
    ) -> Result<Vec<EventInfo>> {
        let api: Api<Event> = self.namespaced(namespace);
        let items = list_all(cancel, &api, lp).await?;
        let now = Utc::now();
        let mut events: Vec<EventInfo> = items.iter().map(|e| event_to_info(e, now)).collect();
        sort_events(&mut events);
        Ok(events)
    }

    /// Events whose involved object is `kind/name`
    pub(crate) async fn object_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> Result<Vec<EventInfo>> {
        let lp = ListParams::default().fields(&format!(
            "involvedObject.kind={kind},involvedObject.name={name}"
        ));
        self.list_events(cancel, namespace, &lp).await
    }
}

#[async_trait]
impl EventRepository for KubeRepository {
    async fn get_namespace_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventInfo>> {
        let mut events = self
            .list_events(cancel, namespace, &ListParams::default())
            .await?;
        if limit > 0 {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn get_recent_warnings(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        since: Duration,
    ) -> Result<Vec<EventInfo>> {
        let lp = ListParams::default().fields("type=Warning");
        let events = self.list_events(cancel, namespace, &lp).await?;
        let window = chrono::Duration::from_std(since).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(recent_warnings(events, cutoff))
    }
}
