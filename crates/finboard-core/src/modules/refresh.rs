//! Per-widget auto-refresh.
//!
//! Each widget with `refreshInterval > 0` gets its own tokio task; ticks for
//! different widgets are unordered. A tick that lands while the widget's
//! origin is rate limited is skipped without a fetch. Manual refreshes
//! bypass the cache and may overlap a timer refresh; the cache's sequence
//! ordering keeps the newer response.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use finboard_types::{ConfigError, DisplayMode, FetchOutcome, WidgetConfig};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::format::format_value;
use crate::error::AppResult;
use crate::fetch::FetchPipeline;
use crate::fields::{locate_rows, resolve, resolve_in_row};
use crate::utils::time::now_millis;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Table rows rendered per snapshot.
pub const MAX_SNAPSHOT_ROWS: usize = 500;

/// Result of one widget refresh, as published to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub widget_id: String,
    pub outcome: FetchOutcome,
    /// `(label, formatted value)` per selected field, resolved from the payload root
    pub values: Vec<(String, String)>,
    /// Formatted cells for table and chart widgets, one inner vec per row
    pub rows: Vec<Vec<String>>,
    pub refreshed_at: i64,
}

impl WidgetSnapshot {
    pub fn build(widget: &WidgetConfig, outcome: FetchOutcome) -> Self {
        let (values, rows) = if outcome.is_ok() {
            (card_values(widget, &outcome.data), row_values(widget, &outcome.data))
        } else {
            (Vec::new(), Vec::new())
        };
        Self { widget_id: widget.id.clone(), outcome, values, rows, refreshed_at: now_millis() }
    }
}

fn card_values(widget: &WidgetConfig, data: &serde_json::Value) -> Vec<(String, String)> {
    widget
        .selected_fields
        .iter()
        .map(|field| (field.label().to_string(), format_value(resolve(data, &field.path), field)))
        .collect()
}

fn row_values(widget: &WidgetConfig, data: &serde_json::Value) -> Vec<Vec<String>> {
    if widget.display_mode == DisplayMode::Card {
        return Vec::new();
    }
    let first_path = widget.selected_fields.first().map(|f| f.path.as_str());
    let Some(row_set) = locate_rows(data, first_path) else {
        return Vec::new();
    };
    row_set
        .rows
        .iter()
        .take(MAX_SNAPSHOT_ROWS)
        .map(|row| {
            widget
                .selected_fields
                .iter()
                .map(|field| format_value(resolve_in_row(row, &field.path), field))
                .collect()
        })
        .collect()
}

pub struct WidgetRefresher {
    pipeline: Arc<FetchPipeline>,
    widgets: DashMap<String, WidgetConfig>,
    tasks: DashMap<String, JoinHandle<()>>,
    tx: broadcast::Sender<WidgetSnapshot>,
}

impl WidgetRefresher {
    pub fn new(pipeline: Arc<FetchPipeline>) -> Self {
        let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self { pipeline, widgets: DashMap::new(), tasks: DashMap::new(), tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetSnapshot> {
        self.tx.subscribe()
    }

    pub fn pipeline(&self) -> &Arc<FetchPipeline> {
        &self.pipeline
    }

    /// Register widgets and start their tasks. Must run inside a tokio runtime.
    pub fn start(&self, widgets: impl IntoIterator<Item = WidgetConfig>) {
        for widget in widgets {
            self.add_widget(widget);
        }
    }

    /// Register or replace a widget, restarting its task.
    ///
    /// Widgets without auto-refresh are loaded once.
    pub fn add_widget(&self, widget: WidgetConfig) {
        let id = widget.id.clone();
        if let Some((_, previous)) = self.tasks.remove(&id) {
            previous.abort();
        }

        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.tx.clone();
        let handle = if widget.auto_refresh_enabled() {
            info!(widget = %id, interval_secs = widget.refresh_interval, "starting auto-refresh");
            tokio::spawn(run_timer(pipeline, widget.clone(), tx))
        } else {
            let widget = widget.clone();
            tokio::spawn(async move {
                let outcome = pipeline.fetch_widget(&widget, false).await;
                publish(&tx, WidgetSnapshot::build(&widget, outcome));
            })
        };

        self.widgets.insert(id.clone(), widget);
        self.tasks.insert(id, handle);
    }

    pub fn remove_widget(&self, widget_id: &str) -> bool {
        if let Some((_, handle)) = self.tasks.remove(widget_id) {
            handle.abort();
        }
        self.widgets.remove(widget_id).is_some()
    }

    /// Forced refresh: bypasses the cache and publishes the snapshot.
    pub async fn refresh_now(&self, widget_id: &str) -> AppResult<WidgetSnapshot> {
        let widget = self
            .widgets
            .get(widget_id)
            .map(|w| w.clone())
            .ok_or_else(|| ConfigError::WidgetNotFound { id: widget_id.to_string() })?;

        debug!(widget = %widget_id, "manual refresh");
        let outcome = self.pipeline.fetch_widget(&widget, true).await;
        let snapshot = WidgetSnapshot::build(&widget, outcome);
        publish(&self.tx, snapshot.clone());
        Ok(snapshot)
    }

    /// Forced refresh of every registered widget, concurrently.
    pub async fn refresh_all(&self) -> Vec<WidgetSnapshot> {
        let widgets: Vec<WidgetConfig> = self.widgets.iter().map(|w| w.value().clone()).collect();
        let outcomes = join_all(widgets.iter().map(|w| self.pipeline.fetch_widget(w, true))).await;

        widgets
            .iter()
            .zip(outcomes)
            .map(|(widget, outcome)| {
                let snapshot = WidgetSnapshot::build(widget, outcome);
                publish(&self.tx, snapshot.clone());
                snapshot
            })
            .collect()
    }

    /// Tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.value().is_finished()).count()
    }

    pub fn shutdown(&self) {
        let count = self.tasks.len();
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
        self.tasks.clear();
        if count > 0 {
            info!("stopped {} refresh task(s)", count);
        }
    }
}

impl Drop for WidgetRefresher {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

async fn run_timer(pipeline: Arc<FetchPipeline>, widget: WidgetConfig, tx: broadcast::Sender<WidgetSnapshot>) {
    let origin = match FetchPipeline::origin_of(&widget.api_url) {
        Ok(origin) => Some(origin),
        Err(e) => {
            warn!(widget = %widget.id, "widget URL is unusable: {}", e);
            None
        }
    };

    let mut ticker = interval(Duration::from_secs(widget.refresh_interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        if let Some(origin) = origin.as_deref() {
            let block = pipeline.registry().check_blocked(origin);
            if block.blocked {
                debug!(
                    widget = %widget.id,
                    origin = %origin,
                    wait_secs = block.remaining_secs(now_millis()),
                    "origin rate limited, skipping tick"
                );
                continue;
            }
        }

        let outcome = pipeline.fetch_widget(&widget, false).await;
        publish(&tx, WidgetSnapshot::build(&widget, outcome));
    }
}

fn publish(tx: &broadcast::Sender<WidgetSnapshot>, snapshot: WidgetSnapshot) {
    // No subscribers is fine; the snapshot is simply dropped.
    if tx.send(snapshot).is_err() {
        debug!("no snapshot subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finboard_types::{FetchError, FieldFormat, WidgetField};
    use serde_json::json;

    fn widget(mode: DisplayMode, fields: Vec<WidgetField>) -> WidgetConfig {
        let mut w = WidgetConfig::new("w", "https://api.example.com/q");
        w.display_mode = mode;
        w.selected_fields = fields;
        w
    }

    #[test]
    fn test_card_snapshot_values() {
        let w = widget(
            DisplayMode::Card,
            vec![
                WidgetField::new("c").with_display_name("Price").with_format(FieldFormat::Currency),
                WidgetField::new("missing"),
            ],
        );
        let snapshot = WidgetSnapshot::build(&w, FetchOutcome::fresh(json!({"c": 101.5}), 0));
        assert_eq!(
            snapshot.values,
            vec![("Price".to_string(), "$101.50".to_string()), ("missing".to_string(), "N/A".to_string())]
        );
        assert!(snapshot.rows.is_empty());
    }

    #[test]
    fn test_table_snapshot_rows() {
        let w = widget(
            DisplayMode::Table,
            vec![WidgetField::new("items[0].ticker"), WidgetField::new("items[0].price")],
        );
        let data = json!({"items": [{"ticker": "AAA", "price": 10}, {"ticker": "BBB", "price": 20}]});
        let snapshot = WidgetSnapshot::build(&w, FetchOutcome::fresh(data, 0));
        assert_eq!(snapshot.rows, vec![vec!["AAA".to_string(), "10".to_string()], vec!["BBB".to_string(), "20".to_string()]]);
    }

    #[test]
    fn test_failed_snapshot_has_no_values() {
        let w = widget(DisplayMode::Card, vec![WidgetField::new("c")]);
        let snapshot = WidgetSnapshot::build(&w, FetchOutcome::failure(FetchError::Unauthorized { status: 401 }, 0));
        assert!(snapshot.values.is_empty());
        assert!(snapshot.outcome.error.is_some());
    }
}
