//! Subcommand handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use finboard_core::fetch::{FetchRequest, ResponseCache};
use finboard_core::fields::{discover_fields, resolve};
use finboard_core::modules::{format_value, load_dashboard, resolve_config_path, save_dashboard};
use finboard_core::{FetchConfig, FetchPipeline, WidgetRefresher, WidgetSnapshot};
use finboard_types::{DisplayMode, FetchOutcome, FieldDescriptor, WidgetConfig, WidgetField};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::AuthArgs;

/// Arguments of `finboard add`, collected before validation.
pub struct NewWidget {
    pub name: String,
    pub url: String,
    pub fields: Vec<String>,
    pub auth: AuthArgs,
    pub interval: u64,
    pub ttl: u64,
    pub mode: DisplayMode,
}

fn pipeline() -> Result<FetchPipeline> {
    FetchPipeline::new(FetchConfig::from_env()).context("building fetch pipeline")
}

/// In-memory cache unless `--cache-dir` was given, with or without a directory.
fn watch_cache(cache_dir: Option<Option<PathBuf>>) -> Result<ResponseCache> {
    match cache_dir {
        None => Ok(ResponseCache::in_memory()),
        Some(dir) => ResponseCache::on_disk(dir).context("opening response cache"),
    }
}

fn one_shot_request(url: &str, auth: &AuthArgs) -> FetchRequest {
    let request = FetchRequest::new(url).bypass_cache(true);
    match (&auth.key, &auth.header) {
        (Some(key), Some(header)) => request.with_auth(key.clone(), header.clone()),
        (Some(_), None) | (None, Some(_)) => {
            warn!("--key and --header must be given together, sending without auth");
            request
        },
        (None, None) => request,
    }
}

async fn fetch_once(url: &str, auth: &AuthArgs) -> Result<Value> {
    let outcome = pipeline()?.fetch(&one_shot_request(url, auth)).await;
    if let Some(message) = outcome.error {
        bail!(message);
    }
    Ok(outcome.data)
}

pub async fn probe(url: &str, auth: &AuthArgs, arrays_only: bool, json: bool) -> Result<()> {
    let payload = fetch_once(url, auth).await?;
    let descriptors = discover_fields(&payload, arrays_only);

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    let mut lines = Vec::new();
    for descriptor in &descriptors {
        tree_lines(descriptor, 0, &mut lines);
    }
    if lines.is_empty() {
        println!("No fields discovered");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn tree_lines(descriptor: &FieldDescriptor, depth: usize, out: &mut Vec<String>) {
    let path = if descriptor.path.is_empty() { "(root)" } else { descriptor.path.as_str() };
    out.push(format!(
        "{:indent$}{path}  [{}]  {}",
        "",
        descriptor.structural_type,
        descriptor.sample_value,
        indent = depth * 2
    ));
    for child in descriptor.children.iter().flatten() {
        tree_lines(child, depth + 1, out);
    }
}

pub async fn get(url: &str, paths: &[String], auth: &AuthArgs) -> Result<()> {
    let payload = fetch_once(url, auth).await?;
    for path in paths {
        let value = format_value(resolve(&payload, path), &WidgetField::new(path.as_str()));
        println!("{path}: {value}");
    }
    Ok(())
}

pub async fn watch(config: Option<&Path>, cache_dir: Option<Option<PathBuf>>) -> Result<()> {
    let path = resolve_config_path(config)?;
    let dashboard = load_dashboard(&path)
        .with_context(|| format!("loading dashboard {}", path.display()))?;
    if dashboard.widgets.is_empty() {
        bail!("dashboard {} has no widgets, add one with `finboard add`", path.display());
    }

    let names: std::collections::HashMap<String, String> =
        dashboard.widgets.iter().map(|w| (w.id.clone(), w.name.clone())).collect();

    let pipeline = FetchPipeline::with_cache(FetchConfig::from_env(), watch_cache(cache_dir)?)
        .context("building fetch pipeline")?;
    let refresher = WidgetRefresher::new(std::sync::Arc::new(pipeline));
    let mut rx = refresher.subscribe();
    info!(widgets = dashboard.widgets.len(), config = %path.display(), "watching dashboard");
    refresher.start(dashboard.widgets);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(snapshot) => {
                    let name = names.get(&snapshot.widget_id).map_or("?", String::as_str);
                    for line in snapshot_lines(name, &snapshot) {
                        println!("{line}");
                    }
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "output fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping refresh tasks");
                break;
            },
        }
    }

    refresher.shutdown();
    Ok(())
}

fn outcome_tag(outcome: &FetchOutcome) -> String {
    match outcome.cache_age_secs {
        Some(age) if outcome.from_cache => format!("cached {age}s"),
        _ => "live".to_string(),
    }
}

fn snapshot_lines(name: &str, snapshot: &WidgetSnapshot) -> Vec<String> {
    let outcome = &snapshot.outcome;
    if let Some(error) = &outcome.error {
        return vec![format!("[{name}] error: {error}")];
    }

    let mut lines = vec![format!("[{name}] ({})", outcome_tag(outcome))];
    lines.extend(snapshot.values.iter().map(|(label, value)| format!("  {label}: {value}")));
    lines.extend(snapshot.rows.iter().map(|row| format!("  | {}", row.join(" | "))));
    lines
}

/// `PATH` or `PATH=Display Name`.
fn parse_field_spec(spec: &str) -> Result<WidgetField> {
    let (path, display) = match spec.split_once('=') {
        Some((path, display)) => (path.trim(), Some(display.trim())),
        None => (spec.trim(), None),
    };
    if path.is_empty() {
        bail!("field '{spec}' has an empty path");
    }
    let field = WidgetField::new(path);
    Ok(match display {
        Some(display) if !display.is_empty() => field.with_display_name(display),
        _ => field,
    })
}

pub fn add(config: Option<&Path>, new: NewWidget) -> Result<()> {
    let path = resolve_config_path(config)?;
    let mut dashboard = load_dashboard(&path)
        .with_context(|| format!("loading dashboard {}", path.display()))?;

    let mut widget = WidgetConfig::new(new.name, new.url);
    widget.api_key = new.auth.key;
    widget.api_key_header = new.auth.header;
    widget.refresh_interval = new.interval;
    widget.cache_ttl = new.ttl;
    widget.display_mode = new.mode;
    widget.selected_fields =
        new.fields.iter().map(|spec| parse_field_spec(spec)).collect::<Result<_>>()?;
    widget.check()?;

    let id = widget.id.clone();
    dashboard.upsert(widget);
    save_dashboard(&path, &dashboard)
        .with_context(|| format!("saving dashboard {}", path.display()))?;
    println!("Added widget {id} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finboard_types::StructuralType;
    use serde_json::json;

    #[test]
    fn test_watch_cache_on_disk_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");

        let cache = watch_cache(Some(Some(cache_dir.clone()))).unwrap();
        assert!(cache.put("sig_quote", json!({"c": 1}), 60, cache.begin_request()));
        assert!(cache_dir.join("sig_quote.json").exists());

        let memory = watch_cache(None).unwrap();
        assert!(memory.get("sig_quote", false).is_none());
    }

    #[test]
    fn test_parse_field_spec() {
        let field = parse_field_spec("quote.c = Price").unwrap();
        assert_eq!(field.path, "quote.c");
        assert_eq!(field.display_name.as_deref(), Some("Price"));

        let plain = parse_field_spec("dp").unwrap();
        assert_eq!(plain.display_name, None);
        assert_eq!(parse_field_spec("dp=").unwrap().display_name, None);

        assert!(parse_field_spec("=Price").is_err());
    }

    #[test]
    fn test_tree_lines_marks_root_and_indents() {
        let payload = json!([{"sym": "AAPL"}]);
        let descriptors = discover_fields(&payload, false);
        let mut lines = Vec::new();
        for d in &descriptors {
            tree_lines(d, 0, &mut lines);
        }
        assert!(lines[0].starts_with("(root)  [array]"));
        assert!(lines.iter().any(|l| l.starts_with("  [0].sym") || l.starts_with("[0].sym")));
        assert_eq!(descriptors[0].structural_type, StructuralType::Array);
    }

    #[test]
    fn test_snapshot_lines_error() {
        let widget = WidgetConfig::new("Quote", "https://example.com/q");
        let outcome = FetchOutcome::failure(
            finboard_types::FetchError::Unauthorized { status: 401 },
            0,
        );
        let snapshot = WidgetSnapshot::build(&widget, outcome);
        let lines = snapshot_lines("Quote", &snapshot);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[Quote] error: Invalid API key"));
    }

    #[test]
    fn test_add_writes_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.json");
        let new = NewWidget {
            name: "Quote".into(),
            url: "https://finnhub.io/api/v1/quote?symbol=AAPL".into(),
            fields: vec!["c=Price".into()],
            auth: AuthArgs::default(),
            interval: 0,
            ttl: 10,
            mode: DisplayMode::Card,
        };
        add(Some(&path), new).unwrap();

        let dashboard = load_dashboard(&path).unwrap();
        assert_eq!(dashboard.widgets.len(), 1);
        assert_eq!(dashboard.widgets[0].selected_fields[0].label(), "Price");
        assert_eq!(dashboard.widgets[0].cache_ttl, 10);
    }

    #[test]
    fn test_add_rejects_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.json");
        let new = NewWidget {
            name: "Bad".into(),
            url: "ftp://example.com".into(),
            fields: vec!["c".into()],
            auth: AuthArgs::default(),
            interval: 0,
            ttl: 10,
            mode: DisplayMode::Card,
        };
        assert!(add(Some(&path), new).is_err());
        assert!(!path.exists());
    }
}
