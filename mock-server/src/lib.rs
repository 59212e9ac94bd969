//! Mock sFlow-RT REST server.
//!
//! Serves the read-only endpoints of sFlow-RT from a `Fixture` so the client
//! can be exercised over real HTTP without a collector. Aggregation, agent
//! selection and metric filters are computed here the way the real server
//! does them, in simplified form: filter values match exactly or with `*`
//! wildcards.

pub mod aggregate;
pub mod fixture;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

use aggregate::{aggregate, MetricSpec};
pub use fixture::{AgentRecord, Fixture, METRIC_LAST_SEEN_MS};

pub type Db = Arc<Fixture>;

type Pairs = Query<Vec<(String, String)>>;

pub fn app() -> Router {
    app_with(Fixture::default())
}

pub fn app_with(fixture: Fixture) -> Router {
    let db: Db = Arc::new(fixture);
    Router::new()
        .route("/version", get(version))
        .route("/analyzer/json", get(analyzer))
        .route("/prometheus/analyzer/json", get(prometheus_analyzer))
        .route("/license/json", get(license))
        .route("/agents/json", get(agents))
        .route("/metrics/json", get(metrics))
        .route("/metric/{*rest}", get(metric))
        .route("/table/{agent}/{metric}/json", get(table))
        .route("/dump/{agent}/{metric}/json", get(dump))
        .route("/flowkeys/json", get(flow_keys))
        .route("/flow/json", get(flows))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, fixture: Fixture) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(fixture)).await
}

fn text_error(status: StatusCode, message: String) -> Response {
    tracing::debug!(%status, %message, "rejecting request");
    (status, message).into_response()
}

async fn version(State(db): State<Db>) -> String {
    db.version.clone()
}

async fn analyzer(State(db): State<Db>) -> Json<Value> {
    Json(db.analyzer.clone())
}

async fn prometheus_analyzer(State(db): State<Db>) -> String {
    db.prometheus_analyzer()
}

async fn license(State(db): State<Db>) -> Json<Value> {
    Json(db.license.clone())
}

async fn agents(State(db): State<Db>, Query(pairs): Pairs) -> Json<Map<String, Value>> {
    let selected: Vec<String> = pairs
        .into_iter()
        .filter(|(key, _)| key == "agent")
        .map(|(_, value)| value)
        .collect();
    Json(db.agent_sessions(&selected))
}

async fn metrics(State(db): State<Db>) -> Json<Map<String, Value>> {
    Json(
        db.metric_names()
            .into_iter()
            .map(|name| (name.to_string(), json!(METRIC_LAST_SEEN_MS)))
            .collect(),
    )
}

/// `/metric/{agent}/json` and `/metric/{agent}/{metric}/json`.
async fn metric(State(db): State<Db>, Path(rest): Path<String>, Query(pairs): Pairs) -> Response {
    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        [agent, "json"] => match db.agents.get(*agent) {
            Some(record) => Json(&record.metrics).into_response(),
            None => text_error(StatusCode::NOT_FOUND, format!("unknown agent: {agent}")),
        },
        [agent, metric, "json"] => aggregated_metric(&db, agent, metric, &pairs),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn aggregated_metric(db: &Fixture, agent: &str, metric: &str, pairs: &[(String, String)]) -> Response {
    let specs = match parse_metric_list(metric) {
        Ok(specs) => specs,
        Err(message) => return text_error(StatusCode::BAD_REQUEST, message),
    };
    let selected = select_agents(db, agent, pairs);
    let results: Vec<Value> = specs
        .iter()
        .map(|spec| {
            let samples: Vec<(&str, &Value)> = selected
                .iter()
                .filter_map(|(name, record)| record.metrics.get(spec.name).map(|v| (*name, v)))
                .collect();
            aggregate(spec, &samples)
        })
        .collect();
    Json(results).into_response()
}

async fn table(
    State(db): State<Db>,
    Path((agent, metric)): Path<(String, String)>,
    Query(pairs): Pairs,
) -> Response {
    let specs = match parse_metric_list(&metric) {
        Ok(specs) => specs,
        Err(message) => return text_error(StatusCode::BAD_REQUEST, message),
    };
    let rows: Vec<Value> = select_agents(&db, &agent, &pairs)
        .into_iter()
        .filter_map(|(name, record)| {
            specs
                .iter()
                .map(|spec| {
                    record.metrics.get(spec.name).map(|value| {
                        json!({
                            "agent": name,
                            "metricName": spec.name,
                            "metricValue": value,
                        })
                    })
                })
                .collect::<Option<Vec<Value>>>()
                .map(Value::Array)
        })
        .collect();
    Json(rows).into_response()
}

async fn dump(
    State(db): State<Db>,
    Path((agent, metric)): Path<(String, String)>,
    Query(pairs): Pairs,
) -> Json<Vec<Value>> {
    let wanted: Vec<&str> = metric.split([';', ',']).collect();
    let all = wanted.contains(&"ALL");
    let mut out = Vec::new();
    for (name, record) in select_agents(&db, &agent, &pairs) {
        for (metric_name, value) in &record.metrics {
            if all || wanted.contains(&metric_name.as_str()) {
                out.push(json!({
                    "agent": name,
                    "metricName": metric_name,
                    "metricValue": value,
                }));
            }
        }
    }
    Json(out)
}

async fn flow_keys(State(db): State<Db>) -> Json<Value> {
    Json(json!(db.flow_keys))
}

async fn flows(State(db): State<Db>) -> Json<Value> {
    Json(db.flows.clone())
}

fn parse_metric_list(metric: &str) -> Result<Vec<MetricSpec<'_>>, String> {
    metric.split(',').map(MetricSpec::parse).collect()
}

/// Agents named by `agent` (`ALL` or a comma separated list) whose metrics
/// satisfy every filter key. Repeated keys are alternatives.
fn select_agents<'a>(
    db: &'a Fixture,
    agent: &str,
    pairs: &[(String, String)],
) -> Vec<(&'a str, &'a AgentRecord)> {
    let names: Vec<&str> = agent.split(',').collect();
    let all = names.contains(&"ALL");
    db.agents
        .iter()
        .filter(|(name, _)| all || names.contains(&name.as_str()))
        .filter(|(_, record)| matches_filters(record, pairs))
        .map(|(name, record)| (name.as_str(), record))
        .collect()
}

fn matches_filters(record: &AgentRecord, pairs: &[(String, String)]) -> bool {
    let mut keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter().all(|key| {
        let Some(value) = record.metrics.get(key) else {
            return false;
        };
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        pairs
            .iter()
            .filter(|(k, _)| k == key)
            .any(|(_, pattern)| wildcard_match(pattern, &value))
    })
}

/// `*` matches any run of characters; everything else is literal.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }
    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}
