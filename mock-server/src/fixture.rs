use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// In-memory state served by the mock. Read-only once the router is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fixture {
    pub version: String,
    pub license: Value,
    pub analyzer: Value,
    pub agents: BTreeMap<String, AgentRecord>,
    /// Milliseconds since each flow key was last seen.
    pub flow_keys: BTreeMap<String, u64>,
    pub flows: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentRecord {
    pub session: Value,
    pub metrics: BTreeMap<String, Value>,
}

/// Milliseconds since last seen, reported for every metric in `/metrics/json`.
pub const METRIC_LAST_SEEN_MS: u64 = 1000;

impl Fixture {
    /// Every metric name reported by at least one agent.
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .agents
            .values()
            .flat_map(|agent| agent.metrics.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Numeric analyzer counters in Prometheus text exposition format.
    pub fn prometheus_analyzer(&self) -> String {
        let mut out = String::new();
        if let Value::Object(counters) = &self.analyzer {
            for (name, value) in counters {
                if let Some(number) = value.as_f64() {
                    let metric = format!("sflow_analyzer_{}", snake_case(name));
                    out.push_str(&format!("# TYPE {metric} gauge\n{metric} {number}\n"));
                }
            }
        }
        out
    }

    pub fn agent_sessions(&self, selected: &[String]) -> Map<String, Value> {
        self.agents
            .iter()
            .filter(|(name, _)| selected.is_empty() || selected.contains(name))
            .map(|(name, record)| (name.clone(), record.session.clone()))
            .collect()
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn agent(session_datagrams: u64, metrics: Value) -> AgentRecord {
    let metrics = match metrics {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    AgentRecord {
        session: json!({
            "sFlowDatagramsReceived": session_datagrams,
            "sFlowDatagramsLost": 0,
            "sFlowDatagramSource": ["udp"],
            "firstSeen": 120_000,
            "lastSeen": 800,
        }),
        metrics,
    }
}

impl Default for Fixture {
    fn default() -> Self {
        let mut agents = BTreeMap::new();
        agents.insert(
            "10.0.0.1".to_string(),
            agent(
                1520,
                json!({
                    "host_name": "web1",
                    "os_name": "linux",
                    "cpu_num": 2,
                    "load_one": 0.5,
                    "load_five": 0.4,
                    "ifinoctets": 1200.0,
                }),
            ),
        );
        agents.insert(
            "10.0.0.2".to_string(),
            agent(
                980,
                json!({
                    "host_name": "db1",
                    "os_name": "linux",
                    "cpu_num": 4,
                    "load_one": 1.5,
                    "load_five": 1.25,
                    "ifinoctets": 5400.0,
                }),
            ),
        );
        agents.insert(
            "10.0.0.3".to_string(),
            agent(
                410,
                json!({
                    "host_name": "web2",
                    "os_name": "windows",
                    "cpu_num": 2,
                    "load_one": 0.25,
                }),
            ),
        );

        let mut flow_keys = BTreeMap::new();
        flow_keys.insert("ipsource".to_string(), 250);
        flow_keys.insert("ipdestination".to_string(), 250);
        flow_keys.insert("tcpdestinationport".to_string(), 1800);

        Self {
            version: "3.0-1700".to_string(),
            license: json!({
                "type": "free",
                "status": "valid",
                "expires": null,
            }),
            analyzer: json!({
                "sFlowDatagramsReceived": 2910,
                "sFlowDatagramsLost": 0,
                "sFlowFlowSamples": 18_400,
                "sFlowCounterSamples": 760,
                "cpuLoadProcess": 0.02,
                "heapUsed": 43_000_000,
            }),
            agents,
            flow_keys,
            flows: json!({
                "tcp": {
                    "keys": "ipsource,ipdestination,tcpdestinationport",
                    "value": "bytes",
                    "n": 5,
                    "t": 2,
                },
                "udp": {
                    "keys": "ipsource,udpdestinationport",
                    "value": "frames",
                    "n": 5,
                    "t": 2,
                },
            }),
        }
    }
}
