//! Server-side aggregation of one metric across agents.

use serde_json::{json, Value};

pub const OPERATORS: [&str; 12] = [
    "max", "min", "sum", "avg", "var", "sdev", "med", "q1", "q2", "q3", "iqr", "any",
];

pub const DEFAULT_OPERATOR: &str = "max";

/// A metric entry from the URL, e.g. `avg:load_one` or `load_one`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec<'a> {
    pub op: &'a str,
    pub name: &'a str,
}

impl<'a> MetricSpec<'a> {
    /// Split an optional `op:` prefix. Unknown operators are rejected.
    pub fn parse(entry: &'a str) -> Result<Self, String> {
        match entry.split_once(':') {
            Some((op, name)) if OPERATORS.contains(&op) => Ok(Self { op, name }),
            Some((op, _)) => Err(format!("unknown aggregation operator: {op}")),
            None => Ok(Self {
                op: DEFAULT_OPERATOR,
                name: entry,
            }),
        }
    }
}

/// Aggregate `samples` (agent, value) with `spec.op`.
///
/// `max`, `min` and `any` report the agent that supplied the value. `any`
/// accepts non-numeric values; the other operators skip them.
pub fn aggregate(spec: &MetricSpec<'_>, samples: &[(&str, &Value)]) -> Value {
    if spec.op == "any" {
        return match samples.first() {
            Some((agent, value)) => json!({
                "metricName": spec.name,
                "metricValue": value,
                "metricN": samples.len(),
                "agent": agent,
            }),
            None => empty(spec.name),
        };
    }

    let numeric: Vec<(&str, f64)> = samples
        .iter()
        .filter_map(|(agent, value)| value.as_f64().map(|v| (*agent, v)))
        .collect();
    if numeric.is_empty() {
        return empty(spec.name);
    }
    let n = numeric.len();

    if spec.op == "max" || spec.op == "min" {
        let pick = numeric
            .iter()
            .copied()
            .reduce(|best, next| {
                let better = if spec.op == "max" { next.1 > best.1 } else { next.1 < best.1 };
                if better { next } else { best }
            })
            .unwrap_or(numeric[0]);
        return json!({
            "metricName": spec.name,
            "metricValue": pick.1,
            "metricN": n,
            "agent": pick.0,
        });
    }

    let mut values: Vec<f64> = numeric.iter().map(|(_, v)| *v).collect();
    values.sort_by(f64::total_cmp);
    let sum: f64 = values.iter().sum();
    let mean = sum / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    let value = match spec.op {
        "sum" => sum,
        "avg" => mean,
        "var" => variance,
        "sdev" => variance.sqrt(),
        "med" | "q2" => quantile(&values, 0.5),
        "q1" => quantile(&values, 0.25),
        "q3" => quantile(&values, 0.75),
        "iqr" => quantile(&values, 0.75) - quantile(&values, 0.25),
        _ => return empty(spec.name),
    };
    json!({
        "metricName": spec.name,
        "metricValue": value,
        "metricN": n,
    })
}

fn empty(name: &str) -> Value {
    json!({ "metricName": name, "metricN": 0 })
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[(&'static str, f64)]) -> Vec<(&'static str, Value)> {
        values.iter().map(|(a, v)| (*a, json!(v))).collect()
    }

    fn run(entry: &str, values: &[(&'static str, f64)]) -> Value {
        let owned = samples(values);
        let borrowed: Vec<(&str, &Value)> = owned.iter().map(|(a, v)| (*a, v)).collect();
        aggregate(&MetricSpec::parse(entry).unwrap(), &borrowed)
    }

    const LOAD: [(&str, f64); 4] = [("a", 1.0), ("b", 4.0), ("c", 2.0), ("d", 3.0)];

    #[test]
    fn parse_prefix() {
        assert_eq!(MetricSpec::parse("avg:load_one").unwrap(), MetricSpec { op: "avg", name: "load_one" });
        assert_eq!(MetricSpec::parse("load_one").unwrap(), MetricSpec { op: "max", name: "load_one" });
        assert!(MetricSpec::parse("mean:load_one").is_err());
    }

    #[test]
    fn max_and_min_report_agent() {
        let max = run("max:load_one", &LOAD);
        assert_eq!(max["metricValue"], 4.0);
        assert_eq!(max["agent"], "b");
        let min = run("min:load_one", &LOAD);
        assert_eq!(min["metricValue"], 1.0);
        assert_eq!(min["agent"], "a");
        assert_eq!(min["metricN"], 4);
    }

    #[test]
    fn moments() {
        assert_eq!(run("sum:x", &LOAD)["metricValue"], 10.0);
        assert_eq!(run("avg:x", &LOAD)["metricValue"], 2.5);
        assert_eq!(run("var:x", &LOAD)["metricValue"], 1.25);
    }

    #[test]
    fn quantiles() {
        assert_eq!(run("med:x", &LOAD)["metricValue"], 2.5);
        assert_eq!(run("q1:x", &LOAD)["metricValue"], 1.75);
        assert_eq!(run("q3:x", &LOAD)["metricValue"], 3.25);
        assert_eq!(run("iqr:x", &LOAD)["metricValue"], 1.5);
    }

    #[test]
    fn any_accepts_strings() {
        let value = json!("linux");
        let result = aggregate(&MetricSpec::parse("any:os_name").unwrap(), &[("a", &value)]);
        assert_eq!(result["metricValue"], "linux");
        assert_eq!(result["agent"], "a");
    }

    #[test]
    fn no_samples_reports_zero_count() {
        let result = run("avg:missing", &[]);
        assert_eq!(result, json!({"metricName": "missing", "metricN": 0}));
    }
}
