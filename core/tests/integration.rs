//! Every endpoint against the live mock server.
//!
//! # Design
//! Starts the mock sFlow-RT server on a random port in a background thread,
//! then calls each client operation over real HTTP. Checks that paths,
//! forwarded queries and the JSON/text decoding line up with what the
//! server actually serves.

use std::net::SocketAddr;

use serde_json::json;
use sflow_rt::{Aggregation, HttpMethod, Payload, Query, SFlowRt};

/// Start the mock server on a random port and return its address.
fn start_mock() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            sflow_rt_mock::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client() -> SFlowRt {
    let addr = start_mock();
    SFlowRt::new(&addr.ip().to_string(), addr.port())
}

#[test]
fn version_is_text() {
    let version = client().version().unwrap();
    assert_eq!(version, "3.0-1700");
}

#[test]
fn server_endpoints() {
    let c = client();

    let analyzer = c.analyzer_performance().unwrap();
    assert_eq!(analyzer.as_json().unwrap()["sFlowDatagramsReceived"], 2910);

    let prometheus = c.analyzer_performance_prometheus().unwrap();
    let text = prometheus.as_text().expect("exposition format is not JSON");
    assert!(text.contains("sflow_analyzer_heap_used 43000000"));

    let license = c.license().unwrap();
    assert_eq!(license.as_json().unwrap()["status"], "valid");
}

#[test]
fn agents_with_and_without_filter() {
    let c = client();

    let all = c.agents(None).unwrap().into_json().unwrap();
    assert_eq!(all.as_object().unwrap().len(), 3);

    let query = Query::new().with("agent", "10.0.0.1").with("agent", "10.0.0.2");
    let filtered = c.agents(Some(&query)).unwrap().into_json().unwrap();
    let names: Vec<&String> = filtered.as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["10.0.0.1", "10.0.0.2"]);
}

#[test]
fn metrics_endpoints() {
    let c = client();

    let catalog = c.metrics().unwrap().into_json().unwrap();
    assert!(catalog.get("load_one").is_some());

    let metrics = c.agent_metrics("10.0.0.3").unwrap().into_json().unwrap();
    assert_eq!(metrics["os_name"], "windows");

    let max = c.agent_metric("ALL", "load_one", None).unwrap();
    assert_eq!(
        max,
        Payload::Json(json!([{"metricName": "load_one", "metricValue": 1.5, "metricN": 3, "agent": "10.0.0.2"}]))
    );
}

#[test]
fn aggregation_prefix_and_filter_reach_the_server() {
    let c = client();
    let linux = Query::new().with("os_name", "linux");

    let avg = c
        .agent_metric("ALL", &Aggregation::Avg.apply("load_one"), Some(&linux))
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(avg[0]["metricValue"], 1.0);
    assert_eq!(avg[0]["metricN"], 2);

    let several = c
        .agent_metric("10.0.0.1,10.0.0.3", "max:load_one,min:load_one", None)
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(several[0]["agent"], "10.0.0.1");
    assert_eq!(several[1]["agent"], "10.0.0.3");
}

#[test]
fn table_and_dump() {
    let c = client();
    let web = Query::new().with("host_name", "web*");

    let table = c.agent_metric_table("ALL", "load_one,cpu_num", Some(&web)).unwrap().into_json().unwrap();
    let rows = table.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0]["agent"], "10.0.0.3");

    let dump = c.agent_metric_dump("10.0.0.2", "ALL", None).unwrap().into_json().unwrap();
    assert_eq!(dump.as_array().unwrap().len(), 6);
}

#[test]
fn flow_endpoints() {
    let c = client();

    let keys = c.flow_keys().unwrap().into_json().unwrap();
    assert_eq!(keys["tcpdestinationport"], 1800);

    let flows = c.flows().unwrap().into_json().unwrap();
    assert_eq!(flows["udp"]["keys"], "ipsource,udpdestinationport");
}

#[test]
fn error_statuses_are_decoded_not_raised() {
    let c = client();

    // 404 with a text body.
    let missing = c.agent_metrics("192.0.2.9").unwrap();
    assert_eq!(missing, Payload::Text("unknown agent: 192.0.2.9".to_string()));

    // 400 with a text body.
    let bad = c.agent_metric("ALL", "mean:load_one", None).unwrap();
    assert_eq!(bad, Payload::Text("unknown aggregation operator: mean".to_string()));

    // 404 with an empty body from an unrouted path.
    let unrouted = c.get("/activeflows/ALL/tcp/json", None).unwrap();
    assert_eq!(unrouted, Payload::Text(String::new()));
}

#[test]
fn execute_exposes_status_and_headers() {
    let c = client();
    let response = c.execute(&c.build_agent_metrics("192.0.2.9")).unwrap();
    assert_eq!(response.status, 404);
    assert!(response.header("content-type").unwrap().starts_with("text/plain"));
}

#[test]
fn generic_send_with_unrouted_method() {
    let c = client();
    // The mock only routes GET, so a POST is answered with 405 and an empty body.
    let response = c
        .execute(&c.build_request(HttpMethod::Post, "/flow/json", None, Some(r#"{"keys":"ipsource"}"#)))
        .unwrap();
    assert_eq!(response.status, 405);

    let payload = c.send(HttpMethod::Delete, "/flow/json", None, None).unwrap();
    assert_eq!(payload, Payload::Text(String::new()));
}

#[test]
fn malformed_agent_names_still_reach_the_server() {
    let c = client();

    let spaced = c.agent_metrics("not an agent").unwrap();
    assert_eq!(spaced, Payload::Text("unknown agent: not an agent".to_string()));

    let unicode = c.agent_metrics("café|{x}^").unwrap();
    assert_eq!(unicode, Payload::Text("unknown agent: café|{x}^".to_string()));

    let quoted = c.agent_metric("\"web1\"", "avg:load_one", None).unwrap().into_json().unwrap();
    assert_eq!(quoted[0]["metricN"], 0);
}
