//! Synchronous client for the sFlow-RT REST API.
//!
//! # Design
//! `SFlowRt` holds a `base_url` and one `ureq::Agent`, which is the reusable
//! session for every call. Each endpoint has a pure `build_*` method that
//! produces an `HttpRequest`, and a calling method that sends it through
//! `execute` and decodes the body into a `Payload`. The build step never
//! touches the network, so the exact URL and query of every operation can
//! be tested without a server.
//!
//! Agent and metric arguments are not validated. Each is percent-encoded as
//! a single path segment, with `:`, `,`, `;`, `*` and `.` left literal, so
//! lists (`10.0.0.1,switch1`), the `ALL` token, and aggregation prefixes
//! (`avg:load_one`) reach the server unchanged.
//!
//! Each call is one blocking round trip bounded by the configured timeout.
//! There are no retries, and HTTP status codes are not interpreted.
//!
//! `ureq::Agent` is internally synchronized, so a `SFlowRt` can be cloned
//! and used from several threads; clones share the agent's connections.

use std::fmt;
use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use ureq::typestate::WithBody;
use ureq::RequestBuilder;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::payload::Payload;
use crate::query::Query;

/// Characters escaped in an interpolated agent or metric segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Blocking sFlow-RT REST client bound to one server.
#[derive(Clone)]
pub struct SFlowRt {
    base_url: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl fmt::Debug for SFlowRt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SFlowRt")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SFlowRt {
    /// Client for `http://{host}:{port}` with the default 30 second timeout.
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_config(&ClientConfig::new(host, port))
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        let base_url = config.base_url();
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        tracing::debug!(%base_url, timeout = ?config.timeout, "created sFlow-RT client");
        Self {
            base_url,
            timeout: config.timeout,
            agent,
        }
    }

    /// Client configured from `SFLOW_RT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(&ClientConfig::from_env()?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Describe a request to `endpoint` (a path starting with `/`) without
    /// sending it. A body is marked as JSON.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<&str>,
    ) -> HttpRequest {
        let headers = match body {
            Some(_) => vec![("content-type".to_string(), "application/json".to_string())],
            None => Vec::new(),
        };
        HttpRequest {
            method,
            url: format!("{}{endpoint}", self.base_url),
            query: query.map(|q| q.pairs().to_vec()).unwrap_or_default(),
            headers,
            body: body.map(str::to_string),
        }
    }

    /// Perform exactly one round trip. Any status code is a successful
    /// response here; only transport failures are errors.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let started = Instant::now();
        let result = self.round_trip(request);
        match &result {
            Ok(response) => tracing::debug!(
                method = %request.method,
                url = %request.url,
                status = response.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sFlow-RT request completed"
            ),
            Err(err) => tracing::warn!(
                method = %request.method,
                url = %request.url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "sFlow-RT request failed"
            ),
        }
        result
    }

    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let mut response = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), request).call()?,
            HttpMethod::Delete => prepare(self.agent.delete(url), request).call()?,
            HttpMethod::Post => send_body(prepare(self.agent.post(url), request), body)?,
            HttpMethod::Put => send_body(prepare(self.agent.put(url), request), body)?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // ureq caps string reads at 10 MiB by default; dumps can be larger.
        let body = response.body_mut().with_config().limit(u64::MAX).read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Build, execute and decode a request.
    pub fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<&str>,
    ) -> Result<Payload> {
        let request = self.build_request(method, endpoint, query, body);
        self.fetch(&request)
    }

    pub fn get(&self, endpoint: &str, query: Option<&Query>) -> Result<Payload> {
        self.send(HttpMethod::Get, endpoint, query, None)
    }

    fn fetch(&self, request: &HttpRequest) -> Result<Payload> {
        self.execute(request).map(Payload::from)
    }

    // -----------------------------------------------------------------------
    // Server
    // -----------------------------------------------------------------------

    pub fn build_version(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/version", None, None)
    }

    /// Software version of the server. The body is returned as text even if
    /// it would parse as JSON.
    pub fn version(&self) -> Result<String> {
        Ok(self.execute(&self.build_version())?.body)
    }

    pub fn build_analyzer_performance(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/analyzer/json", None, None)
    }

    /// sFlow analyzer performance counters.
    pub fn analyzer_performance(&self) -> Result<Payload> {
        self.fetch(&self.build_analyzer_performance())
    }

    pub fn build_analyzer_performance_prometheus(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/prometheus/analyzer/json", None, None)
    }

    /// Analyzer performance in Prometheus text exposition format, which
    /// normally arrives as `Payload::Text`.
    pub fn analyzer_performance_prometheus(&self) -> Result<Payload> {
        self.fetch(&self.build_analyzer_performance_prometheus())
    }

    pub fn build_license(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/license/json", None, None)
    }

    pub fn license(&self) -> Result<Payload> {
        self.fetch(&self.build_license())
    }

    pub fn build_agents(&self, query: Option<&Query>) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/agents/json", query, None)
    }

    /// sFlow agents with session information. `query` selects agents,
    /// e.g. `agent=10.0.0.1&agent=test1`.
    pub fn agents(&self, query: Option<&Query>) -> Result<Payload> {
        self.fetch(&self.build_agents(query))
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    pub fn build_metrics(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/metrics/json", None, None)
    }

    /// Active metrics and milliseconds since each was last seen.
    pub fn metrics(&self) -> Result<Payload> {
        self.fetch(&self.build_metrics())
    }

    pub fn build_agent_metrics(&self, agent: &str) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("/metric/{}/json", segment(agent)), None, None)
    }

    /// Every metric currently held for one agent.
    pub fn agent_metrics(&self, agent: &str) -> Result<Payload> {
        self.fetch(&self.build_agent_metrics(agent))
    }

    pub fn build_agent_metric(&self, agent: &str, metric: &str, query: Option<&Query>) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("/metric/{}/{}/json", segment(agent), segment(metric)), query, None)
    }

    /// Aggregated metric values.
    ///
    /// `agent` is a comma separated list or `ALL`. `metric` is an ordered
    /// comma separated list, each entry optionally prefixed with an
    /// aggregation operator (`max:load_one,min:load_one`); the server uses
    /// `max` when no prefix is given. `query` filters agents on metric
    /// values, e.g. `os_name=linux&cpu_num=2`.
    pub fn agent_metric(&self, agent: &str, metric: &str, query: Option<&Query>) -> Result<Payload> {
        self.fetch(&self.build_agent_metric(agent, metric, query))
    }

    pub fn build_agent_metric_table(
        &self,
        agent: &str,
        metric: &str,
        query: Option<&Query>,
    ) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("/table/{}/{}/json", segment(agent), segment(metric)), query, None)
    }

    /// Same selection as `agent_metric`, laid out as one row per agent.
    pub fn agent_metric_table(&self, agent: &str, metric: &str, query: Option<&Query>) -> Result<Payload> {
        self.fetch(&self.build_agent_metric_table(agent, metric, query))
    }

    pub fn build_agent_metric_dump(
        &self,
        agent: &str,
        metric: &str,
        query: Option<&Query>,
    ) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("/dump/{}/{}/json", segment(agent), segment(metric)), query, None)
    }

    /// Raw metric values. `metric` may be a `;` separated list or `ALL`.
    pub fn agent_metric_dump(&self, agent: &str, metric: &str, query: Option<&Query>) -> Result<Payload> {
        self.fetch(&self.build_agent_metric_dump(agent, metric, query))
    }

    // -----------------------------------------------------------------------
    // Flows
    // -----------------------------------------------------------------------

    pub fn build_flow_keys(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/flowkeys/json", None, None)
    }

    /// Active flow keys and milliseconds since each was last seen.
    pub fn flow_keys(&self) -> Result<Payload> {
        self.fetch(&self.build_flow_keys())
    }

    pub fn build_flows(&self) -> HttpRequest {
        self.build_request(HttpMethod::Get, "/flow/json", None, None)
    }

    /// Flow definitions.
    pub fn flows(&self) -> Result<Payload> {
        self.fetch(&self.build_flows())
    }
}

fn prepare<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
