//! Synchronous client for the sFlow-RT REST API.
//!
//! # Overview
//! `SFlowRt` exposes one method per server endpoint (version, license,
//! agents, metrics, flows). Each performs a single blocking HTTP GET and
//! returns the body as a `Payload`: parsed JSON when the body is JSON, the
//! raw text otherwise.
//!
//! ```no_run
//! use sflow_rt::{Aggregation, Query, SFlowRt};
//!
//! # fn main() -> sflow_rt::Result<()> {
//! let client = SFlowRt::new("127.0.0.1", 8008);
//! println!("sFlow-RT {}", client.version()?);
//!
//! let linux = Query::new().with("os_name", "linux");
//! let load = client.agent_metric("ALL", &Aggregation::Avg.apply("load_one"), Some(&linux))?;
//! println!("{load}");
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Every endpoint has a pure `build_*` method returning an `HttpRequest`,
//!   so requests can be inspected without a server.
//! - `SFlowRt::execute` is the only place that does I/O. Transport failures
//!   are errors; HTTP status codes and non-JSON bodies are not.
//! - Aggregation happens on the server. Metric strings are passed through
//!   untouched.

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod payload;
pub mod query;

pub use aggregation::Aggregation;
pub use client::SFlowRt;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use payload::Payload;
pub use query::Query;
