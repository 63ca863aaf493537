//! HTTP client for the execution service.
//!
//! The service is a small REST wrapper around a Python kernel: three
//! lifecycle endpoints (`/start`, `/restart`, `/shutdown`), a `/status`
//! probe, and one `/execute` endpoint that either returns structured output
//! fragments or a structured error. This crate owns the wire types and the
//! contract for turning a reply into output-region text; it performs no
//! retries and offers no cancellation, matching the service's own model.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Literal marker shown when an execution succeeds without producing any
/// output fragments.
pub const NO_OUTPUT: &str = "(No output)";

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Transport-level failure: the service is down, or its reply was not in
    /// the expected shape. Callers contain this at cell granularity.
    #[error("execution service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    /// The service answered a control endpoint with a non-ok status.
    #[error("execution service refused `{endpoint}` with status `{status}`")]
    Refused {
        endpoint: &'static str,
        status: String,
    },
    /// The kernel ran the code and reported a failure.
    #[error("{0}")]
    Execution(ExecutionFailure),
}

/// Structured failure reported by the kernel for one execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionFailure {
    pub ename: String,
    pub evalue: String,
    #[serde(default)]
    pub traceback: Vec<String>,
}

impl std::fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.ename, self.evalue)
    }
}

impl ExecutionFailure {
    /// Short form, `name: message`.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Full error text: the joined traceback when present, else the summary.
    pub fn text(&self) -> String {
        if self.traceback.is_empty() {
            self.summary()
        } else {
            self.traceback.join("\n")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Stream,
    ExecuteResult,
    /// Fragment kinds this client does not render.
    #[serde(other)]
    Other,
}

/// One fragment of kernel output.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputFragment {
    #[serde(rename = "type")]
    pub kind: FragmentKind,
    #[serde(default)]
    pub text: String,
}

/// A successful execution reply.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOutput {
    pub fragments: Vec<OutputFragment>,
}

impl ExecuteOutput {
    /// Output-region text: the ordered concatenation (no separator) of every
    /// `stream` and `execute_result` fragment's text; other fragment kinds
    /// contribute nothing. An empty fragment list renders the literal
    /// [`NO_OUTPUT`] marker.
    pub fn text(&self) -> String {
        if self.fragments.is_empty() {
            return NO_OUTPUT.to_string();
        }
        self.fragments
            .iter()
            .filter(|fragment| {
                matches!(
                    fragment.kind,
                    FragmentKind::Stream | FragmentKind::ExecuteResult
                )
            })
            .map(|fragment| fragment.text.as_str())
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ControlReply {
    status: String,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
    #[serde(default)]
    kernel_alive: bool,
}

#[derive(Debug, Deserialize)]
struct ExecuteReply {
    status: String,
    #[serde(default)]
    output: Vec<OutputFragment>,
    #[serde(default)]
    error: Option<ExecutionFailure>,
}

/// Client for one execution service.
#[derive(Debug, Clone)]
pub struct KernelClient {
    http: Client,
    base: Url,
}

impl KernelClient {
    /// `base` is the service prefix, e.g. `http://127.0.0.1:8090/api`.
    pub fn new(mut base: Url) -> Self {
        // Url::join treats a prefix without a trailing slash as a file.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        KernelClient {
            http: Client::new(),
            base,
        }
    }

    fn endpoint(&self, name: &str) -> Url {
        self.base.join(name).expect("static endpoint name")
    }

    pub async fn start(&self) -> Result<(), KernelError> {
        self.control("start").await
    }

    pub async fn restart(&self) -> Result<(), KernelError> {
        self.control("restart").await
    }

    pub async fn shutdown(&self) -> Result<(), KernelError> {
        self.control("shutdown").await
    }

    async fn control(&self, name: &'static str) -> Result<(), KernelError> {
        let reply: ControlReply = self
            .http
            .post(self.endpoint(name))
            .send()
            .await?
            .json()
            .await?;
        if reply.status == "ok" {
            Ok(())
        } else {
            Err(KernelError::Refused {
                endpoint: name,
                status: reply.status,
            })
        }
    }

    /// Probe the service; `Ok(true)` when a kernel is alive behind it.
    pub async fn status(&self) -> Result<bool, KernelError> {
        let reply: StatusReply = self
            .http
            .get(self.endpoint("status"))
            .send()
            .await?
            .json()
            .await?;
        if reply.status == "ok" {
            Ok(reply.kernel_alive)
        } else {
            Err(KernelError::Refused {
                endpoint: "status",
                status: reply.status,
            })
        }
    }

    /// Run one cell's source. A reply with `status: "error"` surfaces as
    /// [`KernelError::Execution`] carrying the kernel's own failure record.
    pub async fn execute(&self, code: &str) -> Result<ExecuteOutput, KernelError> {
        tracing::debug!(target: "axnote_kernel", bytes = code.len(), "execute request");
        let reply: ExecuteReply = self
            .http
            .post(self.endpoint("execute"))
            .json(&ExecuteRequest { code })
            .send()
            .await?
            .json()
            .await?;
        match reply.status.as_str() {
            "ok" => Ok(ExecuteOutput {
                fragments: reply.output,
            }),
            "error" => Err(KernelError::Execution(reply.error.unwrap_or_else(|| {
                ExecutionFailure {
                    ename: "Error".to_string(),
                    evalue: "execution failed".to_string(),
                    traceback: Vec::new(),
                }
            }))),
            _ => Err(KernelError::Refused {
                endpoint: "execute",
                status: reply.status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> KernelClient {
        KernelClient::new(Url::parse(&server.url("/api")).unwrap())
    }

    #[tokio::test]
    async fn execute_concatenates_stream_and_result_fragments() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/api/execute");
            then.status(200).json_body(serde_json::json!({
                "status": "ok",
                "output": [
                    { "type": "stream", "text": "a" },
                    { "type": "display_data", "text": "ignored" },
                    { "type": "execute_result", "text": "b" },
                ],
            }));
        });

        let output = client(&server).execute("print('ab')").await.unwrap();
        assert_eq!(output.text(), "ab");
    }

    #[tokio::test]
    async fn execute_with_no_fragments_renders_the_marker() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST)
                .path("/api/execute")
                .json_body(serde_json::json!({ "code": "x = 1" }));
            then.status(200)
                .json_body(serde_json::json!({ "status": "ok", "output": [] }));
        });

        let output = client(&server).execute("x = 1").await.unwrap();
        assert_eq!(output.text(), "(No output)");
    }

    #[tokio::test]
    async fn execute_error_carries_the_failure_record() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/api/execute");
            then.status(200).json_body(serde_json::json!({
                "status": "error",
                "error": { "ename": "ValueError", "evalue": "bad" },
            }));
        });

        let err = client(&server).execute("boom()").await.unwrap_err();
        match err {
            KernelError::Execution(failure) => {
                assert_eq!(failure.text(), "ValueError: bad");
                assert!(failure.traceback.is_empty());
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_error_prefers_the_traceback() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/api/execute");
            then.status(200).json_body(serde_json::json!({
                "status": "error",
                "error": {
                    "ename": "ZeroDivisionError",
                    "evalue": "division by zero",
                    "traceback": ["Traceback (most recent call last):", "ZeroDivisionError: division by zero"],
                },
            }));
        });

        let err = client(&server).execute("1/0").await.unwrap_err();
        match err {
            KernelError::Execution(failure) => assert_eq!(
                failure.text(),
                "Traceback (most recent call last):\nZeroDivisionError: division by zero"
            ),
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn control_endpoints_report_refusals() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/api/restart");
            then.status(200)
                .json_body(serde_json::json!({ "status": "no kernel" }));
        });

        let err = client(&server).restart().await.unwrap_err();
        assert!(matches!(
            err,
            KernelError::Refused {
                endpoint: "restart",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn status_reports_kernel_liveness() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200)
                .json_body(serde_json::json!({ "status": "ok", "kernel_alive": true }));
        });

        assert!(client(&server).status().await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Nothing listens on this port.
        let client = KernelClient::new(Url::parse("http://127.0.0.1:1/api").unwrap());
        assert!(matches!(
            client.start().await,
            Err(KernelError::Unreachable(_))
        ));
    }
}
