//! Judge0 remote execution client.
//!
//! Submissions are made synchronously (`wait=true`) with plain-text source,
//! so a single request returns the finished run.

use std::time::Duration;

use async_trait::async_trait;
use devfusion_core::RunnerConfig;
use devfusion_proto::{CodeRunner, RunError, RunOutput, RunRequest, RunResult, RunStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Submission body accepted by `POST /submissions`.
#[derive(Debug, Serialize)]
struct Submission<'a> {
    source_code: &'a str,
    language_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

/// Finished submission as returned with `wait=true`.
#[derive(Debug, Deserialize)]
struct SubmissionResult {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    status: Option<SubmissionStatus>,
    time: Option<String>,
    memory: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    id: u32,
    description: String,
}

impl From<SubmissionResult> for RunOutput {
    fn from(result: SubmissionResult) -> Self {
        let status = result.status.map_or_else(
            || RunStatus {
                id: 0,
                description: "Unknown".to_string(),
            },
            |s| RunStatus {
                id: s.id,
                description: s.description,
            },
        );
        RunOutput {
            stdout: result.stdout,
            stderr: result.stderr,
            compile_output: result.compile_output,
            message: result.message,
            status,
            time: result.time,
            memory: result.memory,
        }
    }
}

/// HTTP client for a Judge0 instance (self-hosted or RapidAPI).
#[derive(Debug, Clone)]
pub struct Judge0Client {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_host: Option<String>,
}

impl Judge0Client {
    pub fn new(config: &RunnerConfig, api_key: Option<String>) -> RunResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(client, config, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &RunnerConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_host: config.api_host.clone(),
        }
    }
}

#[async_trait]
impl CodeRunner for Judge0Client {
    async fn run(&self, request: &RunRequest) -> RunResult<RunOutput> {
        let body = Submission {
            source_code: &request.source,
            language_id: request.language.0,
            stdin: request.stdin.as_deref(),
        };

        let mut http = self
            .client
            .post(format!("{}/submissions", self.base_url))
            .query(&[("base64_encoded", "false"), ("wait", "true")])
            .json(&body);
        // RapidAPI-hosted instances authenticate by header; self-hosted ones need nothing.
        if let Some(key) = &self.api_key {
            http = http.header("X-RapidAPI-Key", key);
            if let Some(host) = &self.api_host {
                http = http.header("X-RapidAPI-Host", host);
            }
        }

        debug!(language_id = request.language.0, "Submitting to Judge0");
        let response = http
            .send()
            .await
            .map_err(|e| RunError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Judge0 rejected submission");
            return Err(RunError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: SubmissionResult = response
            .json()
            .await
            .map_err(|e| RunError::Malformed(e.to_string()))?;
        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devfusion_proto::LanguageId;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> Judge0Client {
        let config = RunnerConfig {
            base_url: format!("{}/", server.uri()),
            ..RunnerConfig::default()
        };
        Judge0Client::new(&config, key.map(str::to_string)).unwrap()
    }

    fn request() -> RunRequest {
        RunRequest {
            source: "print(input())".to_string(),
            language: LanguageId(71),
            stdin: Some("hello".to_string()),
        }
    }

    #[tokio::test]
    async fn run_posts_submission_and_maps_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .and(query_param("wait", "true"))
            .and(query_param("base64_encoded", "false"))
            .and(header("X-RapidAPI-Key", "rapid"))
            .and(header("X-RapidAPI-Host", "judge0-ce.p.rapidapi.com"))
            .and(body_json(json!({
                "source_code": "print(input())",
                "language_id": 71,
                "stdin": "hello"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "stdout": "hello\n",
                "stderr": null,
                "compile_output": null,
                "message": null,
                "status": { "id": 3, "description": "Accepted" },
                "time": "0.021",
                "memory": 3400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = client_for(&server, Some("rapid")).run(&request()).await.unwrap();

        assert_eq!(output.stdout.as_deref(), Some("hello\n"));
        assert!(output.status.is_success());
        assert_eq!(output.time.as_deref(), Some("0.021"));
        assert_eq!(output.memory, Some(3400));
    }

    #[tokio::test]
    async fn compile_errors_come_back_as_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "stdout": null,
                "compile_output": "main.c:1: error: expected ';'",
                "status": { "id": 6, "description": "Compilation Error" }
            })))
            .mount(&server)
            .await;

        let output = client_for(&server, None).run(&request()).await.unwrap();
        assert!(!output.status.is_success());
        assert_eq!(output.status.description, "Compilation Error");
        assert!(output.compile_output.unwrap().contains("expected ';'"));
    }

    #[tokio::test]
    async fn http_errors_surface_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(422).set_body_string(
                r#"{"language_id":["language with id 9999 doesn't exist"]}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server, None).run(&request()).await.unwrap_err();
        match err {
            RunError::Api { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("9999"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
