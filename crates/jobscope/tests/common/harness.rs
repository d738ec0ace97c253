//! Isolated environment for end-to-end dispatcher tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobscope::protocol::encode_response;
use jobscope::{Config, Database, Dispatcher};

pub struct TestHarness {
    temp_dir: TempDir,
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    /// Stands in for both the Ollama and the Perplexity endpoints.
    pub server: MockServer,
}

impl TestHarness {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("extracted_jobs");
        let db_path = temp_dir.path().join("data").join("jobs.db");
        let server = MockServer::start().await;

        Self {
            temp_dir,
            output_dir,
            db_path,
            server,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Defaults pointed at the temp directory and the mock server.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.database_path = self.db_path.clone();
        config.output_directory = self.output_dir.clone();
        config.providers.ollama.base_url = self.server.uri();
        config.providers.ollama.timeout_secs = 5;
        config.providers.perplexity.base_url = self.server.uri();
        config.providers.perplexity.timeout_secs = 5;
        config.providers.perplexity.api_key_env = "JOBSCOPE_IT_UNSET_KEY".to_string();
        config
    }

    pub fn open_db(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open database")
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.config(), Some(self.open_db()))
    }

    /// Queues one Ollama reply. Replies are served in mount order.
    pub async fn queue_ollama_reply(&self, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5:7b",
                "response": reply,
                "done": true
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    pub async fn queue_ollama_status(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Sends one frame body through the dispatcher and decodes the reply
    /// exactly as it would cross the channel.
    pub async fn send(&self, dispatcher: &Dispatcher, body: Value) -> Value {
        let response = dispatcher.dispatch(body.to_string().as_bytes()).await;
        serde_json::from_slice(&encode_response(&response)).expect("reply is JSON")
    }

    /// Sends an untagged extraction frame using the given provider.
    pub async fn extract(&self, dispatcher: &Dispatcher, text: &str, provider: &str) -> Value {
        self.send(
            dispatcher,
            json!({ "text": text, "settings": { "provider": provider } }),
        )
        .await
    }

    pub async fn api(&self, dispatcher: &Dispatcher, action: &str, data: Value) -> Value {
        let reply = self
            .send(dispatcher, json!({ "action": action, "data": data }))
            .await;
        assert_eq!(reply["ok"], json!(true), "{} failed: {}", action, reply);
        reply["payload"].clone()
    }
}
