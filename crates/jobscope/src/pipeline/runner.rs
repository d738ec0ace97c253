use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::db::{job_repo, Database, DatabaseError};
use crate::error::ExtractionError;
use crate::extractor::{build_extractor, build_prompt, ExtractorConfig, JobExtractor};
use crate::model::JobRecord;
use crate::normalize::{normalize, NormalizeContext};
use crate::protocol::{ExtractRequest, ExtractSettings};
use crate::sanitize;
use crate::storage::ArtifactStore;

use super::error::{PipelineError, PipelineFailure};

/// Result of a successful extraction run.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub record: JobRecord,
    /// Row id, `None` when the host runs without a database.
    pub job_id: Option<i64>,
    pub raw_path: Option<PathBuf>,
    pub structured_path: Option<PathBuf>,
}

/// Posting text in, stored job out.
///
/// Steps: write the raw text, call the provider, normalize the reply,
/// upsert it, write the structured record.
pub struct ExtractionPipeline<'a> {
    config: &'a Config,
    db: Option<&'a Database>,
    artifacts: Option<ArtifactStore>,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(config: &'a Config, db: Option<&'a Database>) -> Self {
        let artifacts = config
            .save_artifacts
            .then(|| ArtifactStore::new(&config.output_directory));
        Self {
            config,
            db,
            artifacts,
        }
    }

    /// Runs with the provider selected by the request settings.
    pub async fn run(&self, request: &ExtractRequest) -> Result<ExtractionOutcome, PipelineFailure> {
        let providers = &self.config.providers;
        self.run_inner(request, |settings| {
            let config = ExtractorConfig::resolve(settings, providers)?;
            build_extractor(config)
        })
        .await
    }

    /// Runs with an already constructed provider.
    pub async fn run_with(
        &self,
        request: &ExtractRequest,
        extractor: Box<dyn JobExtractor>,
    ) -> Result<ExtractionOutcome, PipelineFailure> {
        self.run_inner(request, move |_| Ok(extractor)).await
    }

    async fn run_inner<F>(
        &self,
        request: &ExtractRequest,
        make_extractor: F,
    ) -> Result<ExtractionOutcome, PipelineFailure>
    where
        F: FnOnce(&ExtractSettings) -> Result<Box<dyn JobExtractor>, ExtractionError>,
    {
        let text = request.text.as_str();
        if text.trim().is_empty() {
            return Err(PipelineFailure::new(PipelineError::EmptyPosting, None));
        }

        let stamp = ArtifactStore::stamp_now();
        let extracted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let source_url = source_url(request);

        let span = info_span!("extraction",
            stamp = %stamp,
            text_len = text.len(),
            source_url = source_url.unwrap_or(""),
        );

        self.execute(request, make_extractor, &stamp, &extracted_at, source_url)
            .instrument(span)
            .await
    }

    async fn execute<F>(
        &self,
        request: &ExtractRequest,
        make_extractor: F,
        stamp: &str,
        extracted_at: &str,
        source_url: Option<&str>,
    ) -> Result<ExtractionOutcome, PipelineFailure>
    where
        F: FnOnce(&ExtractSettings) -> Result<Box<dyn JobExtractor>, ExtractionError>,
    {
        let text = request.text.as_str();

        // Step 1: keep the raw text before anything can fail remotely
        let raw_path = {
            let _step = info_span!("save_raw").entered();
            self.step_save_raw(stamp, text)
                .map_err(|e| PipelineFailure::new(e, None))?
        };

        // Step 2: provider call
        let extractor = make_extractor(&request.settings)
            .map_err(|e| PipelineFailure::new(e, raw_path.clone()))?;
        let prompt = build_prompt(text, source_url.unwrap_or(""), extracted_at);
        info!(provider = extractor.name(), "Calling provider for structured extraction");
        let reply = extractor
            .extract(&prompt)
            .instrument(info_span!("extract", provider = extractor.name()))
            .await
            .map_err(|e| PipelineFailure::new(e, raw_path.clone()))?;

        // Step 3: normalize
        let record = {
            let _step = info_span!("normalize").entered();
            normalize(
                &reply,
                NormalizeContext {
                    source_url,
                    posting_text: text,
                },
            )
            .map_err(|e| PipelineFailure::new(e, raw_path.clone()))?
        };

        // Step 4: persist
        let persisted = {
            let _step = info_span!("persist").entered();
            self.step_persist(&record)
        };

        // Step 5: structured artifact. Once the job is stored the run counts
        // as a success; a failed write only loses the file.
        let structured = {
            let _step = info_span!("save_structured").entered();
            self.step_save_structured(stamp, &record)
        };

        match (persisted, structured) {
            (Ok(job_id), Ok(structured_path)) => Ok(ExtractionOutcome {
                record,
                job_id,
                raw_path,
                structured_path,
            }),
            (Ok(job_id), Err(e)) if job_id.is_some() => {
                warn!("Job stored but structured artifact not written: {}", e);
                Ok(ExtractionOutcome {
                    record,
                    job_id,
                    raw_path,
                    structured_path: None,
                })
            }
            (Ok(_), Err(e)) => Err(PipelineFailure::new(e, raw_path)),
            (Err(e), structured) => {
                if let Err(storage) = &structured {
                    warn!("Structured artifact not written either: {}", storage);
                }
                Err(PipelineFailure {
                    error: e.into(),
                    raw_path,
                    structured_path: structured.ok().flatten(),
                })
            }
        }
    }

    fn step_save_raw(&self, stamp: &str, text: &str) -> Result<Option<PathBuf>, PipelineError> {
        let Some(store) = &self.artifacts else {
            return Ok(None);
        };
        let path = store.save_raw(stamp, text)?;
        info!("Saved raw text to {}", path.display());
        Ok(Some(path))
    }

    fn step_persist(&self, record: &JobRecord) -> Result<Option<i64>, DatabaseError> {
        let Some(db) = self.db else {
            warn!("Database not initialized, skipping save");
            return Ok(None);
        };
        match job_repo::save(db, record) {
            Ok(id) => {
                info!(job_id = id, source_url = %record.source_url, "Saved job");
                Ok(Some(id))
            }
            Err(e) => {
                warn!("Failed to save job {}: {}", record.source_url, e);
                Err(e)
            }
        }
    }

    fn step_save_structured(
        &self,
        stamp: &str,
        record: &JobRecord,
    ) -> Result<Option<PathBuf>, PipelineError> {
        let Some(store) = &self.artifacts else {
            return Ok(None);
        };
        let path = store.save_structured(stamp, record)?;
        debug!("Saved structured record to {}", path.display());
        Ok(Some(path))
    }
}

/// Settings URL first, then the `URL:` marker in the posting text.
fn source_url(request: &ExtractRequest) -> Option<&str> {
    let from_settings = request.settings.source_url.trim();
    if !from_settings.is_empty() {
        return Some(from_settings);
    }
    sanitize::extract_source_url(&request.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StubExtractor {
        reply: Result<String, ()>,
        prompts: std::sync::Arc<Mutex<Vec<String>>>,
        during_call: Option<Box<dyn Fn() + Send + Sync>>,
    }

    impl StubExtractor {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Default::default(),
                during_call: None,
            }
        }

        /// Runs `hook` while the provider call is in flight.
        fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.during_call = Some(Box::new(hook));
            self
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Default::default(),
                during_call: None,
            }
        }
    }

    #[async_trait]
    impl JobExtractor for StubExtractor {
        fn name(&self) -> &str {
            "stub"
        }

        async fn extract(&self, prompt: &str) -> Result<String, ExtractionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(hook) = &self.during_call {
                hook();
            }
            self.reply.clone().map_err(|_| ExtractionError::Transport {
                provider: "stub".to_string(),
                detail: "connection refused".to_string(),
            })
        }
    }

    const REPLY: &str = r#"```json
{
  "metadata": { "job_title": "Platform Engineer" },
  "company_info": { "company_name": "Acme", "location_full": "Berlin, Germany", "location_city": "Berlin" },
  "requirements": { "technical_skills": { "programming_languages": ["Rust", "Go"], "cloud_platforms": ["AWS"] } },
  "source_url": ""
}
```"#;

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output_directory = dir.path().join("out");
        (dir, config)
    }

    fn request(text: &str) -> ExtractRequest {
        ExtractRequest {
            text: text.to_string(),
            settings: ExtractSettings::default(),
        }
    }

    #[tokio::test]
    async fn test_full_run_persists_and_writes_artifacts() {
        let (_dir, config) = setup();
        let db = Database::open_in_memory().unwrap();
        let pipeline = ExtractionPipeline::new(&config, Some(&db));

        let outcome = pipeline
            .run_with(
                &request("URL: https://x.example/job/1\nPlatform Engineer at Acme"),
                Box::new(StubExtractor::replying(REPLY)),
            )
            .await
            .unwrap();

        assert_eq!(outcome.record.source_url, "https://x.example/job/1");
        let id = outcome.job_id.unwrap();
        let stored = job_repo::find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(stored.record.metadata.job_title, "Platform Engineer");
        assert_eq!(job_repo::skills_for_job(&db, id).unwrap().len(), 3);

        let raw = outcome.raw_path.unwrap();
        assert!(raw.file_name().unwrap().to_str().unwrap().ends_with("_raw.txt"));
        assert!(std::fs::read_to_string(&raw).unwrap().contains("Platform Engineer at Acme"));

        let structured = std::fs::read_to_string(outcome.structured_path.unwrap()).unwrap();
        let saved: JobRecord = serde_json::from_str(&structured).unwrap();
        assert_eq!(saved, outcome.record);
    }

    #[tokio::test]
    async fn test_settings_url_wins_and_reaches_prompt() {
        let (_dir, config) = setup();
        let pipeline = ExtractionPipeline::new(&config, None);
        let stub = StubExtractor::replying(REPLY);
        let prompts = stub.prompts.clone();

        let mut req = request("URL: https://x.example/from-text\nposting");
        req.settings.source_url = "https://x.example/from-settings".to_string();

        let outcome = pipeline.run_with(&req, Box::new(stub)).await.unwrap();
        assert_eq!(outcome.record.source_url, "https://x.example/from-settings");
        assert!(outcome.job_id.is_none());
        assert!(prompts.lock().unwrap()[0].contains("https://x.example/from-settings"));
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_raw_artifact() {
        let (_dir, config) = setup();
        let pipeline = ExtractionPipeline::new(&config, None);

        let failure = pipeline
            .run_with(&request("posting"), Box::new(StubExtractor::failing()))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::Extraction(_)));
        assert!(failure.raw_path.as_ref().unwrap().exists());
        assert!(failure.structured_path.is_none());
        assert_eq!(
            failure.to_string(),
            "extraction failed via stub: request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_schema_error() {
        let (_dir, config) = setup();
        let db = Database::open_in_memory().unwrap();
        let pipeline = ExtractionPipeline::new(&config, Some(&db));

        let failure = pipeline
            .run_with(
                &request("posting"),
                Box::new(StubExtractor::replying("Sorry, I cannot help with that.")),
            )
            .await
            .unwrap_err();

        match failure.error {
            PipelineError::Schema(e) => assert_eq!(e.raw(), "Sorry, I cannot help with that."),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(job_repo::count(&db).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_posting_rejected_before_any_io() {
        let (dir, config) = setup();
        let pipeline = ExtractionPipeline::new(&config, None);

        let failure = pipeline
            .run_with(&request("   \n"), Box::new(StubExtractor::replying(REPLY)))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::EmptyPosting));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_artifacts_disabled() {
        let (dir, mut config) = setup();
        config.save_artifacts = false;
        let pipeline = ExtractionPipeline::new(&config, None);

        let outcome = pipeline
            .run_with(&request("posting"), Box::new(StubExtractor::replying(REPLY)))
            .await
            .unwrap();

        assert!(outcome.raw_path.is_none());
        assert!(outcome.structured_path.is_none());
        assert!(outcome.record.source_url.starts_with("text:"));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_missing_perplexity_key_fails_after_raw_save() {
        let (_dir, mut config) = setup();
        config.providers.perplexity.api_key_env = "JOBSCOPE_TEST_NO_SUCH_KEY".to_string();
        let pipeline = ExtractionPipeline::new(&config, None);

        let mut req = request("posting");
        req.settings.provider = "perplexity".to_string();

        let failure = pipeline.run(&req).await.unwrap_err();
        assert!(matches!(
            failure.error,
            PipelineError::Extraction(ExtractionError::MissingApiKey { .. })
        ));
        assert!(failure.raw_path.is_some());
    }

    /// Swaps the output directory for a plain file so later writes fail.
    fn block_output_dir(out: std::path::PathBuf) -> impl Fn() + Send + Sync + 'static {
        move || {
            std::fs::remove_dir_all(&out).unwrap();
            std::fs::write(&out, b"not a directory").unwrap();
        }
    }

    #[tokio::test]
    async fn test_stored_job_is_success_when_structured_write_fails() {
        let (_dir, config) = setup();
        let db = Database::open_in_memory().unwrap();
        let pipeline = ExtractionPipeline::new(&config, Some(&db));
        let stub = StubExtractor::replying(REPLY)
            .with_hook(block_output_dir(config.output_directory.clone()));

        let outcome = pipeline
            .run_with(&request("URL: https://x.example/job/7
posting"), Box::new(stub))
            .await
            .unwrap();

        assert!(outcome.job_id.is_some());
        assert!(outcome.structured_path.is_none());
        assert_eq!(job_repo::count(&db).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_database_error_wins_when_both_writes_fail() {
        let (_dir, config) = setup();
        let db = Database::open_in_memory().unwrap();
        let pipeline = ExtractionPipeline::new(&config, Some(&db));
        let block = block_output_dir(config.output_directory.clone());
        let db_in_call = db.clone();
        let stub = StubExtractor::replying(REPLY).with_hook(move || {
            block();
            db_in_call
                .with_conn(|conn| {
                    conn.execute_batch("DROP TABLE job_skills; DROP TABLE jobs;")?;
                    Ok(())
                })
                .unwrap();
        });

        let failure = pipeline
            .run_with(&request("posting"), Box::new(stub))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::Database(_)));
        assert!(failure.raw_path.is_some());
        assert!(failure.structured_path.is_none());
    }
}
