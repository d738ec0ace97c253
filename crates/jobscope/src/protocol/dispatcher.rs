//! Routes decoded frames to the extraction pipeline or the job store.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::messages::{
    parse_inbound, ApiRequest, ApiResponse, ExtractRequest, ExtractResponse, Inbound, Response,
};
use super::DispatchError;
use crate::config::Config;
use crate::db::job_repo::{self, JobFilter};
use crate::db::{analytics_repo, Database, DatabaseError};
use crate::pipeline::ExtractionPipeline;

/// Serves one frame at a time against a shared config and store.
///
/// The store is optional: when it could not be opened, extraction still
/// runs (without persisting) and every data action reports
/// "database not initialized".
pub struct Dispatcher {
    config: Config,
    db: Option<Database>,
}

impl Dispatcher {
    pub fn new(config: Config, db: Option<Database>) -> Self {
        Self { config, db }
    }

    /// Decodes and serves one frame body. Never fails: every problem
    /// becomes an error reply.
    pub async fn dispatch(&self, body: &[u8]) -> Response {
        match parse_inbound(body) {
            Ok(Inbound::Api(request)) => self.handle_api(&request).into(),
            Ok(Inbound::Extract(request)) => self.handle_extract(&request).await.into(),
            Err(e) => {
                log::warn!("Rejected inbound frame: {}", e);
                ApiResponse::err(e.to_string()).into()
            }
        }
    }

    pub fn handle_api(&self, request: &ApiRequest) -> ApiResponse {
        let action = request.action.trim();
        let _span = tracing::info_span!("api", action = action).entered();

        match self.route(action, &request.data) {
            Ok(payload) => ApiResponse::ok(payload),
            Err(e) => {
                log::warn!("Action '{}' failed: {}", action, e);
                ApiResponse::err(e.to_string())
            }
        }
    }

    pub async fn handle_extract(&self, request: &ExtractRequest) -> ExtractResponse {
        log::info!(
            "Received {} bytes of text, provider '{}'",
            request.text.len(),
            request.settings.provider
        );

        let pipeline = ExtractionPipeline::new(&self.config, self.db.as_ref());
        match pipeline.run(request).await {
            Ok(outcome) => ExtractResponse::success(
                display_path(outcome.raw_path.as_deref()),
                outcome
                    .structured_path
                    .as_deref()
                    .map(|p| p.display().to_string()),
            ),
            Err(failure) => {
                log::error!("Extraction failed: {}", failure);
                ExtractResponse::failure(
                    display_path(failure.raw_path.as_deref()),
                    failure
                        .structured_path
                        .as_deref()
                        .map(|p| p.display().to_string()),
                    failure.to_string(),
                )
            }
        }
    }

    fn route(&self, action: &str, data: &Map<String, Value>) -> Result<Value, DispatchError> {
        if action == "ping" {
            return Ok(json!({ "ok": true }));
        }

        let db = self.db.as_ref().ok_or(DispatchError::DatabaseUnavailable)?;
        let limits = &self.config.analytics;

        match action {
            "listJobs" => {
                let filter = JobFilter {
                    status: optional_str(data, "status").map(str::to_string),
                    limit: Some(optional_limit(data, "limit")?.unwrap_or(limits.list_page_size)),
                    offset: optional_limit(data, "offset")?,
                };
                let jobs = job_repo::list(db, &filter)?;
                Ok(json!({ "jobs": to_value(jobs)? }))
            }
            "searchJobs" => {
                let query = optional_str(data, "query")
                    .filter(|q| !q.trim().is_empty())
                    .ok_or(DispatchError::MissingField("query"))?;
                let jobs = job_repo::search(db, query.trim())?;
                Ok(json!({ "jobs": to_value(jobs)? }))
            }
            "getJob" => {
                let id = job_id(data).ok_or(DispatchError::InvalidField("id"))?;
                let job = job_repo::find_by_id(db, id)?.ok_or(DatabaseError::NotFound(id))?;
                let record = &job.record;
                Ok(json!({
                    "job": {
                        "id": job.id,
                        "title": record.metadata.job_title,
                        "company": record.company_info.company_name,
                        "location": record.company_info.location_full,
                        "url": record.source_url,
                        "status": job.status,
                        "notes": job.notes,
                        "rating": job.rating,
                        "appliedAt": job.applied_at,
                        "createdAt": job.created_at,
                        "updatedAt": job.updated_at,
                        "skills": record.flattened_skills(),
                        "extracted": to_value(record)?,
                    }
                }))
            }
            "updateJob" => {
                let id = job_id(data).ok_or(DispatchError::MissingField("id"))?;
                self.update_job(db, id, data)?;
                Ok(json!({ "updated": true }))
            }
            "deleteJob" => {
                let id = job_id(data).ok_or(DispatchError::MissingField("id"))?;
                job_repo::delete(db, id)?;
                Ok(json!({ "deleted": true }))
            }
            "getAnalytics" => {
                let overview = analytics_repo::overview(db, limits.overview_limits())?;
                to_value(overview)
            }
            "getSkillLocations" => {
                let skill = optional_str(data, "skill")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(DispatchError::MissingField("skill"))?;
                let limit = optional_limit(data, "limit")?.unwrap_or(limits.focus_locations);
                let locations = analytics_repo::skill_locations(db, skill, limit)?;
                Ok(json!({ "skill": skill, "locations": to_value(locations)? }))
            }
            "getSkillPairs" => {
                let limit = optional_limit(data, "limit")?.unwrap_or(limits.skill_pairs);
                let pairs = analytics_repo::skill_pairs(db, limit)?;
                Ok(json!({ "pairs": to_value(pairs)? }))
            }
            "getTopTitles" => {
                let limit = optional_limit(data, "limit")?.unwrap_or(limits.top_titles);
                let titles = analytics_repo::top_job_titles(db, limit)?;
                Ok(json!({ "titles": to_value(titles)? }))
            }
            "getSkillCategories" => {
                let categories = analytics_repo::category_breakdown(db)?;
                Ok(json!({ "categories": to_value(categories)? }))
            }
            other => Err(DispatchError::UnknownAction(other.to_string())),
        }
    }

    /// Applies whichever of status, notes and rating are present.
    ///
    /// Any non-empty status string is stored as-is; the five pipeline
    /// stages are the only ones the funnel counts.
    fn update_job(
        &self,
        db: &Database,
        id: i64,
        data: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        let status = optional_str(data, "status")
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let notes = optional_str(data, "notes");
        let rating = match data.get("rating") {
            None | Some(Value::Null) => None,
            Some(value) => Some(integer(value).ok_or(DispatchError::InvalidField("rating"))?),
        };

        if status.is_none() && notes.is_none() && rating.is_none() {
            // Nothing to change, but an unknown id is still an error.
            job_repo::find_by_id(db, id)?.ok_or(DatabaseError::NotFound(id))?;
            return Ok(());
        }

        if let Some(status) = status {
            job_repo::update_status(db, id, status)?;
        }
        if let Some(notes) = notes {
            job_repo::update_notes(db, id, notes)?;
        }
        if let Some(rating) = rating {
            job_repo::update_rating(db, id, rating)?;
        }
        Ok(())
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    Ok(serde_json::to_value(value)?)
}

fn display_path(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

fn optional_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

/// Whole numbers only; the extension sends ids as JSON numbers.
fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn job_id(data: &Map<String, Value>) -> Option<i64> {
    data.get("id").and_then(integer)
}

fn optional_limit(data: &Map<String, Value>, key: &'static str) -> Result<Option<u32>, DispatchError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => integer(value)
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(DispatchError::InvalidField(key)),
    }
}
