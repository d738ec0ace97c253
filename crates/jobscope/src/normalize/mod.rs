//! Reconciles a model reply into the canonical [`JobRecord`].
//!
//! Replies come in two revisions of the extraction schema. The first one
//! used free-text ranges, structured skill objects and an
//! `application_info` section; the current one asks for numbers and flags
//! directly. Both are parsed into loosely-typed wire shapes and then
//! canonicalized in a single step, so nothing downstream ever looks at
//! which revision a record came from.

pub mod coerce;
pub mod legacy;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::model::{
    CompanyInfo, Compensation, JobMetadata, JobRecord, MarketSignals, Requirements, RoleDetails,
    SkillCategory, TechnicalSkills, WorkArrangement,
};
use crate::sanitize::{content_key, strip_code_fence};

/// Extraction schema revision a reply was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRevision {
    Legacy,
    Current,
}

impl SchemaRevision {
    /// Detects the revision from the keys a reply carries.
    pub fn detect(doc: &Map<String, Value>) -> Self {
        let has = |section: &str, key: &str| {
            doc.get(section)
                .and_then(Value::as_object)
                .is_some_and(|s| s.contains_key(key))
        };

        let legacy = doc.contains_key("application_info")
            || has("requirements", "years_of_experience")
            || has("metadata", "level")
            || has("compensation", "salary_range")
            || (has("company_info", "location") && !has("company_info", "location_full"));

        if legacy {
            Self::Legacy
        } else {
            Self::Current
        }
    }
}

/// Context the caller knows better than the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext<'a> {
    /// Page address from the extension settings or the `URL:` marker.
    pub source_url: Option<&'a str>,
    /// The posting text that was sent to the model.
    pub posting_text: &'a str,
}

/// Parses and canonicalizes a model reply.
///
/// Fails with [`SchemaError::Mismatch`] when the reply is not a JSON object
/// once code fences are removed. The raw reply is logged and kept on the
/// error.
pub fn normalize(reply: &str, ctx: NormalizeContext<'_>) -> Result<JobRecord, SchemaError> {
    let body = strip_code_fence(reply);

    let doc = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(mismatch(
                format!("expected a JSON object, got {}", json_kind(&other)),
                reply,
            ))
        }
        Err(e) => return Err(mismatch(e.to_string(), reply)),
    };

    let posting = VersionedPosting::from_document(doc).map_err(|e| mismatch(e.to_string(), reply))?;
    log::debug!("Normalizing {:?} extraction reply", posting.revision());

    let mut record = posting.canonicalize();
    apply_identity(&mut record, ctx);
    Ok(record)
}

fn mismatch(reason: String, raw: &str) -> SchemaError {
    log::warn!("Model reply rejected ({}): {}", reason, raw);
    SchemaError::Mismatch {
        reason,
        raw: raw.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fills the natural key and the extraction timestamp.
///
/// A caller-supplied URL always wins over the model's. When neither is
/// present the posting text is hashed so repeated extractions of the same
/// text still land on one row.
fn apply_identity(record: &mut JobRecord, ctx: NormalizeContext<'_>) {
    if let Some(url) = ctx.source_url.map(str::trim).filter(|u| !u.is_empty()) {
        if !record.source_url.is_empty() && record.source_url != url {
            log::debug!(
                "Replacing model source_url '{}' with '{}'",
                record.source_url,
                url
            );
        }
        record.source_url = url.to_string();
    }
    if record.source_url.is_empty() {
        record.source_url = content_key(ctx.posting_text);
    }
    if record.extracted_at.is_empty() {
        record.extracted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
}

/// A reply parsed against the revision it was written for.
#[derive(Debug)]
pub enum VersionedPosting {
    Legacy(LegacyPosting),
    Current(CurrentPosting),
}

impl VersionedPosting {
    pub fn from_document(doc: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let revision = SchemaRevision::detect(&doc);
        let value = Value::Object(doc);
        Ok(match revision {
            SchemaRevision::Legacy => Self::Legacy(serde_json::from_value(value)?),
            SchemaRevision::Current => Self::Current(serde_json::from_value(value)?),
        })
    }

    pub fn revision(&self) -> SchemaRevision {
        match self {
            Self::Legacy(_) => SchemaRevision::Legacy,
            Self::Current(_) => SchemaRevision::Current,
        }
    }

    /// Maps either revision onto the canonical record.
    pub fn canonicalize(self) -> JobRecord {
        match self {
            Self::Legacy(p) => p.canonicalize(),
            Self::Current(p) => p.canonicalize(),
        }
    }
}

/// Six skill buckets as the model sent them: names or `{name, level, ...}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSkills {
    programming_languages: Value,
    frameworks: Value,
    databases: Value,
    cloud_platforms: Value,
    devops_tools: Value,
    other: Value,
}

impl RawSkills {
    fn canonicalize(&self) -> TechnicalSkills {
        let mut skills = TechnicalSkills::default();
        for category in SkillCategory::ALL {
            let raw = match category {
                SkillCategory::ProgrammingLanguage => &self.programming_languages,
                SkillCategory::Framework => &self.frameworks,
                SkillCategory::Database => &self.databases,
                SkillCategory::Cloud => &self.cloud_platforms,
                SkillCategory::Devops => &self.devops_tools,
                SkillCategory::Other => &self.other,
            };
            *skills.bucket_mut(category) = coerce::names(raw);
        }
        skills
    }
}

// ---------------------------------------------------------------------------
// Current revision
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CurrentPosting {
    #[serde(deserialize_with = "coerce::section")]
    metadata: CurrentMetadata,
    #[serde(deserialize_with = "coerce::section")]
    company_info: CurrentCompany,
    #[serde(deserialize_with = "coerce::section")]
    role_details: RawRole,
    #[serde(deserialize_with = "coerce::section")]
    requirements: CurrentRequirements,
    #[serde(deserialize_with = "coerce::section")]
    compensation: CurrentCompensation,
    #[serde(deserialize_with = "coerce::section")]
    work_arrangement: CurrentWork,
    #[serde(deserialize_with = "coerce::section")]
    market_signals: CurrentSignals,
    extracted_at: Value,
    source_url: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentMetadata {
    job_title: Value,
    department: Value,
    seniority_level: Value,
    job_function: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentCompany {
    company_name: Value,
    industry: Value,
    company_size: Value,
    location_full: Value,
    location_city: Value,
    location_country: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRole {
    summary: Value,
    key_responsibilities: Value,
    team_structure: Value,
}

impl RawRole {
    fn canonicalize(&self) -> RoleDetails {
        RoleDetails {
            summary: coerce::text(&self.summary),
            key_responsibilities: coerce::list(&self.key_responsibilities),
            team_structure: coerce::text(&self.team_structure),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentRequirements {
    years_experience_min: Value,
    years_experience_max: Value,
    education_level: Value,
    requires_specific_degree: Value,
    #[serde(deserialize_with = "coerce::section")]
    technical_skills: RawSkills,
    soft_skills: Value,
    nice_to_have: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentCompensation {
    salary_min: Value,
    salary_max: Value,
    salary_currency: Value,
    has_equity: Value,
    has_remote_stipend: Value,
    benefits: Value,
    offers_visa_sponsorship: Value,
    offers_health_insurance: Value,
    offers_pto: Value,
    offers_professional_development: Value,
    offers_401k: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentWork {
    workplace_type: Value,
    job_type: Value,
    is_remote_friendly: Value,
    timezone_requirements: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentSignals {
    urgency_level: Value,
    interview_rounds: Value,
    has_take_home: Value,
    has_pair_programming: Value,
}

impl CurrentPosting {
    fn canonicalize(self) -> JobRecord {
        let m = &self.metadata;
        let c = &self.company_info;
        let r = &self.requirements;
        let p = &self.compensation;
        let w = &self.work_arrangement;
        let s = &self.market_signals;

        let workplace_type = canonical_workplace(&coerce::text(&w.workplace_type));

        JobRecord {
            metadata: JobMetadata {
                job_title: coerce::text(&m.job_title),
                department: coerce::text(&m.department),
                seniority_level: coerce::first_text(&m.seniority_level),
                job_function: coerce::text(&m.job_function),
            },
            company_info: CompanyInfo {
                company_name: coerce::text(&c.company_name),
                industry: coerce::text(&c.industry),
                company_size: coerce::text(&c.company_size),
                location_full: coerce::text(&c.location_full),
                location_city: coerce::text(&c.location_city),
                location_country: coerce::text(&c.location_country),
            },
            role_details: self.role_details.canonicalize(),
            requirements: Requirements {
                years_experience_min: coerce::int(&r.years_experience_min),
                years_experience_max: coerce::int(&r.years_experience_max),
                education_level: coerce::first_text(&r.education_level),
                requires_specific_degree: coerce::flag(&r.requires_specific_degree),
                technical_skills: r.technical_skills.canonicalize(),
                soft_skills: coerce::names(&r.soft_skills),
                nice_to_have: coerce::list(&r.nice_to_have),
            },
            compensation: Compensation {
                salary_min: coerce::int(&p.salary_min),
                salary_max: coerce::int(&p.salary_max),
                salary_currency: coerce::text(&p.salary_currency).to_uppercase(),
                has_equity: coerce::flag(&p.has_equity),
                has_remote_stipend: coerce::flag(&p.has_remote_stipend),
                benefits: coerce::list(&p.benefits),
                offers_visa_sponsorship: coerce::flag(&p.offers_visa_sponsorship),
                offers_health_insurance: coerce::flag(&p.offers_health_insurance),
                offers_pto: coerce::flag(&p.offers_pto),
                offers_professional_development: coerce::flag(&p.offers_professional_development),
                offers_401k: coerce::flag(&p.offers_401k),
            },
            work_arrangement: WorkArrangement {
                is_remote_friendly: coerce::flag(&w.is_remote_friendly) || workplace_type == "Remote",
                workplace_type,
                job_type: canonical_job_type(&coerce::text(&w.job_type)),
                timezone_requirements: coerce::text(&w.timezone_requirements),
            },
            market_signals: MarketSignals {
                urgency_level: canonical_urgency(&coerce::text(&s.urgency_level)),
                interview_rounds: coerce::int(&s.interview_rounds),
                has_take_home: coerce::flag(&s.has_take_home),
                has_pair_programming: coerce::flag(&s.has_pair_programming),
            },
            extracted_at: coerce::text(&self.extracted_at),
            source_url: coerce::text(&self.source_url),
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy revision
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LegacyPosting {
    #[serde(deserialize_with = "coerce::section")]
    metadata: LegacyMetadata,
    #[serde(deserialize_with = "coerce::section")]
    company_info: LegacyCompany,
    #[serde(deserialize_with = "coerce::section")]
    role_details: RawRole,
    #[serde(deserialize_with = "coerce::section")]
    requirements: LegacyRequirements,
    #[serde(deserialize_with = "coerce::section")]
    compensation: LegacyCompensation,
    #[serde(deserialize_with = "coerce::section")]
    application_info: LegacyApplication,
    extracted_at: Value,
    source_url: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyMetadata {
    job_title: Value,
    department: Value,
    level: Value,
    job_type: Value,
    workplace_type: Value,
    job_function: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyCompany {
    company_name: Value,
    industry: Value,
    company_size: Value,
    location: Value,
    remote_policy: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyRequirements {
    years_of_experience: Value,
    #[serde(deserialize_with = "coerce::section")]
    technical_skills: RawSkills,
    soft_skills: Value,
    education: Value,
    certifications: Value,
    nice_to_have: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyCompensation {
    salary_range: Value,
    equity: Value,
    benefits: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyApplication {
    interview_process: Value,
}

impl LegacyPosting {
    fn canonicalize(self) -> JobRecord {
        let m = &self.metadata;
        let c = &self.company_info;
        let r = &self.requirements;
        let p = &self.compensation;

        let location_full = coerce::text(&c.location);
        let (location_city, location_country) = legacy::split_location(&location_full);

        let (years_min, years_max) = match &r.years_of_experience {
            Value::Number(_) => {
                let n = coerce::int(&r.years_of_experience);
                (n, n)
            }
            other => legacy::parse_experience_range(&coerce::text(other)),
        };

        let mut nice_to_have = coerce::list(&r.nice_to_have);
        nice_to_have.extend(coerce::list(&r.certifications));

        let salary = legacy::parse_salary_range(&coerce::text(&p.salary_range));
        let benefits = coerce::list(&p.benefits);
        let perks = legacy::benefit_flags(&benefits);

        let steps = coerce::list(&self.application_info.interview_process);
        let (interview_rounds, has_take_home, has_pair_programming) =
            legacy::interview_signals(&steps);

        let workplace_type = canonical_workplace(&coerce::text(&m.workplace_type));
        let remote_policy = coerce::text(&c.remote_policy).to_lowercase();

        JobRecord {
            metadata: JobMetadata {
                job_title: coerce::text(&m.job_title),
                department: coerce::text(&m.department),
                seniority_level: coerce::first_text(&m.level),
                job_function: coerce::text(&m.job_function),
            },
            company_info: CompanyInfo {
                company_name: coerce::text(&c.company_name),
                industry: coerce::text(&c.industry),
                company_size: coerce::text(&c.company_size),
                location_full,
                location_city,
                location_country,
            },
            role_details: self.role_details.canonicalize(),
            requirements: Requirements {
                years_experience_min: years_min,
                years_experience_max: years_max,
                education_level: coerce::first_text(&r.education),
                requires_specific_degree: false,
                technical_skills: r.technical_skills.canonicalize(),
                soft_skills: coerce::names(&r.soft_skills),
                nice_to_have: coerce::dedup(nice_to_have),
            },
            compensation: Compensation {
                salary_min: salary.min,
                salary_max: salary.max,
                salary_currency: salary.currency,
                has_equity: legacy::equity_offered(&coerce::text(&p.equity)) || perks.equity,
                has_remote_stipend: perks.remote_stipend,
                benefits,
                offers_visa_sponsorship: perks.visa_sponsorship,
                offers_health_insurance: perks.health_insurance,
                offers_pto: perks.pto,
                offers_professional_development: perks.professional_development,
                offers_401k: perks.retirement,
            },
            work_arrangement: WorkArrangement {
                is_remote_friendly: remote_policy.contains("remote") || workplace_type == "Remote",
                workplace_type,
                job_type: canonical_job_type(&coerce::text(&m.job_type)),
                timezone_requirements: String::new(),
            },
            market_signals: MarketSignals {
                urgency_level: String::new(),
                interview_rounds,
                has_take_home,
                has_pair_programming,
            },
            extracted_at: coerce::text(&self.extracted_at),
            source_url: coerce::text(&self.source_url),
        }
    }
}

// ---------------------------------------------------------------------------
// Value canonicalization
// ---------------------------------------------------------------------------

/// Remote, Hybrid or On-site. Unknown values are kept as given.
pub fn canonical_workplace(value: &str) -> String {
    let v = value.trim().to_lowercase();
    let canonical = if v.contains("hybrid") {
        "Hybrid"
    } else if v.contains("remote") {
        "Remote"
    } else if v.contains("on-site")
        || v.contains("onsite")
        || v.contains("on site")
        || v.contains("in office")
        || v.contains("in-office")
    {
        "On-site"
    } else {
        return value.trim().to_string();
    };
    canonical.to_string()
}

/// Full-time, Part-time, Contract or Internship. Unknown values are kept.
pub fn canonical_job_type(value: &str) -> String {
    let v = value.trim().to_lowercase();
    let canonical = if v.contains("full") {
        "Full-time"
    } else if v.contains("part") {
        "Part-time"
    } else if v.contains("contract") || v.contains("freelance") {
        "Contract"
    } else if v.contains("intern") {
        "Internship"
    } else {
        return value.trim().to_string();
    };
    canonical.to_string()
}

/// Standard, Urgent or Immediate. Unknown values are kept.
pub fn canonical_urgency(value: &str) -> String {
    let v = value.trim().to_lowercase();
    let canonical = match v.as_str() {
        "standard" | "normal" | "regular" => "Standard",
        "urgent" | "high" => "Urgent",
        "immediate" | "asap" | "immediately" => "Immediate",
        _ => return value.trim().to_string(),
    };
    canonical.to_string()
}
