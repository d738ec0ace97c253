//! Canonical job record.
//!
//! This is the single shape every extraction reply is normalized into and the
//! shape stored verbatim in `jobs.raw_json`. Field names follow the JSON the
//! extraction prompt asks for.

use serde::{Deserialize, Serialize};

use super::skills::{SkillCategory, TechnicalSkills};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    pub metadata: JobMetadata,
    pub company_info: CompanyInfo,
    pub role_details: RoleDetails,
    pub requirements: Requirements,
    pub compensation: Compensation,
    pub work_arrangement: WorkArrangement,
    pub market_signals: MarketSignals,
    /// RFC 3339 timestamp of the extraction.
    pub extracted_at: String,
    /// Natural key. Unique across the store.
    pub source_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobMetadata {
    pub job_title: String,
    pub department: String,
    /// Junior, Mid, Senior, Staff, Principal, Lead.
    pub seniority_level: String,
    /// Backend, Frontend, FullStack, DevOps, Data.
    pub job_function: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub company_name: String,
    pub industry: String,
    pub company_size: String,
    pub location_full: String,
    pub location_city: String,
    pub location_country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDetails {
    pub summary: String,
    pub key_responsibilities: Vec<String>,
    pub team_structure: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub years_experience_min: i64,
    /// `0` means unbounded or unstated.
    pub years_experience_max: i64,
    pub education_level: String,
    pub requires_specific_degree: bool,
    pub technical_skills: TechnicalSkills,
    pub soft_skills: Vec<String>,
    pub nice_to_have: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compensation {
    pub salary_min: i64,
    pub salary_max: i64,
    pub salary_currency: String,
    pub has_equity: bool,
    pub has_remote_stipend: bool,
    pub benefits: Vec<String>,
    pub offers_visa_sponsorship: bool,
    pub offers_health_insurance: bool,
    pub offers_pto: bool,
    pub offers_professional_development: bool,
    pub offers_401k: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkArrangement {
    /// Remote, Hybrid, On-site.
    pub workplace_type: String,
    /// Full-time, Part-time, Contract, Internship.
    pub job_type: String,
    pub is_remote_friendly: bool,
    pub timezone_requirements: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSignals {
    /// Standard, Urgent, Immediate.
    pub urgency_level: String,
    pub interview_rounds: i64,
    pub has_take_home: bool,
    pub has_pair_programming: bool,
}

impl JobRecord {
    /// All technical skill names in bucket order, empties skipped.
    pub fn flattened_skills(&self) -> Vec<String> {
        self.requirements
            .technical_skills
            .entries()
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// `(category, name)` pairs that make up this record's skill index.
    pub fn skill_index(&self) -> Vec<(SkillCategory, &str)> {
        self.requirements.technical_skills.entries().collect()
    }

    /// Location label used for grouping: city, else full location, else "Unknown".
    pub fn location_label(&self) -> &str {
        let info = &self.company_info;
        [info.location_city.as_str(), info.location_full.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("Unknown")
    }
}
