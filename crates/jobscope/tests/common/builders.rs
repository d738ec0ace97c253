//! Builders for job records and model replies.

#![allow(dead_code)]

use serde_json::{json, Value};

use jobscope::model::JobRecord;

/// Builder for canonical `JobRecord`s.
pub struct RecordBuilder {
    record: JobRecord,
}

impl RecordBuilder {
    pub fn new(url: &str) -> Self {
        let mut record = JobRecord::default();
        record.source_url = url.to_string();
        record.extracted_at = "2026-01-01T00:00:00Z".to_string();
        record.metadata.job_title = "Software Engineer".to_string();
        record.company_info.company_name = "Acme".to_string();
        Self { record }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.record.metadata.job_title = title.to_string();
        self
    }

    pub fn extracted_at(mut self, at: &str) -> Self {
        self.record.extracted_at = at.to_string();
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.record.company_info.location_city = city.to_string();
        self.record.company_info.location_full = city.to_string();
        self
    }

    pub fn location_full(mut self, full: &str) -> Self {
        self.record.company_info.location_city.clear();
        self.record.company_info.location_full = full.to_string();
        self
    }

    pub fn languages(mut self, names: &[&str]) -> Self {
        self.record.requirements.technical_skills.programming_languages =
            names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn databases(mut self, names: &[&str]) -> Self {
        self.record.requirements.technical_skills.databases =
            names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> JobRecord {
        self.record
    }
}

/// A reply in the current extraction schema.
pub fn current_reply(url: &str, title: &str, languages: &[&str]) -> String {
    json!({
        "metadata": {
            "job_title": title,
            "department": "Platform",
            "seniority_level": "Senior",
            "job_function": "Backend"
        },
        "company_info": {
            "company_name": "Acme",
            "industry": "Logistics",
            "company_size": "200-500",
            "location_full": "Berlin, Germany",
            "location_city": "Berlin",
            "location_country": "Germany"
        },
        "requirements": {
            "years_experience_min": 5,
            "years_experience_max": 0,
            "technical_skills": {
                "programming_languages": languages,
                "databases": ["PostgreSQL"],
                "cloud_platforms": ["AWS"]
            },
            "soft_skills": ["Communication"]
        },
        "compensation": {
            "salary_min": 90000,
            "salary_max": 110000,
            "salary_currency": "EUR",
            "offers_pto": true
        },
        "work_arrangement": {
            "workplace_type": "hybrid",
            "job_type": "full time"
        },
        "market_signals": {
            "urgency_level": "Standard",
            "interview_rounds": 3
        },
        "extracted_at": "",
        "source_url": url
    })
    .to_string()
}

/// A fenced reply in the first extraction schema revision.
pub fn legacy_reply() -> String {
    let body: Value = json!({
        "metadata": {
            "job_title": "Senior Backend Engineer",
            "department": "",
            "level": ["Senior"],
            "job_type": "Full-time",
            "workplace_type": "Remote"
        },
        "company_info": {
            "company_name": "OLX",
            "industry": ["Marketplace", "Classifieds"],
            "company_size": "1000+",
            "location": "Lisbon, Portugal",
            "remote_policy": "Fully remote within Europe"
        },
        "role_details": {
            "summary": "Build the listings platform.",
            "key_responsibilities": ["Own services"],
            "team_structure": ""
        },
        "requirements": {
            "years_of_experience": "3-5 years",
            "technical_skills": {
                "programming_languages": [
                    { "name": "Go", "level": "expert", "description": "" },
                    { "name": "Python", "level": "", "description": "" }
                ],
                "frameworks": [],
                "databases": [{ "name": "MySQL", "level": "", "description": "" }],
                "cloud_platforms": [{ "name": "AWS", "level": "", "description": "" }],
                "devops_tools": [{ "name": "Terraform", "level": "", "description": "" }],
                "other": []
            },
            "soft_skills": ["Communication"],
            "education": ["BSc Computer Science"],
            "certifications": ["AWS Solutions Architect"],
            "nice_to_have": ["Kafka"]
        },
        "compensation": {
            "salary_range": "€60k - €80k",
            "equity": "Stock options",
            "benefits": ["Health insurance", "25 days vacation", "Learning budget"],
            "bonus_structure": ""
        },
        "application_info": {
            "posted_date": "",
            "application_deadline": "",
            "interview_process": ["Recruiter call", "Take-home assignment", "Pair programming"],
            "time_to_hire": "",
            "contact_info": ""
        },
        "extracted_at": "2025-05-01T10:00:00Z",
        "source_url": ""
    });
    format!("```json\n{}\n```", serde_json::to_string_pretty(&body).unwrap())
}
