//! Extraction prompt.
//!
//! The prompt is a pure function of its inputs so identical postings always
//! produce identical requests.

const INSTRUCTIONS: &str = r#"Convert the job posting below into a single JSON object.
Only record what the posting states explicitly. Leave a field empty ("", 0, false or []) when the posting is silent about it.

Rules:
- years_experience_min / years_experience_max are integers. "5+ years" is min 5, max 0. "3-5 years" is min 3, max 5. Do not guess.
- job_type is one of "Full-time", "Part-time", "Contract", "Internship".
- workplace_type is one of "Remote", "Hybrid", "On-site".
- urgency_level is one of "Standard", "Urgent", "Immediate".
- Every skill list holds short names only ("Go", "PostgreSQL", "Kubernetes").
- soft_skills are short keywords ("Communication", "Mentoring"), never sentences.
- salary_min / salary_max are yearly integers in salary_currency (ISO code such as "USD").
"#;

const SCHEMA: &str = r#"{
  "metadata": {
    "job_title": "",
    "department": "",
    "seniority_level": "Junior | Mid | Senior | Staff | Principal | Lead",
    "job_function": "Backend | Frontend | FullStack | DevOps | Data"
  },
  "company_info": {
    "company_name": "",
    "industry": "",
    "company_size": "",
    "location_full": "",
    "location_city": "",
    "location_country": ""
  },
  "role_details": {
    "summary": "one or two sentences",
    "key_responsibilities": [],
    "team_structure": ""
  },
  "requirements": {
    "years_experience_min": 0,
    "years_experience_max": 0,
    "education_level": "",
    "requires_specific_degree": false,
    "technical_skills": {
      "programming_languages": [],
      "frameworks": [],
      "databases": [],
      "cloud_platforms": [],
      "devops_tools": [],
      "other": []
    },
    "soft_skills": [],
    "nice_to_have": []
  },
  "compensation": {
    "salary_min": 0,
    "salary_max": 0,
    "salary_currency": "",
    "has_equity": false,
    "has_remote_stipend": false,
    "benefits": [],
    "offers_visa_sponsorship": false,
    "offers_health_insurance": false,
    "offers_pto": false,
    "offers_professional_development": false,
    "offers_401k": false
  },
  "work_arrangement": {
    "workplace_type": "",
    "job_type": "",
    "is_remote_friendly": false,
    "timezone_requirements": ""
  },
  "market_signals": {
    "urgency_level": "Standard",
    "interview_rounds": 0,
    "has_take_home": false,
    "has_pair_programming": false
  },"#;

/// Builds the prompt for one posting.
///
/// `extracted_at` and `source_url` are echoed into the requested document
/// so the reply carries its own identity fields.
pub fn build_prompt(posting_text: &str, source_url: &str, extracted_at: &str) -> String {
    let mut prompt = String::with_capacity(
        INSTRUCTIONS.len() + SCHEMA.len() + posting_text.len() + 256,
    );
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\nJob posting:\n");
    prompt.push_str(posting_text.trim());
    prompt.push_str("\n\nReturn exactly this structure:\n");
    prompt.push_str(SCHEMA);
    prompt.push_str(&format!(
        "\n  \"extracted_at\": {},\n  \"source_url\": {}\n}}\n",
        json_string(extracted_at),
        json_string(source_url)
    ));
    prompt.push_str("\nReturn ONLY the JSON object, with no commentary and no code fences.");
    prompt
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
