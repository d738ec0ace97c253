//! Job repository: upsert, CRUD and the derived skill index.

use chrono::{SecondsFormat, Utc};
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};
use crate::model::{JobRecord, JobStatus, SkillEntry};

/// Maximum rows returned by [`search`].
pub const SEARCH_LIMIT: u32 = 50;

/// Default page size for [`list`].
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A job as listed in the extension popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub workplace_type: String,
    pub level: String,
    pub department: String,
    /// "min-max CUR", empty when no salary was extracted.
    pub salary_range: String,
    pub status: String,
    pub extracted_at: String,
    pub url: String,
}

impl JobSummary {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let salary_min: i64 = row.get("salary_min")?;
        let salary_max: i64 = row.get("salary_max")?;
        let currency: String = row.get("salary_currency")?;
        Ok(Self {
            id: row.get("id")?,
            title: row.get("job_title")?,
            company: row.get("company_name")?,
            location: row.get("location_full")?,
            job_type: row.get("job_type")?,
            workplace_type: row.get("workplace_type")?,
            level: row.get("seniority_level")?,
            department: row.get("department")?,
            salary_range: format_salary(salary_min, salary_max, &currency),
            status: row.get("status")?,
            extracted_at: row.get("extracted_at")?,
            url: row.get("source_url")?,
        })
    }
}

fn format_salary(min: i64, max: i64, currency: &str) -> String {
    if min == 0 && max == 0 {
        return String::new();
    }
    format!("{}-{} {}", min, max, currency).trim_end().to_string()
}

const SUMMARY_COLUMNS: &str = "id, job_title, company_name, location_full, job_type, \
     workplace_type, seniority_level, department, salary_min, salary_max, salary_currency, \
     status, extracted_at, source_url";

/// A stored job with its user annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub id: i64,
    pub record: JobRecord,
    pub status: String,
    pub notes: String,
    pub rating: i64,
    pub applied_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing parameters. An empty or absent status means all rows.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Upserts a record by `source_url` and rebuilds its skill index.
///
/// Runs in one transaction: either the job row and its complete skill set
/// are written, or nothing is. A re-save refreshes every extracted column
/// and `raw_json` but leaves status, notes, rating and `applied_at` alone.
pub fn save(db: &Database, record: &JobRecord) -> Result<i64, DatabaseError> {
    let raw_json = serde_json::to_string(record)?;

    db.with_tx(|tx| {
        let id = upsert_job(tx, record, &raw_json)?;
        replace_skills(tx, id, record)?;

        log::info!(
            "Saved job {} ({} skills) for {}",
            id,
            record.skill_index().len(),
            record.source_url
        );
        Ok(id)
    })
}

fn upsert_job(conn: &Connection, r: &JobRecord, raw_json: &str) -> Result<i64, DatabaseError> {
    let m = &r.metadata;
    let c = &r.company_info;
    let q = &r.requirements;
    let p = &r.compensation;
    let w = &r.work_arrangement;
    let s = &r.market_signals;
    let ts = now();

    let id = conn.query_row(
        "INSERT INTO jobs (
            source_url, extracted_at,
            job_title, department, seniority_level, job_function,
            company_name, industry, company_size, location_full, location_city, location_country,
            summary, team_structure,
            years_experience_min, years_experience_max, education_level, requires_specific_degree,
            salary_min, salary_max, salary_currency, has_equity, has_remote_stipend,
            offers_visa_sponsorship, offers_health_insurance, offers_pto,
            offers_professional_development, offers_401k,
            workplace_type, job_type, is_remote_friendly, timezone_requirements,
            urgency_level, interview_rounds, has_take_home, has_pair_programming,
            raw_json, created_at, updated_at
        ) VALUES (
            :source_url, :extracted_at,
            :job_title, :department, :seniority_level, :job_function,
            :company_name, :industry, :company_size, :location_full, :location_city, :location_country,
            :summary, :team_structure,
            :years_min, :years_max, :education_level, :requires_degree,
            :salary_min, :salary_max, :salary_currency, :has_equity, :has_remote_stipend,
            :visa, :health, :pto,
            :prof_dev, :k401,
            :workplace_type, :job_type, :remote_friendly, :timezone,
            :urgency, :interview_rounds, :take_home, :pairing,
            :raw_json, :now, :now
        )
        ON CONFLICT(source_url) DO UPDATE SET
            extracted_at = excluded.extracted_at,
            job_title = excluded.job_title,
            department = excluded.department,
            seniority_level = excluded.seniority_level,
            job_function = excluded.job_function,
            company_name = excluded.company_name,
            industry = excluded.industry,
            company_size = excluded.company_size,
            location_full = excluded.location_full,
            location_city = excluded.location_city,
            location_country = excluded.location_country,
            summary = excluded.summary,
            team_structure = excluded.team_structure,
            years_experience_min = excluded.years_experience_min,
            years_experience_max = excluded.years_experience_max,
            education_level = excluded.education_level,
            requires_specific_degree = excluded.requires_specific_degree,
            salary_min = excluded.salary_min,
            salary_max = excluded.salary_max,
            salary_currency = excluded.salary_currency,
            has_equity = excluded.has_equity,
            has_remote_stipend = excluded.has_remote_stipend,
            offers_visa_sponsorship = excluded.offers_visa_sponsorship,
            offers_health_insurance = excluded.offers_health_insurance,
            offers_pto = excluded.offers_pto,
            offers_professional_development = excluded.offers_professional_development,
            offers_401k = excluded.offers_401k,
            workplace_type = excluded.workplace_type,
            job_type = excluded.job_type,
            is_remote_friendly = excluded.is_remote_friendly,
            timezone_requirements = excluded.timezone_requirements,
            urgency_level = excluded.urgency_level,
            interview_rounds = excluded.interview_rounds,
            has_take_home = excluded.has_take_home,
            has_pair_programming = excluded.has_pair_programming,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        RETURNING id",
        named_params! {
            ":source_url": r.source_url,
            ":extracted_at": r.extracted_at,
            ":job_title": m.job_title,
            ":department": m.department,
            ":seniority_level": m.seniority_level,
            ":job_function": m.job_function,
            ":company_name": c.company_name,
            ":industry": c.industry,
            ":company_size": c.company_size,
            ":location_full": c.location_full,
            ":location_city": c.location_city,
            ":location_country": c.location_country,
            ":summary": r.role_details.summary,
            ":team_structure": r.role_details.team_structure,
            ":years_min": q.years_experience_min,
            ":years_max": q.years_experience_max,
            ":education_level": q.education_level,
            ":requires_degree": q.requires_specific_degree,
            ":salary_min": p.salary_min,
            ":salary_max": p.salary_max,
            ":salary_currency": p.salary_currency,
            ":has_equity": p.has_equity,
            ":has_remote_stipend": p.has_remote_stipend,
            ":visa": p.offers_visa_sponsorship,
            ":health": p.offers_health_insurance,
            ":pto": p.offers_pto,
            ":prof_dev": p.offers_professional_development,
            ":k401": p.offers_401k,
            ":workplace_type": w.workplace_type,
            ":job_type": w.job_type,
            ":remote_friendly": w.is_remote_friendly,
            ":timezone": w.timezone_requirements,
            ":urgency": s.urgency_level,
            ":interview_rounds": s.interview_rounds,
            ":take_home": s.has_take_home,
            ":pairing": s.has_pair_programming,
            ":raw_json": raw_json,
            ":now": ts,
        },
        |row| row.get(0),
    )?;
    Ok(id)
}

fn replace_skills(conn: &Connection, job_id: i64, record: &JobRecord) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM job_skills WHERE job_id = ?1", params![job_id])?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO job_skills (job_id, skill_name, skill_category, is_required)
         VALUES (?1, ?2, ?3, 1)",
    )?;
    for (category, name) in record.skill_index() {
        stmt.execute(params![job_id, name, category.as_str()])?;
    }
    Ok(())
}

/// Finds a job by id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<StoredJob>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT raw_json, status, notes, rating, applied_at, created_at, updated_at
                 FROM jobs WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((raw_json, status, notes, rating, applied_at, created_at, updated_at)) = row
        else {
            return Ok(None);
        };

        let record: JobRecord = serde_json::from_str(&raw_json)
            .map_err(|e| DatabaseError::CorruptPayload { id, source: e })?;

        Ok(Some(StoredJob {
            id,
            record,
            status,
            notes,
            rating,
            applied_at,
            created_at,
            updated_at,
        }))
    })
}

/// Lists jobs newest-extracted first, optionally filtered by status.
pub fn list(db: &Database, filter: &JobFilter) -> Result<Vec<JobSummary>, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status.as_deref().map(str::trim) {
            if !status.is_empty() {
                conditions.push(format!("status = ?{}", param_values.len() + 1));
                param_values.push(Box::new(status.to_string()));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = i64::from(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE));
        let offset = i64::from(filter.offset.unwrap_or(0));
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let sql = format!(
            "SELECT {} FROM jobs {} ORDER BY extracted_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            SUMMARY_COLUMNS,
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), JobSummary::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Substring search over title, company and location.
///
/// Uses SQLite `LIKE`, so ASCII matching is case-insensitive.
pub fn search(db: &Database, query: &str) -> Result<Vec<JobSummary>, DatabaseError> {
    db.with_conn(|conn| {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            "SELECT {} FROM jobs
             WHERE job_title LIKE ?1 OR company_name LIKE ?1 OR location_full LIKE ?1
             ORDER BY extracted_at DESC, id DESC LIMIT ?2",
            SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![pattern, SEARCH_LIMIT], JobSummary::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Total number of stored jobs.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
        Ok(count)
    })
}

fn ensure_updated(changed: usize, id: i64) -> Result<(), DatabaseError> {
    if changed == 0 {
        Err(DatabaseError::NotFound(id))
    } else {
        Ok(())
    }
}

/// Sets the pipeline status. Moving to `applied` stamps `applied_at` the
/// first time only.
pub fn update_status(db: &Database, id: i64, status: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let ts = now();
        let changed = conn.execute(
            "UPDATE jobs SET
                status = ?2,
                applied_at = CASE WHEN ?2 = ?4 AND applied_at IS NULL THEN ?3 ELSE applied_at END,
                updated_at = ?3
             WHERE id = ?1",
            params![id, status, ts, JobStatus::Applied.as_str()],
        )?;
        ensure_updated(changed, id)
    })
}

pub fn update_notes(db: &Database, id: i64, notes: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET notes = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, notes, now()],
        )?;
        ensure_updated(changed, id)
    })
}

pub fn update_rating(db: &Database, id: i64, rating: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET rating = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, rating, now()],
        )?;
        ensure_updated(changed, id)
    })
}

/// Deletes a job; its skill rows go with it via the foreign key cascade.
pub fn delete(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        ensure_updated(changed, id)
    })
}

/// Skill index rows of one job, in insertion order.
pub fn skills_for_job(db: &Database, job_id: i64) -> Result<Vec<SkillEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT job_id, skill_name, skill_category, is_required
             FROM job_skills WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok(SkillEntry {
                    job_id: row.get(0)?,
                    skill_name: row.get(1)?,
                    category: row.get(2)?,
                    is_required: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    pub(crate) fn sample_record(url: &str) -> JobRecord {
        let mut r = JobRecord::default();
        r.source_url = url.to_string();
        r.extracted_at = "2026-01-01T00:00:00Z".to_string();
        r.metadata.job_title = "Backend Engineer".to_string();
        r.company_info.company_name = "Acme".to_string();
        r.company_info.location_full = "Lisbon, Portugal".to_string();
        r.company_info.location_city = "Lisbon".to_string();
        r.compensation.salary_min = 60_000;
        r.compensation.salary_max = 80_000;
        r.compensation.salary_currency = "EUR".to_string();
        let skills = &mut r.requirements.technical_skills;
        skills.programming_languages = vec!["Go".to_string(), "Rust".to_string()];
        skills.databases = vec!["PostgreSQL".to_string()];
        skills.cloud_platforms = vec!["AWS".to_string(), "".to_string()];
        r
    }

    fn count_rows(db: &Database, sql: &str) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_save_and_find_round_trip() {
        let db = test_db();
        let record = sample_record("https://jobs.example/1");
        let id = save(&db, &record).unwrap();

        let stored = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(stored.record, record);
        assert_eq!(stored.status, "saved");
        assert_eq!(stored.notes, "");
        assert_eq!(stored.rating, 0);
        assert!(stored.applied_at.is_none());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, 42).unwrap().is_none());
    }

    #[test]
    fn test_resave_updates_in_place() {
        let db = test_db();
        let mut record = sample_record("https://jobs.example/1");
        let first = save(&db, &record).unwrap();

        record.metadata.job_title = "Staff Engineer".to_string();
        let second = save(&db, &record).unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&db).unwrap(), 1);
        let rows = list(&db, &JobFilter::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Staff Engineer");
    }

    #[test]
    fn test_resave_keeps_annotations() {
        let db = test_db();
        let record = sample_record("https://jobs.example/1");
        let id = save(&db, &record).unwrap();
        update_status(&db, id, "interview").unwrap();
        update_notes(&db, id, "call on Monday").unwrap();
        update_rating(&db, id, 4).unwrap();

        save(&db, &record).unwrap();

        let stored = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(stored.status, "interview");
        assert_eq!(stored.notes, "call on Monday");
        assert_eq!(stored.rating, 4);
    }

    #[test]
    fn test_skill_index_rebuilt_on_save() {
        let db = test_db();
        let mut record = sample_record("https://jobs.example/1");
        let id = save(&db, &record).unwrap();
        // Go, Rust, PostgreSQL, AWS; the empty cloud entry is skipped.
        assert_eq!(skills_for_job(&db, id).unwrap().len(), 4);

        record.requirements.technical_skills.programming_languages = vec!["Python".to_string()];
        record.requirements.technical_skills.cloud_platforms.clear();
        save(&db, &record).unwrap();

        let skills = skills_for_job(&db, id).unwrap();
        let names: Vec<_> = skills.iter().map(|s| s.skill_name.as_str()).collect();
        assert_eq!(names, vec!["Python", "PostgreSQL"]);
        assert_eq!(skills[0].category, "programming_language");
        assert!(skills.iter().all(|s| s.is_required));
    }

    #[test]
    fn test_save_rolls_back_on_failure() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_skill BEFORE INSERT ON job_skills
                 WHEN NEW.skill_name = 'Boom'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let mut record = sample_record("https://jobs.example/boom");
        record.requirements.technical_skills.other = vec!["Boom".to_string()];
        assert!(save(&db, &record).is_err());

        assert_eq!(count(&db).unwrap(), 0);
        assert_eq!(count_rows(&db, "SELECT COUNT(*) FROM job_skills"), 0);
    }

    #[test]
    fn test_list_orders_and_paginates() {
        let db = test_db();
        for day in 1..=5 {
            let mut record = sample_record(&format!("https://jobs.example/{}", day));
            record.extracted_at = format!("2026-01-0{}T00:00:00Z", day);
            save(&db, &record).unwrap();
        }

        let page = list(
            &db,
            &JobFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].url, "https://jobs.example/4");
        assert_eq!(page[1].url, "https://jobs.example/3");
        assert_eq!(page[0].salary_range, "60000-80000 EUR");
    }

    #[test]
    fn test_list_with_status_filter() {
        let db = test_db();
        let a = save(&db, &sample_record("https://jobs.example/a")).unwrap();
        save(&db, &sample_record("https://jobs.example/b")).unwrap();
        update_status(&db, a, "applied").unwrap();

        let applied = list(
            &db,
            &JobFilter {
                status: Some("applied".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].id, a);

        let all = list(
            &db,
            &JobFilter {
                status: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_search_matches_title_company_location() {
        let db = test_db();
        let mut other = sample_record("https://jobs.example/2");
        other.metadata.job_title = "Data Scientist".to_string();
        other.company_info.company_name = "Globex".to_string();
        other.company_info.location_full = "Berlin, Germany".to_string();
        save(&db, &sample_record("https://jobs.example/1")).unwrap();
        save(&db, &other).unwrap();

        assert_eq!(search(&db, "backend").unwrap().len(), 1);
        assert_eq!(search(&db, "Globex").unwrap()[0].title, "Data Scientist");
        assert_eq!(search(&db, "berlin").unwrap().len(), 1);
        assert_eq!(search(&db, "").unwrap().len(), 2);
        assert!(search(&db, "Tokyo").unwrap().is_empty());
    }

    #[test]
    fn test_search_is_capped() {
        let db = test_db();
        for i in 0..(SEARCH_LIMIT + 5) {
            save(&db, &sample_record(&format!("https://jobs.example/{}", i))).unwrap();
        }
        assert_eq!(search(&db, "Acme").unwrap().len(), SEARCH_LIMIT as usize);
    }

    #[test]
    fn test_applied_at_stamped_once() {
        let db = test_db();
        let id = save(&db, &sample_record("https://jobs.example/1")).unwrap();

        update_status(&db, id, "applied").unwrap();
        let first = find_by_id(&db, id).unwrap().unwrap().applied_at;
        assert!(first.is_some());

        update_status(&db, id, "interview").unwrap();
        update_status(&db, id, "applied").unwrap();
        let second = find_by_id(&db, id).unwrap().unwrap().applied_at;
        assert_eq!(first, second);
    }

    #[test]
    fn test_mutators_report_missing_job() {
        let db = test_db();
        assert!(matches!(
            update_status(&db, 9, "applied"),
            Err(DatabaseError::NotFound(9))
        ));
        assert!(matches!(update_notes(&db, 9, "x"), Err(DatabaseError::NotFound(9))));
        assert!(matches!(update_rating(&db, 9, 1), Err(DatabaseError::NotFound(9))));
        assert!(matches!(delete(&db, 9), Err(DatabaseError::NotFound(9))));
    }

    #[test]
    fn test_delete_cascades_to_skills() {
        let db = test_db();
        let id = save(&db, &sample_record("https://jobs.example/1")).unwrap();
        delete(&db, id).unwrap();

        assert!(find_by_id(&db, id).unwrap().is_none());
        assert_eq!(count_rows(&db, "SELECT COUNT(*) FROM job_skills"), 0);
    }

    #[test]
    fn test_format_salary() {
        assert_eq!(format_salary(0, 0, "USD"), "");
        assert_eq!(format_salary(100, 200, ""), "100-200");
    }
}
