//! Analytics repository: read-only aggregates over jobs and the skill index.

use std::collections::BTreeMap;

use rusqlite::params;
use serde::Serialize;

use super::{Database, DatabaseError};
use crate::model::JobStatus;

/// Job counts per pipeline stage.
///
/// `total` counts every row, including jobs carrying a custom status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusFunnel {
    pub total: i64,
    pub saved: i64,
    pub applied: i64,
    pub interview: i64,
    pub offer: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPair {
    pub skill_a: String,
    pub skill_b: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleCount {
    pub title: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub unique_skills: i64,
    pub mentions: i64,
}

/// Caps applied by [`overview`].
#[derive(Debug, Clone, Copy)]
pub struct OverviewLimits {
    pub top_skills: u32,
    pub per_status: u32,
    pub focus_locations: u32,
    pub top_titles: u32,
}

impl Default for OverviewLimits {
    fn default() -> Self {
        Self {
            top_skills: 15,
            per_status: 5,
            focus_locations: 10,
            top_titles: 10,
        }
    }
}

/// Dashboard payload: funnel, skill rankings and the focus skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub status_stats: StatusFunnel,
    pub top_skills: Vec<SkillCount>,
    pub skills_by_status: BTreeMap<String, Vec<SkillCount>>,
    /// Most frequent skill, empty on an empty corpus.
    pub focus_skill: String,
    pub focus_skill_locations: Vec<LocationCount>,
    pub top_titles: Vec<TitleCount>,
}

pub fn status_funnel(db: &Database) -> Result<StatusFunnel, DatabaseError> {
    db.with_conn(|conn| {
        let funnel = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'saved'), 0),
                    COALESCE(SUM(status = 'applied'), 0),
                    COALESCE(SUM(status = 'interview'), 0),
                    COALESCE(SUM(status = 'offer'), 0),
                    COALESCE(SUM(status = 'rejected'), 0)
             FROM jobs",
            [],
            |row| {
                Ok(StatusFunnel {
                    total: row.get(0)?,
                    saved: row.get(1)?,
                    applied: row.get(2)?,
                    interview: row.get(3)?,
                    offer: row.get(4)?,
                    rejected: row.get(5)?,
                })
            },
        )?;
        Ok(funnel)
    })
}

/// Most frequent `(skill, category)` pairs, count desc then name asc.
pub fn top_skills(db: &Database, limit: u32) -> Result<Vec<SkillCount>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT skill_name, skill_category, COUNT(*) AS cnt
             FROM job_skills
             GROUP BY skill_name, skill_category
             ORDER BY cnt DESC, skill_name ASC, skill_category ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(SkillCount {
                    skill: row.get(0)?,
                    category: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Top skills per status, each status capped independently.
///
/// The five pipeline stages are always present (possibly empty); custom
/// statuses appear only when jobs carry them.
pub fn skills_by_status(
    db: &Database,
    per_status: u32,
) -> Result<BTreeMap<String, Vec<SkillCount>>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT status, skill_name, skill_category, cnt FROM (
                SELECT j.status AS status, s.skill_name, s.skill_category, COUNT(*) AS cnt,
                       ROW_NUMBER() OVER (
                           PARTITION BY j.status
                           ORDER BY COUNT(*) DESC, s.skill_name ASC, s.skill_category ASC
                       ) AS rn
                FROM job_skills s
                JOIN jobs j ON j.id = s.job_id
                GROUP BY j.status, s.skill_name, s.skill_category
             )
             WHERE rn <= ?1
             ORDER BY status, rn",
        )?;

        let mut by_status: BTreeMap<String, Vec<SkillCount>> = JobStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), Vec::new()))
            .collect();

        let rows = stmt.query_map(params![per_status], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SkillCount {
                    skill: row.get(1)?,
                    category: row.get(2)?,
                    count: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (status, skill) = row?;
            by_status.entry(status).or_default().push(skill);
        }
        Ok(by_status)
    })
}

/// Where a skill is asked for: city, else full location, else "Unknown".
pub fn skill_locations(
    db: &Database,
    skill: &str,
    limit: u32,
) -> Result<Vec<LocationCount>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT COALESCE(NULLIF(TRIM(j.location_city), ''),
                             NULLIF(TRIM(j.location_full), ''),
                             'Unknown') AS location,
                    COUNT(DISTINCT j.id) AS cnt
             FROM job_skills s
             JOIN jobs j ON j.id = s.job_id
             WHERE s.skill_name = ?1
             GROUP BY location
             ORDER BY cnt DESC, location ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![skill, limit], |row| {
                Ok(LocationCount {
                    location: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Skills that show up together in more than one job.
pub fn skill_pairs(db: &Database, limit: u32) -> Result<Vec<SkillPair>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT s1.skill_name, s2.skill_name, COUNT(DISTINCT s1.job_id) AS cnt
             FROM job_skills s1
             JOIN job_skills s2 ON s1.job_id = s2.job_id AND s1.skill_name < s2.skill_name
             GROUP BY s1.skill_name, s2.skill_name
             HAVING cnt > 1
             ORDER BY cnt DESC, s1.skill_name ASC, s2.skill_name ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(SkillPair {
                    skill_a: row.get(0)?,
                    skill_b: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Most common exact job titles, empty titles excluded.
pub fn top_job_titles(db: &Database, limit: u32) -> Result<Vec<TitleCount>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT job_title, COUNT(*) AS cnt
             FROM jobs
             WHERE TRIM(job_title) != ''
             GROUP BY job_title
             ORDER BY cnt DESC, job_title ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(TitleCount {
                    title: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Distinct skills and total mentions per category tag.
pub fn category_breakdown(db: &Database) -> Result<Vec<CategoryBreakdown>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT skill_category, COUNT(DISTINCT skill_name), COUNT(*) AS mentions
             FROM job_skills
             GROUP BY skill_category
             ORDER BY mentions DESC, skill_category ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CategoryBreakdown {
                    category: row.get(0)?,
                    unique_skills: row.get(1)?,
                    mentions: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Composes the dashboard aggregates.
pub fn overview(db: &Database, limits: OverviewLimits) -> Result<AnalyticsOverview, DatabaseError> {
    let status_stats = status_funnel(db)?;
    let top_skills = top_skills(db, limits.top_skills)?;
    let skills_by_status = skills_by_status(db, limits.per_status)?;

    let focus_skill = top_skills
        .first()
        .map(|s| s.skill.clone())
        .unwrap_or_default();
    let focus_skill_locations = if focus_skill.is_empty() {
        Vec::new()
    } else {
        skill_locations(db, &focus_skill, limits.focus_locations)?
    };

    Ok(AnalyticsOverview {
        status_stats,
        top_skills,
        skills_by_status,
        focus_skill,
        focus_skill_locations,
        top_titles: top_job_titles(db, limits.top_titles)?,
    })
}
