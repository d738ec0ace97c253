//! Domain types: the canonical job record, its skill index and status.

pub mod job;
pub mod skills;
pub mod status;

pub use job::{
    CompanyInfo, Compensation, JobMetadata, JobRecord, MarketSignals, Requirements, RoleDetails,
    WorkArrangement,
};
pub use skills::{SkillCategory, SkillEntry, TechnicalSkills};
pub use status::JobStatus;
