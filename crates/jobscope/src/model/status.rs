use serde::{Deserialize, Serialize};

/// Pipeline stage of a saved job.
///
/// The store keeps status as free text; these are the stages the funnel
/// counts. Anything else is a user-defined tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Saved,
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        Self::Saved,
        Self::Applied,
        Self::Interview,
        Self::Offer,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Applied => "applied",
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
