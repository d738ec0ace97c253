use serde::{Deserialize, Serialize};

/// Category tag stored on every skill index row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    ProgrammingLanguage,
    Framework,
    Database,
    Cloud,
    Devops,
    Other,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 6] = [
        Self::ProgrammingLanguage,
        Self::Framework,
        Self::Database,
        Self::Cloud,
        Self::Devops,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProgrammingLanguage => "programming_language",
            Self::Framework => "framework",
            Self::Database => "database",
            Self::Cloud => "cloud",
            Self::Devops => "devops",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six skill buckets of a canonical record. Each bucket holds plain names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalSkills {
    pub programming_languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub databases: Vec<String>,
    pub cloud_platforms: Vec<String>,
    pub devops_tools: Vec<String>,
    pub other: Vec<String>,
}

impl TechnicalSkills {
    pub fn bucket(&self, category: SkillCategory) -> &[String] {
        match category {
            SkillCategory::ProgrammingLanguage => &self.programming_languages,
            SkillCategory::Framework => &self.frameworks,
            SkillCategory::Database => &self.databases,
            SkillCategory::Cloud => &self.cloud_platforms,
            SkillCategory::Devops => &self.devops_tools,
            SkillCategory::Other => &self.other,
        }
    }

    pub fn bucket_mut(&mut self, category: SkillCategory) -> &mut Vec<String> {
        match category {
            SkillCategory::ProgrammingLanguage => &mut self.programming_languages,
            SkillCategory::Framework => &mut self.frameworks,
            SkillCategory::Database => &mut self.databases,
            SkillCategory::Cloud => &mut self.cloud_platforms,
            SkillCategory::Devops => &mut self.devops_tools,
            SkillCategory::Other => &mut self.other,
        }
    }

    /// Iterates non-empty `(category, name)` pairs in bucket order.
    pub fn entries(&self) -> impl Iterator<Item = (SkillCategory, &str)> + '_ {
        SkillCategory::ALL.into_iter().flat_map(move |category| {
            self.bucket(category)
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(move |name| (category, name))
        })
    }
}

/// One row of the derived skill index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    pub job_id: i64,
    pub skill_name: String,
    pub category: String,
    pub is_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_tag_matches_serde_name() {
        for category in SkillCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::json!(category.as_str()));
        }
    }

    #[test]
    fn test_entries_cover_all_buckets() {
        let mut skills = TechnicalSkills::default();
        for category in SkillCategory::ALL {
            skills.bucket_mut(category).push(format!("{}-skill", category));
        }
        let entries: Vec<_> = skills.entries().collect();
        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[0],
            (SkillCategory::ProgrammingLanguage, "programming_language-skill")
        );
        assert_eq!(entries[5], (SkillCategory::Other, "other-skill"));
    }
}
