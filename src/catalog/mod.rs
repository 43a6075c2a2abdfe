use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod service;

pub use service::{CatalogService, CatalogStore, NewUnit, Upload};

/// One teaching unit inside a subject. `filename` stays `None` until a file
/// is attached and reverts to `None` when the file is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: String,
    #[serde(default)]
    pub pages_count: u32,
    pub filename: Option<String>,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub units: Vec<Unit>,
    pub created_at: DateTime<Utc>,
}

/// Rollup statistics. `total_subjects`/`total_files` are derived and
/// recomputed on every save; the visit and download counters only ever
/// increment; `storage_used` is carried verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_subjects: usize,
    pub total_files: usize,
    #[serde(default)]
    pub total_visits: u64,
    #[serde(default)]
    pub total_downloads: u64,
    pub storage_used: String,
    pub last_updated: DateTime<Utc>,
}

/// The whole catalog for one (year, semester) scope. Persisted as a single
/// JSON object and always overwritten wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub subjects: Vec<Subject>,
    pub stats: CatalogStats,
}

impl Default for CatalogDocument {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            stats: CatalogStats {
                total_subjects: 0,
                total_files: 0,
                total_visits: 0,
                total_downloads: 0,
                storage_used: "0 MB".to_string(),
                last_updated: Utc::now(),
            },
        }
    }
}

impl CatalogDocument {
    /// Subject names are unique per document, compared case-insensitively.
    pub fn has_subject_named(&self, name: &str) -> bool {
        self.subjects
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn subject_mut(&mut self, subject_id: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| s.id == subject_id)
    }

    /// Recomputes the derived stats from the subjects list and stamps
    /// `last_updated`. Called on every save.
    pub fn recompute_stats(&mut self) {
        self.stats.total_subjects = self.subjects.len();
        self.stats.total_files = self.subjects.iter().map(|s| s.units.len()).sum();
        self.stats.last_updated = Utc::now();
    }
}

impl Subject {
    pub fn new(name: &str, icon: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            units: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn unit_mut(&mut self, unit_id: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_check_ignores_case() {
        let mut doc = CatalogDocument::default();
        doc.subjects.push(Subject::new("DBMS", "fas fa-book"));
        assert!(doc.has_subject_named("dbms"));
        assert!(doc.has_subject_named("DBMS"));
        assert!(!doc.has_subject_named("Operating Systems"));
    }

    #[test]
    fn stats_recompute_counts_units_across_subjects() {
        let mut doc = CatalogDocument::default();
        let mut first = Subject::new("DBMS", "fas fa-book");
        first.units.push(Unit {
            id: Uuid::new_v4().to_string(),
            number: 1,
            title: "Relational Model".to_string(),
            description: String::new(),
            topics: String::new(),
            pages_count: 0,
            filename: None,
            icon: "fas fa-file-alt".to_string(),
            created_at: Utc::now(),
        });
        doc.subjects.push(first);
        doc.subjects.push(Subject::new("Operating Systems", "fas fa-book"));

        doc.recompute_stats();
        assert_eq!(doc.stats.total_subjects, 2);
        assert_eq!(doc.stats.total_files, 1);
    }
}
