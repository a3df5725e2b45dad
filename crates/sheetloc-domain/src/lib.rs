use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of pushing one table during extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TablePushStat {
    pub table: String,
    pub extracted: usize,
    pub updated: usize,
    pub appended: usize,
    pub unchanged: usize,
}

/// Data-quality counters collected while walking the trees. Never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractWarnings {
    /// Files for which no conversation title matched a chapter.
    pub unresolved_chapter_files: Vec<String>,
    /// Actors whose display name came from the plain field.
    pub display_name_fallbacks: usize,
    pub missing_display_name: usize,
    /// Dialogue entries with neither dialogue nor menu text.
    pub dropped_entries: usize,
    /// Quests or actors lacking a key field.
    pub skipped_items: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractSummary {
    pub schema_version: u32,
    pub files: usize,
    pub dry_run: bool,
    pub tables: Vec<TablePushStat>,
    pub warnings: ExtractWarnings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReinjectTableStat {
    pub table: String,
    /// Rows present in the store snapshot.
    pub store_rows: usize,
    pub replaced: usize,
    pub empty_fallbacks: usize,
    /// Matched keys whose target-language field is absent from the tree.
    pub missing_fields: usize,
    /// Store keys never matched by any tree entry.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReinjectSummary {
    pub schema_version: u32,
    pub target_lang: String,
    pub written: Vec<String>,
    pub tables: Vec<ReinjectTableStat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranslateSummary {
    pub schema_version: u32,
    pub filter: String,
    pub force: bool,
    pub dry_run: bool,
    pub candidates: usize,
    pub blocks: usize,
    pub translated_blocks: usize,
    pub translated_rows: usize,
    pub failed_blocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyEntry {
    pub key: String,
    pub kind: String,
    pub message: String,
    pub original: String,
    pub translated: String,
}

/// Persisted QA report, merged after every batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CheckReport {
    pub schema_version: u32,
    pub anomalies: Vec<AnomalyEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CheckSummary {
    pub schema_version: u32,
    pub candidates: usize,
    pub skipped_processed: usize,
    pub checked: usize,
    pub batches: usize,
    pub anomalies: usize,
    /// Language review backend, `passthrough` when none ran.
    pub reviewer: String,
    /// Batches whose review call failed; they stay out of the checkpoint.
    pub review_failures: usize,
    pub report_path: String,
    pub checkpoint_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_have_schemas() {
        let schema = schemars::schema_for!(ReinjectSummary);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("empty_fallbacks"));
        assert!(json.contains("unmatched"));
    }
}
