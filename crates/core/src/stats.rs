use crate::rewriter::RewriteOutcome;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub records_seen: usize,
    pub files_exported: usize,
    /// Exported under a collision name instead of the original one.
    pub files_renamed: usize,
    pub missing_sources: usize,
    /// Skipped for any reason other than a missing source.
    pub records_skipped: usize,
    pub ownership_changes: usize,
    pub gps_written: usize,
    pub captions_written: usize,
    pub tags_written: usize,
    pub truncated_writes: usize,
    pub metadata_failures: usize,
    pub tag_copies: usize,
    pub tag_copy_failures: usize,
    pub edited_exported: usize,
    pub edited_failures: usize,
    /// Files per album (or folder chain) label.
    pub per_album: BTreeMap<String, usize>,
    /// Tag copies per tag directory.
    pub per_tag: BTreeMap<String, usize>,
}

impl RunStatistics {
    pub fn record_export(&mut self, category: &str, renamed: bool, owner_changed: bool) {
        self.files_exported += 1;
        if renamed {
            self.files_renamed += 1;
        }
        if owner_changed {
            self.ownership_changes += 1;
        }
        *self.per_album.entry(category.to_string()).or_default() += 1;
    }

    pub fn record_metadata(&mut self, outcome: &RewriteOutcome) {
        if !outcome.supported {
            return;
        }
        if outcome.gps_written {
            self.gps_written += 1;
        }
        if outcome.caption_written {
            self.captions_written += 1;
        }
        if outcome.tags_written {
            self.tags_written += 1;
        }
        if outcome.truncated || outcome.text_dropped {
            self.truncated_writes += 1;
        }
    }

    pub fn record_tag_copy(&mut self, tag_dir: &str) {
        self.tag_copies += 1;
        *self.per_tag.entry(tag_dir.to_string()).or_default() += 1;
    }

    /// Everything the run handled without giving up on a record.
    pub fn records_processed(&self) -> usize {
        self.records_seen
            .saturating_sub(self.missing_sources + self.records_skipped)
    }
}
