//! Extra copies of an exported file, one per tag, under `<user>/tags/`.

use crate::export::set_modified;
use crate::naming::CollisionNamer;
use crate::rewriter::{MetadataRequest, MetadataRewriter, RewriteOutcome};
use crate::sanitize::sanitize_tag_name;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

pub const TAGS_DIR: &str = "tags";

/// One source file about to be fanned out.
#[derive(Debug, Clone, Copy)]
pub struct FanoutSource<'a> {
    pub source: &'a Path,
    pub file_name: &'a str,
    pub checksum: &'a str,
    /// Directory of the effective owner inside the export root.
    pub user_root: &'a Path,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagCopy {
    pub tag_dir: String,
    /// `None` when the copy exists but its metadata could not be written.
    pub outcome: Option<RewriteOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanoutReport {
    pub copies: Vec<TagCopy>,
    pub failures: usize,
}

impl FanoutReport {
    pub fn metadata_failures(&self) -> usize {
        self.copies.iter().filter(|c| c.outcome.is_none()).count()
    }
}

pub struct TagFanoutExporter<'a> {
    rewriter: &'a MetadataRewriter,
    dry_run: bool,
}

impl<'a> TagFanoutExporter<'a> {
    pub fn new(rewriter: &'a MetadataRewriter, dry_run: bool) -> Self {
        Self { rewriter, dry_run }
    }

    /// Copies `item` once per tag. Every copy gets the complete tag list
    /// written into it, together with whatever caption and GPS `base` holds.
    pub fn export(
        &self,
        namer: &mut CollisionNamer,
        item: FanoutSource<'_>,
        tags: &[String],
        base: &MetadataRequest,
    ) -> FanoutReport {
        let request = MetadataRequest {
            tags: tags.to_vec(),
            ..base.clone()
        };
        let mut report = FanoutReport::default();

        for tag in tags {
            let tag_dir = sanitize_tag_name(tag);
            let dir = item.user_root.join(TAGS_DIR).join(&tag_dir);

            if !self.dry_run {
                if let Err(err) = fs::create_dir_all(&dir) {
                    tracing::warn!(tag = %tag, dir = %dir.display(), "could not create tag directory: {err}");
                    report.failures += 1;
                    continue;
                }
            }

            let chosen = namer.unique_name(&dir, item.file_name, item.checksum);
            let destination = dir.join(&chosen.file_name);

            let result = if self.dry_run {
                tracing::debug!(tag = %tag, destination = %destination.display(), "would copy to tag folder");
                self.rewriter.simulate(item.source, &request)
            } else {
                if let Err(err) = fs::copy(item.source, &destination) {
                    tracing::warn!(
                        tag = %tag,
                        source = %item.source.display(),
                        destination = %destination.display(),
                        "could not copy into tag folder: {err}"
                    );
                    report.failures += 1;
                    continue;
                }
                let result = self.rewriter.rewrite(&destination, &request);
                set_modified(&destination, item.modified);
                tracing::debug!(tag = %tag, destination = %destination.display(), "copied to tag folder");
                result
            };

            let outcome = match result {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    tracing::warn!(
                        tag = %tag,
                        destination = %destination.display(),
                        "could not write metadata to tag copy: {err}"
                    );
                    None
                }
            };
            report.copies.push(TagCopy { tag_dir, outcome });
        }

        report
    }
}
