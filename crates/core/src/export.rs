//! One sequential pass over every live content record of the catalog.

use crate::caption::edited_caption;
use crate::catalog::Catalog;
use crate::config::ExportOptions;
use crate::error::ExportError;
use crate::folders::FolderTree;
use crate::metadata::{ContentRecord, EditedContent};
use crate::naming::{split_extension, CollisionNamer};
use crate::resolver::{DestinationDescription, HierarchyResolver};
use crate::rewriter::{MetadataRequest, MetadataRewriter};
use crate::sanitize::sanitize_file_name;
use crate::stats::RunStatistics;
use crate::tag_export::{FanoutSource, TagFanoutExporter};
use crate::users::UserDirectory;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

const EDITED_SUFFIX: &str = "_edited";

pub struct Exporter {
    catalog: Catalog,
    options: ExportOptions,
    rewriter: MetadataRewriter,
}

/// State shared by all records of a run.
struct RunState<'a> {
    resolver: HierarchyResolver<'a>,
    users: &'a UserDirectory,
    namer: CollisionNamer,
    stats: RunStatistics,
}

impl Exporter {
    /// Opens the catalog below `options.source` read-only.
    pub fn open(options: ExportOptions) -> Result<Self, ExportError> {
        let catalog = Catalog::open(&options.catalog_path()).map_err(ExportError::Open)?;
        Ok(Self::new(catalog, options))
    }

    pub fn new(catalog: Catalog, options: ExportOptions) -> Self {
        let rewriter = MetadataRewriter::new(options.segment_limit);
        Self {
            catalog,
            options,
            rewriter,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn run(&self) -> Result<RunStatistics, ExportError> {
        let users = UserDirectory::from_rows(
            &self
                .catalog
                .users()
                .map_err(ExportError::UserDirectory)?,
        );
        let folders = FolderTree::new(self.catalog.folders().map_err(ExportError::Folders)?);
        let records = self
            .catalog
            .content_records()
            .map_err(ExportError::Content)?;

        tracing::info!(
            records = records.len(),
            users = users.len(),
            folders = folders.len(),
            dry_run = self.options.dry_run,
            "starting export"
        );

        let mut state = RunState {
            resolver: HierarchyResolver::new(
                &self.catalog,
                &folders,
                &users,
                self.options.flatten,
            ),
            users: &users,
            namer: CollisionNamer::new(self.options.dry_run),
            stats: RunStatistics::default(),
        };

        for record in &records {
            state.stats.records_seen += 1;
            self.export_record(record, &mut state);
        }

        let stats = state.stats;
        if self.options.dry_run {
            tracing::info!("simulated the export of {} files", stats.files_exported);
        } else {
            tracing::info!("exported {} files", stats.files_exported);
        }
        Ok(stats)
    }

    fn export_record(&self, record: &ContentRecord, state: &mut RunState<'_>) {
        let dest = match state.resolver.resolve(record) {
            Ok(dest) => dest,
            Err(err) => {
                tracing::warn!(content_id = record.id, path = %record.path, "skipping record, destination unresolved: {err}");
                state.stats.records_skipped += 1;
                return;
            }
        };
        let dest_dir = self.options.destination.join(&dest.relative_dir);
        log_destination(record, &dest, &dest_dir, state.users);

        let source = self.options.source.join(&record.path);
        if !source.is_file() {
            tracing::warn!(content_id = record.id, source = %source.display(), "skipping record, source file is missing");
            state.stats.missing_sources += 1;
            return;
        }

        if !self.options.dry_run {
            if let Err(err) = fs::create_dir_all(&dest_dir) {
                tracing::warn!(content_id = record.id, dir = %dest_dir.display(), "skipping record, could not create directory: {err}");
                state.stats.records_skipped += 1;
                return;
            }
        }

        let chosen = state
            .namer
            .unique_name(&dest_dir, &record.filename, &record.checksum);
        let target = dest_dir.join(&chosen.file_name);
        if chosen.renamed {
            tracing::debug!(content_id = record.id, name = %chosen.file_name, "name taken, exporting under a new name");
        }

        if !self.options.dry_run {
            if let Err(err) = fs::copy(&source, &target) {
                tracing::warn!(content_id = record.id, target = %target.display(), "skipping record, copy failed: {err}");
                state.stats.records_skipped += 1;
                return;
            }
        }
        state
            .stats
            .record_export(&dest.category, chosen.renamed, dest.owner_changed);

        let tags = self.tags_for(record);
        let request = self.metadata_request(record, &tags);
        if !request.is_empty() {
            self.apply_metadata(&target, &source, &request, &mut state.stats);
        }

        let modified =
            source_modified(&source).or_else(|| record.taken_at_local().map(SystemTime::from));
        if !self.options.dry_run {
            set_modified(&target, modified);
        }

        if self.options.tags_as_folders && !tags.is_empty() {
            let user_root = self.options.destination.join(dest.user_dir());
            let report = TagFanoutExporter::new(&self.rewriter, self.options.dry_run).export(
                &mut state.namer,
                FanoutSource {
                    source: &source,
                    file_name: &record.filename,
                    checksum: &record.checksum,
                    user_root: &user_root,
                    modified,
                },
                &tags,
                &request,
            );
            state.stats.tag_copy_failures += report.failures;
            state.stats.metadata_failures += report.metadata_failures();
            for copy in &report.copies {
                state.stats.record_tag_copy(&copy.tag_dir);
                if let Some(outcome) = &copy.outcome {
                    state.stats.record_metadata(outcome);
                }
            }
        }

        if self.options.save_edits {
            self.export_edited(record, &dest_dir, state);
        }
    }

    fn tags_for(&self, record: &ContentRecord) -> Vec<String> {
        if !(self.options.export_tags || self.options.tags_as_folders) {
            return Vec::new();
        }
        match self.catalog.tags_for(record.id) {
            Ok(tags) => tags,
            Err(err) => {
                tracing::warn!(content_id = record.id, "could not read tags: {err}");
                Vec::new()
            }
        }
    }

    fn metadata_request(&self, record: &ContentRecord, tags: &[String]) -> MetadataRequest {
        MetadataRequest {
            caption: record
                .caption()
                .filter(|_| self.options.save_comments)
                .map(str::to_string),
            gps: record.gps.filter(|_| self.options.export_gps),
            tags: if self.options.export_tags {
                tags.to_vec()
            } else {
                Vec::new()
            },
            device: None,
        }
    }

    /// Best-effort: failures are logged and counted, the exported file stays.
    fn apply_metadata(
        &self,
        target: &Path,
        source: &Path,
        request: &MetadataRequest,
        stats: &mut RunStatistics,
    ) {
        let result = if self.options.dry_run {
            self.rewriter.simulate(source, request)
        } else {
            self.rewriter.rewrite(target, request)
        };
        match result {
            Ok(outcome) => stats.record_metadata(&outcome),
            Err(err) => {
                tracing::warn!(target = %target.display(), "could not write metadata: {err}");
                stats.metadata_failures += 1;
            }
        }
    }

    fn export_edited(&self, record: &ContentRecord, dest_dir: &Path, state: &mut RunState<'_>) {
        let edited = match self.catalog.edited_content(record.id) {
            Ok(Some(edited)) => edited,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(content_id = record.id, "could not look up edited version: {err}");
                state.stats.edited_failures += 1;
                return;
            }
        };

        let source = self.options.source.join(&edited.path);
        if !source.is_file() {
            tracing::warn!(content_id = record.id, source = %source.display(), "edited version is missing");
            state.stats.edited_failures += 1;
            return;
        }

        let name = edited_file_name(&record.filename, &edited);
        let chosen = state.namer.unique_name(dest_dir, &name, &edited.checksum);
        let target = dest_dir.join(&chosen.file_name);

        if !self.options.dry_run {
            if let Err(err) = fs::copy(&source, &target) {
                tracing::warn!(content_id = record.id, target = %target.display(), "could not copy edited version: {err}");
                state.stats.edited_failures += 1;
                return;
            }
        }
        state.stats.edited_exported += 1;
        tracing::debug!(content_id = record.id, target = %target.display(), "exported edited version");

        let caption = edited_caption(record.caption().filter(|_| self.options.save_comments));
        let gps = record.gps.filter(|_| self.options.export_gps);
        let request =
            MetadataRequest::for_edited(caption, gps, self.options.edited_device.clone());
        self.apply_metadata(&target, &source, &request, &mut state.stats);

        if !self.options.dry_run {
            let modified = edited
                .stored_at_local()
                .map(SystemTime::from)
                .or_else(|| source_modified(&source));
            set_modified(&target, modified);
        }
    }
}

fn log_destination(
    record: &ContentRecord,
    dest: &DestinationDescription,
    dest_dir: &Path,
    users: &UserDirectory,
) {
    if dest.owner_changed {
        tracing::info!(
            content_id = record.id,
            path = %record.path,
            destination = %dest_dir.display(),
            from = users.dir_name(record.owner_id),
            to = users.dir_name(dest.effective_owner),
            "owner changed"
        );
    } else {
        tracing::debug!(
            content_id = record.id,
            path = %record.path,
            destination = %dest_dir.display(),
            "exporting"
        );
    }
}

/// `<original stem>_edited<edited extension>`.
fn edited_file_name(original: &str, edited: &EditedContent) -> String {
    let original = sanitize_file_name(original);
    let (stem, original_ext) = split_extension(&original);
    let (_, edited_ext) = split_extension(&edited.filename);
    let ext = if edited_ext.is_empty() {
        original_ext
    } else {
        edited_ext
    };
    format!("{stem}{EDITED_SUFFIX}{ext}")
}

fn source_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Failures are not worth more than a debug line.
pub(crate) fn set_modified(path: &Path, time: Option<SystemTime>) {
    let Some(time) = time else {
        return;
    };
    let result = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(time));
    if let Err(err) = result {
        tracing::debug!(path = %path.display(), "could not set modification time: {err}");
    }
}
