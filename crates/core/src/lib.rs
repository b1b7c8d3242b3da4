mod caption;
mod catalog;
mod config;
mod error;
mod exif_reader;
mod export;
mod folders;
mod metadata;
mod naming;
mod resolver;
mod rewriter;
mod sanitize;
mod stats;
mod tag_export;
mod users;

pub use caption::{edited_caption, keywords_line, sanitize_caption};
pub use catalog::{Catalog, UserRow};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    ExportOptions, CATALOG_RELATIVE_PATH,
};
pub use error::{CatalogError, ExportError, MetadataError, ResolveError};
pub use export::Exporter;
pub use folders::FolderTree;
pub use metadata::{AlbumMembership, ContentRecord, EditedContent, FolderNode, GpsCoordinate};
pub use naming::{ChosenName, CollisionNamer};
pub use resolver::{DestinationDescription, HierarchyResolver, NO_ALBUM_DIR};
pub use rewriter::{
    DeviceStamp, MetadataRequest, MetadataRewriter, RewriteOutcome, DEFAULT_SEGMENT_LIMIT,
    TRUNCATION_LADDER,
};
pub use sanitize::{sanitize_container_name, sanitize_file_name, sanitize_tag_name};
pub use stats::RunStatistics;
pub use tag_export::{FanoutReport, FanoutSource, TagCopy, TagFanoutExporter, TAGS_DIR};
pub use users::{UserDirectory, UNKNOWN_USER};
