//! Decides where a content item lands in the export tree.
//!
//! Albums may live inside a folder hierarchy whose folders belong to other
//! users than the album or the content. The export tree is always anchored
//! under the owner of the top-most folder of that hierarchy.

use crate::catalog::Catalog;
use crate::error::ResolveError;
use crate::folders::FolderTree;
use crate::metadata::{parse_catalog_naive, AlbumMembership, ContentRecord};
use crate::sanitize::sanitize_container_name;
use crate::users::UserDirectory;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const NO_ALBUM_DIR: &str = "PHOTOS_WITHOUT_ALBUM";
const FLAT_SEPARATOR: &str = " - ";
const FALLBACK_DATE: [&str; 3] = ["1970", "01", "01"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationDescription {
    /// Relative to the export root; the first component is the user directory.
    pub relative_dir: PathBuf,
    /// Album or folder-chain label used for statistics.
    pub category: String,
    pub owner_changed: bool,
    pub effective_owner: i64,
}

impl DestinationDescription {
    pub fn user_dir(&self) -> &Path {
        self.relative_dir
            .components()
            .next()
            .map(|c| Path::new(c.as_os_str()))
            .unwrap_or_else(|| Path::new(""))
    }
}

pub struct HierarchyResolver<'a> {
    catalog: &'a Catalog,
    folders: &'a FolderTree,
    users: &'a UserDirectory,
    flatten: bool,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        folders: &'a FolderTree,
        users: &'a UserDirectory,
        flatten: bool,
    ) -> Self {
        Self {
            catalog,
            folders,
            users,
            flatten,
        }
    }

    pub fn resolve(&self, record: &ContentRecord) -> Result<DestinationDescription, ResolveError> {
        match self.catalog.album_membership(record.id)? {
            None => Ok(self.without_album(record)),
            Some(membership) => self.in_album(record, &membership),
        }
    }

    fn without_album(&self, record: &ContentRecord) -> DestinationDescription {
        let mut relative_dir = PathBuf::from(self.users.dir_name(record.owner_id));
        relative_dir.push(NO_ALBUM_DIR);

        if !self.flatten {
            let naive = record.taken_at.as_deref().and_then(parse_catalog_naive);
            match naive {
                Some(taken) => {
                    relative_dir.push(taken.format("%Y").to_string());
                    relative_dir.push(taken.format("%m").to_string());
                    relative_dir.push(taken.format("%d").to_string());
                }
                None => {
                    for part in FALLBACK_DATE {
                        relative_dir.push(part);
                    }
                }
            }
        }

        DestinationDescription {
            relative_dir,
            category: NO_ALBUM_DIR.to_string(),
            owner_changed: false,
            effective_owner: record.owner_id,
        }
    }

    fn in_album(
        &self,
        record: &ContentRecord,
        membership: &AlbumMembership,
    ) -> Result<DestinationDescription, ResolveError> {
        let album = sanitize_container_name(&membership.album_name);

        let chain = match membership.folder_id {
            Some(folder_id) => {
                let chain = self.folders.chain(folder_id)?;
                if chain.is_none() {
                    tracing::warn!(
                        content_id = record.id,
                        folder_id,
                        "album folder is missing from the catalog, using the album owner"
                    );
                }
                chain
            }
            None => None,
        };

        let (owner, mut segments) = match chain {
            Some(chain) if !chain.is_empty() => {
                let owner = chain[0].owner_id;
                let names = chain
                    .iter()
                    .map(|node| sanitize_container_name(&node.name))
                    .collect::<Vec<_>>();
                (owner, names)
            }
            _ => (membership.album_owner_id, Vec::new()),
        };
        segments.push(album);

        let mut relative_dir = PathBuf::from(self.users.dir_name(owner));
        let category = if self.flatten {
            let joined = segments.join(FLAT_SEPARATOR);
            relative_dir.push(&joined);
            joined
        } else {
            for segment in &segments {
                relative_dir.push(segment);
            }
            segments.join("/")
        };

        // Flattened trees report ownership against the album, nested ones
        // against the root of the folder chain.
        let owner_changed = if self.flatten {
            membership.album_owner_id != record.owner_id
        } else {
            owner != record.owner_id
        };

        Ok(DestinationDescription {
            relative_dir,
            category,
            owner_changed,
            effective_owner: owner,
        })
    }
}
