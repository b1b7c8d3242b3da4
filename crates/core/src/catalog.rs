//! Read-only access to the appliance's SQLite catalog.

use crate::error::CatalogError;
use crate::metadata::{AlbumMembership, ContentRecord, EditedContent, FolderNode, GpsCoordinate};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub deleted: bool,
}

pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| CatalogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> Result<Vec<UserRow>, CatalogError> {
        let mut stmt = self.conn.prepare("SELECT id, name, status FROM user ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                let status = text_column(row, 2)?.unwrap_or_default();
                Ok(UserRow {
                    id: row.get(0)?,
                    name: text_column(row, 1)?.unwrap_or_default(),
                    deleted: status.eq_ignore_ascii_case("deleted"),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn folders(&self) -> Result<Vec<FolderNode>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent_id, user_id FROM albumfolder")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FolderNode {
                    id: row.get(0)?,
                    name: text_column(row, 1)?.unwrap_or_default(),
                    parent_id: row.get::<_, Option<i64>>(2)?.filter(|id| *id != 0),
                    owner_id: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All content that has not been soft-deleted, in id order.
    pub fn content_records(&self) -> Result<Vec<ContentRecord>, CatalogError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, path, filename, checksum, caption, geo_lat, geo_lon, taken
            FROM content
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ContentRecord {
                    id: row.get(0)?,
                    owner_id: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    path: text_column(row, 2)?.unwrap_or_default(),
                    filename: text_column(row, 3)?.unwrap_or_default(),
                    checksum: text_column(row, 4)?.unwrap_or_default(),
                    caption: text_column(row, 5)?,
                    gps: GpsCoordinate::from_columns(real_column(row, 6)?, real_column(row, 7)?),
                    taken_at: text_column(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn album_membership(
        &self,
        content_id: i64,
    ) -> Result<Option<AlbumMembership>, CatalogError> {
        let membership = self
            .conn
            .query_row(
                r#"
                SELECT ac.album_id, afa.folder_id, a.name, a.user_id
                FROM albumcontent AS ac
                JOIN album AS a ON ac.album_id = a.id
                LEFT JOIN albumfolderalbum AS afa ON ac.album_id = afa.album_id
                WHERE ac.content_id = ?1
                ORDER BY ac.album_id
                LIMIT 1
                "#,
                [content_id],
                |row| {
                    Ok(AlbumMembership {
                        album_id: row.get(0)?,
                        folder_id: row.get::<_, Option<i64>>(1)?.filter(|id| *id != 0),
                        album_name: text_column(row, 2)?.unwrap_or_default(),
                        album_owner_id: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    })
                },
            )
            .optional()?;
        Ok(membership)
    }

    /// Non-builtin tag names, sorted and without duplicates.
    pub fn tags_for(&self, content_id: i64) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT t.name
            FROM tagcontent AS tc
            JOIN tag AS t ON tc.tag_id = t.id
            WHERE tc.content_id = ?1 AND COALESCE(t.builtin, 0) = 0
            "#,
        )?;
        let mut tags = stmt
            .query_map([content_id], |row| text_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    pub fn edited_content(&self, content_id: i64) -> Result<Option<EditedContent>, CatalogError> {
        let edited = self
            .conn
            .query_row(
                r#"
                SELECT content_id, path, filename, checksum, stored_at
                FROM editedcontent
                WHERE content_id = ?1 AND status = 1
                ORDER BY stored_at DESC
                LIMIT 1
                "#,
                [content_id],
                |row| {
                    Ok(EditedContent {
                        content_id: row.get(0)?,
                        path: text_column(row, 1)?.unwrap_or_default(),
                        filename: text_column(row, 2)?.unwrap_or_default(),
                        checksum: text_column(row, 3)?.unwrap_or_default(),
                        stored_at: text_column(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(edited)
    }
}

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

fn real_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v as f64),
        ValueRef::Real(v) => Some(v),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}


#[cfg(test)]
mod tests {
    use super::fixture::CatalogBuilder;

    #[test]
    fn content_records_skip_deleted_rows() {
        let catalog = CatalogBuilder::new()
            .content(2, 1, "u/b.jpg", "bb")
            .content(1, 1, "u/a.jpg", "aa")
            .content(3, 1, "u/c.jpg", "cc")
            .deleted(3)
            .build();

        let ids: Vec<i64> = catalog
            .content_records()
            .expect("records")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn content_record_reads_optional_columns() {
        let catalog = CatalogBuilder::new()
            .content(1, 4, "u/a.jpg", "aa")
            .caption(1, "Sunset")
            .gps(1, 48.8584, 2.2945)
            .build();

        let record = catalog.content_records().expect("records").remove(0);
        assert_eq!(record.owner_id, 4);
        assert_eq!(record.filename, "a.jpg");
        assert_eq!(record.caption(), Some("Sunset"));
        assert_eq!(record.gps.map(|g| g.longitude), Some(2.2945));
        assert_eq!(record.taken_at.as_deref(), Some("2023-08-15 10:20:30"));
    }

    #[test]
    fn membership_reports_folder_and_owner() {
        let catalog = CatalogBuilder::new()
            .content(1, 1, "u/a.jpg", "aa")
            .content(2, 1, "u/b.jpg", "bb")
            .album(10, "Summer", 2, Some(7))
            .in_album(1, 10)
            .build();

        let membership = catalog
            .album_membership(1)
            .expect("query")
            .expect("membership");
        assert_eq!(membership.folder_id, Some(7));
        assert_eq!(membership.album_name, "Summer");
        assert_eq!(membership.album_owner_id, 2);
        assert!(catalog.album_membership(2).expect("query").is_none());
    }

    #[test]
    fn tags_exclude_builtin_and_are_sorted() {
        let catalog = CatalogBuilder::new()
            .content(1, 1, "u/a.jpg", "aa")
            .tag(1, 1, "paris", false)
            .tag(1, 2, "favorite", true)
            .tag(1, 3, "2024", false)
            .build();

        assert_eq!(catalog.tags_for(1).expect("tags"), vec!["2024", "paris"]);
    }

    #[test]
    fn edited_content_requires_active_status() {
        let catalog = CatalogBuilder::new()
            .content(1, 1, "u/a.jpg", "aa")
            .content(2, 1, "u/b.jpg", "bb")
            .edited(1, "edits/a.jpg", 1)
            .edited(2, "edits/b.jpg", 0)
            .build();

        let edited = catalog.edited_content(1).expect("query").expect("edited");
        assert_eq!(edited.filename, "a.jpg");
        assert!(catalog.edited_content(2).expect("query").is_none());
    }

    #[test]
    fn users_flag_deleted_accounts() {
        let catalog = CatalogBuilder::new()
            .user(1, "alice", "active")
            .user(2, "bob", "deleted")
            .build();

        let users = catalog.users().expect("users");
        assert!(!users[0].deleted);
        assert!(users[1].deleted);
    }
}
