use crate::catalog::UserRow;
use crate::sanitize::sanitize_container_name;
use std::collections::HashMap;

pub const UNKNOWN_USER: &str = "unknown_user";

/// Maps catalog user ids to the directory names used at the top of the
/// export tree.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    names: HashMap<i64, String>,
}

impl UserDirectory {
    pub fn from_rows(rows: &[UserRow]) -> Self {
        let mut names = HashMap::with_capacity(rows.len() + 1);
        names.insert(0, UNKNOWN_USER.to_string());
        for row in rows {
            let raw = if row.deleted {
                format!("{}_{}_deleted", row.name, row.id)
            } else {
                format!("{}_{}", row.name, row.id)
            };
            names.insert(row.id, sanitize_container_name(&raw));
        }
        Self { names }
    }

    pub fn dir_name(&self, user_id: i64) -> &str {
        self.names
            .get(&user_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_USER)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
