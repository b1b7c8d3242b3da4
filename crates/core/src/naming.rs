use crate::sanitize::sanitize_file_name;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenName {
    pub file_name: String,
    /// The sanitized original name was taken and a suffix had to be added.
    pub renamed: bool,
}

/// Picks destination file names that are unique within their directory.
///
/// Names handed out earlier in the run are remembered, so two records with
/// the same name never collide even when nothing has been written yet
/// (dry-run) or when the caller writes later.
#[derive(Debug, Default)]
pub struct CollisionNamer {
    dry_run: bool,
    reserved: HashSet<PathBuf>,
}

impl CollisionNamer {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            reserved: HashSet::new(),
        }
    }

    pub fn unique_name(
        &mut self,
        dest_dir: &Path,
        original_name: &str,
        checksum: &str,
    ) -> ChosenName {
        let sanitized = sanitize_file_name(original_name);
        if self.claim(dest_dir, &sanitized) {
            return ChosenName {
                file_name: sanitized,
                renamed: false,
            };
        }

        let (base, ext) = split_extension(&sanitized);
        let checksum = checksum.trim();
        let stem = if checksum.is_empty() {
            base.to_string()
        } else {
            let checksum = sanitize_file_name(checksum);
            let candidate = format!("{base}-{checksum}{ext}");
            if self.claim(dest_dir, &candidate) {
                return ChosenName {
                    file_name: candidate,
                    renamed: true,
                };
            }
            format!("{base}-{checksum}")
        };

        let mut n = 1usize;
        loop {
            let candidate = format!("{stem}_{n}{ext}");
            if self.claim(dest_dir, &candidate) {
                return ChosenName {
                    file_name: candidate,
                    renamed: true,
                };
            }
            n += 1;
        }
    }

    fn claim(&mut self, dest_dir: &Path, name: &str) -> bool {
        let candidate = dest_dir.join(name);
        if self.reserved.contains(&candidate) {
            return false;
        }
        if !self.dry_run && candidate.exists() {
            return false;
        }
        self.reserved.insert(candidate);
        true
    }
}

/// Splits at the last dot. A leading dot (hidden file) is not an extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn free_name_is_kept() {
        let temp = tempdir().expect("tempdir");
        let mut namer = CollisionNamer::new(false);
        let chosen = namer.unique_name(temp.path(), "IMG_0001.JPG", "abc");
        assert_eq!(chosen.file_name, "IMG_0001.JPG");
        assert!(!chosen.renamed);
    }

    #[test]
    fn existing_file_gets_checksum_then_counter() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("IMG_0001.JPG"), b"x").expect("write first");
        fs::write(temp.path().join("IMG_0001-abc.JPG"), b"x").expect("write second");
        fs::write(temp.path().join("IMG_0001-abc_1.JPG"), b"x").expect("write third");

        let mut namer = CollisionNamer::new(false);
        let chosen = namer.unique_name(temp.path(), "IMG_0001.JPG", "abc");
        assert_eq!(chosen.file_name, "IMG_0001-abc_2.JPG");
        assert!(chosen.renamed);
    }

    #[test]
    fn repeated_requests_in_one_run_never_collide() {
        let temp = tempdir().expect("tempdir");
        let mut namer = CollisionNamer::new(false);
        let names: Vec<String> = (0..4)
            .map(|_| namer.unique_name(temp.path(), "a.jpg", "ff").file_name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "a-ff.jpg", "a-ff_1.jpg", "a-ff_2.jpg"]);
    }

    #[test]
    fn dry_run_ignores_the_filesystem_but_not_reservations() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.jpg"), b"x").expect("write existing");

        let mut namer = CollisionNamer::new(true);
        assert_eq!(namer.unique_name(temp.path(), "a.jpg", "ff").file_name, "a.jpg");
        assert_eq!(namer.unique_name(temp.path(), "a.jpg", "ff").file_name, "a-ff.jpg");
    }

    #[test]
    fn second_run_over_same_tree_stays_unique() {
        let temp = tempdir().expect("tempdir");
        for _ in 0..2 {
            let mut namer = CollisionNamer::new(false);
            let chosen = namer.unique_name(temp.path(), "a.jpg", "ff");
            fs::write(temp.path().join(&chosen.file_name), b"x").expect("write");
        }
        assert!(temp.path().join("a.jpg").exists());
        assert!(temp.path().join("a-ff.jpg").exists());
    }

    #[test]
    fn separate_directories_do_not_interfere() {
        let temp = tempdir().expect("tempdir");
        let mut namer = CollisionNamer::new(true);
        let a = namer.unique_name(&temp.path().join("x"), "a.jpg", "ff");
        let b = namer.unique_name(&temp.path().join("y"), "a.jpg", "ff");
        assert_eq!(a.file_name, b.file_name);
    }

    #[test]
    fn names_without_extension_or_checksum() {
        let temp = tempdir().expect("tempdir");
        let mut namer = CollisionNamer::new(true);
        namer.unique_name(temp.path(), ".hidden", "");
        assert_eq!(namer.unique_name(temp.path(), ".hidden", "").file_name, ".hidden_1");
        namer.unique_name(temp.path(), "README", "c0");
        assert_eq!(namer.unique_name(temp.path(), "README", "c0").file_name, "README-c0");
    }

    #[test]
    fn original_name_is_sanitized() {
        let temp = tempdir().expect("tempdir");
        let mut namer = CollisionNamer::new(true);
        assert_eq!(namer.unique_name(temp.path(), "a:b?.jpg", "").file_name, "a_b_.jpg");
    }

    #[test]
    fn split_extension_uses_last_dot() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("noext"), ("noext", ""));
    }
}
