use std::path::{Path, PathBuf};

/// Resolve a storage root to an absolute path.
/// Relative roots are resolved against current_dir().
pub fn absolute_root(root: &str) -> PathBuf {
    let p = PathBuf::from(root);
    if p.is_absolute() {
        p
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(p),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read working directory, using relative storage root");
                p
            }
        }
    }
}

/// Absolute location of a stored portfolio link.
///
/// Links are stored web-style (`/uploads/abc.pdf`); the leading slash is
/// dropped so the link lands under `root` instead of the filesystem root.
/// Example: portfolio_path("/srv/grader", "/uploads/a.pdf") → /srv/grader/uploads/a.pdf
pub fn portfolio_path<P: AsRef<Path>>(root: P, link: &str) -> PathBuf {
    root.as_ref().join(link.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn root_resolves_relative_against_cwd() {
        let expected = std::env::current_dir().unwrap().join("storage_rel");
        assert_eq!(absolute_root("storage_rel"), expected);
    }

    #[test]
    fn root_uses_absolute_as_is() {
        let td = TempDir::new().unwrap();
        let abs = td.path().to_path_buf();
        assert_eq!(absolute_root(abs.to_str().unwrap()), abs);
    }

    #[test]
    fn portfolio_links_land_under_root() {
        let root = PathBuf::from("/srv/grader");
        assert_eq!(
            portfolio_path(&root, "/uploads/17-essay.pdf"),
            root.join("uploads").join("17-essay.pdf")
        );
        assert_eq!(
            portfolio_path(&root, "uploads/plain.docx"),
            root.join("uploads").join("plain.docx")
        );
    }
}
