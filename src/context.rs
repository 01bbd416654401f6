//! Build-context filesystem handling.
//!
//! The build pipeline never mutates the caller's source tree: the context
//! directory is copied into a private temporary working copy, the dockerfile
//! is installed at the copy's root, ignore patterns are applied by deleting
//! matching paths, and the result is packaged into a gzipped tar archive for
//! streaming to the daemon.

use crate::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Copy the context directory into a fresh private working copy.
///
/// The working copy lives in a temporary directory that is deleted when the
/// returned guard is dropped.
pub(crate) fn isolate(directory: &Path) -> Result<TempDir> {
    let workdir = TempDir::new().map_err(Error::Isolation)?;
    copy_tree(directory, workdir.path()).map_err(Error::Isolation)?;
    debug!(
        "Isolated build context {} into {}",
        directory.display(),
        workdir.path().display()
    );
    Ok(workdir)
}

/// Install the given dockerfile at the working copy's root as the canonical
/// build file.
pub(crate) fn install_dockerfile(root: &Path, dockerfile: &Path) -> Result<()> {
    let _ = fs::copy(dockerfile, root.join("Dockerfile")).map_err(Error::CopyDockerfile)?;
    Ok(())
}

/// Delete every path in the working copy that matches a pattern from the
/// ignore file.
///
/// The ignore file holds newline-separated glob patterns (`*`, `**`, `?`),
/// each matched against paths relative to the working copy's root. Matching
/// directories are removed recursively; empty lines are skipped.
pub(crate) fn apply_ignore_file(root: &Path, ignore_file: &Path) -> Result<()> {
    let contents = fs::read_to_string(ignore_file)
        .map_err(|e| Error::IgnoreFile(format!("{}: {}", ignore_file.display(), e)))?;

    let patterns: Vec<Regex> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(glob_to_regex)
        .collect::<Result<_>>()?;

    if patterns.is_empty() {
        return Ok(());
    }

    // Collect matches up front so deletion does not race the walk.
    let mut matches = Vec::new();
    collect_matches(root, root, &patterns, &mut matches).map_err(Error::Filter)?;

    for path in matches {
        debug!("Excluding from build context: {}", path.display());
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => {}
            // A parent directory matched too and was already removed.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Filter(e)),
        }
    }

    Ok(())
}

/// Package the working copy into a gzipped tar archive.
pub(crate) fn archive(root: &Path) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", root)
        .and_then(|()| builder.into_inner())
        .and_then(GzEncoder::finish)
        .map_err(|e| Error::Stream(format!("packaging build context failed: {e}")))
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            let _ = fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn collect_matches(
    root: &Path,
    dir: &Path,
    patterns: &[Regex],
    matches: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        if patterns.iter().any(|p| p.is_match(&relative)) {
            matches.push(path);
        } else if entry.file_type()?.is_dir() {
            collect_matches(root, &path, patterns, matches)?;
        }
    }
    Ok(())
}

/// Translate a glob pattern into an anchored regular expression.
///
/// `**` crosses directory separators, `*` and `?` do not; everything else
/// is matched literally.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut translated = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    let _ = chars.next();
                    translated.push_str(".*");
                } else {
                    translated.push_str("[^/]*");
                }
            }
            '?' => translated.push_str("[^/]"),
            _ => translated.push_str(&regex::escape(&c.to_string())),
        }
    }
    translated.push('$');

    Regex::new(&translated)
        .map_err(|e| Error::IgnoreFile(format!("invalid pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
        fs::write(dir.path().join("app.log"), "noise").unwrap();
        fs::write(dir.path().join("src/lib.js"), "module.exports = {};").unwrap();
        dir
    }

    #[test]
    fn isolation_copies_the_whole_tree() {
        let source = fixture();
        let workdir = isolate(source.path()).unwrap();

        assert!(workdir.path().join("app.js").exists());
        assert!(workdir.path().join("src/lib.js").exists());
    }

    #[test]
    fn isolation_never_mutates_the_source_tree() {
        let source = fixture();
        let workdir = isolate(source.path()).unwrap();

        fs::remove_file(workdir.path().join("app.js")).unwrap();
        assert!(source.path().join("app.js").exists());
    }

    #[test]
    fn dockerfile_is_installed_at_the_root() {
        let source = fixture();
        let dockerfile = TempDir::new().unwrap();
        let dockerfile_path = dockerfile.path().join("app.dockerfile");
        fs::write(&dockerfile_path, "FROM alpine\n").unwrap();

        let workdir = isolate(source.path()).unwrap();
        install_dockerfile(workdir.path(), &dockerfile_path).unwrap();

        let contents = fs::read_to_string(workdir.path().join("Dockerfile")).unwrap();
        assert_eq!(contents, "FROM alpine\n");
    }

    #[test]
    fn ignore_patterns_delete_matching_files() {
        let workdir = isolate(fixture().path()).unwrap();
        let ignore = TempDir::new().unwrap();
        let ignore_path = ignore.path().join("ignore");
        fs::write(&ignore_path, "*.log\n\n").unwrap();

        apply_ignore_file(workdir.path(), &ignore_path).unwrap();

        assert!(!workdir.path().join("app.log").exists());
        assert!(workdir.path().join("app.js").exists());
        assert!(workdir.path().join("src/lib.js").exists());
    }

    #[test]
    fn ignore_patterns_delete_matching_directories_recursively() {
        let workdir = isolate(fixture().path()).unwrap();
        let ignore = TempDir::new().unwrap();
        let ignore_path = ignore.path().join("ignore");
        fs::write(&ignore_path, "src\n").unwrap();

        apply_ignore_file(workdir.path(), &ignore_path).unwrap();

        assert!(!workdir.path().join("src").exists());
        assert!(workdir.path().join("app.js").exists());
    }

    #[test]
    fn double_star_crosses_directories() {
        let workdir = isolate(fixture().path()).unwrap();
        let ignore = TempDir::new().unwrap();
        let ignore_path = ignore.path().join("ignore");
        fs::write(&ignore_path, "**/*.js\n").unwrap();

        apply_ignore_file(workdir.path(), &ignore_path).unwrap();

        assert!(!workdir.path().join("src/lib.js").exists());
        // A single `*` would not have reached into src/.
        assert!(workdir.path().join("app.log").exists());
    }

    #[test]
    fn missing_ignore_file_is_an_error() {
        let workdir = isolate(fixture().path()).unwrap();
        let result = apply_ignore_file(workdir.path(), Path::new("/nonexistent/ignore"));
        assert!(matches!(result, Err(Error::IgnoreFile(_))));
    }

    #[test]
    fn single_star_does_not_cross_separators() {
        let pattern = glob_to_regex("*.js").unwrap();
        assert!(pattern.is_match("app.js"));
        assert!(!pattern.is_match("src/lib.js"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let pattern = glob_to_regex("app.?s").unwrap();
        assert!(pattern.is_match("app.js"));
        assert!(!pattern.is_match("app.mjs"));
    }

    #[test]
    fn archive_produces_a_gzip_stream() {
        let workdir = isolate(fixture().path()).unwrap();
        let bytes = archive(workdir.path()).unwrap();

        // gzip magic number
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert!(bytes.len() > 2);
    }

    #[test]
    fn top_level_glob_also_matches_plain_files() {
        let dir = TempDir::new().unwrap();
        let mut file = File::create(dir.path().join("notes.txt")).unwrap();
        file.write_all(b"scratch").unwrap();
        let ignore_path = dir.path().join("ignore");
        fs::write(&ignore_path, "notes.txt\n").unwrap();

        apply_ignore_file(dir.path(), &ignore_path).unwrap();
        assert!(!dir.path().join("notes.txt").exists());
    }
}
