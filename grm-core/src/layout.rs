//! On-disk mirror layout.
//!
//! ```text
//! <base_dir>/
//!   <owner>/
//!     <repo>/
//!       <tag>/
//!         <asset files...>
//!         <repo>-<tag>-source.zip
//!         <repo>-<tag>-source.tar.gz
//!         files_info.txt
//!         .<file>.part         (while <file> is being written)
//!       .<tag>.partial/        (staging while a version is downloading)
//! ```

use std::path::{Path, PathBuf};

use crate::types::RepositoryRef;

/// Name of the per-directory manifest file.
pub const MANIFEST_FILE: &str = "files_info.txt";

const STAGING_SUFFIX: &str = ".partial";
const PART_SUFFIX: &str = ".part";

/// `<base_dir>/<owner>/<repo>/`
pub fn repo_dir(base_dir: &Path, repo: &RepositoryRef) -> PathBuf {
    base_dir.join(&repo.owner).join(&repo.name)
}

/// `<base_dir>/<owner>/<repo>/<tag>/`
pub fn version_dir(base_dir: &Path, repo: &RepositoryRef, tag: &str) -> PathBuf {
    repo_dir(base_dir, repo).join(tag)
}

/// `<base_dir>/<owner>/<repo>/.<tag>.partial/`
pub fn staging_dir(base_dir: &Path, repo: &RepositoryRef, tag: &str) -> PathBuf {
    repo_dir(base_dir, repo).join(format!(".{tag}{STAGING_SUFFIX}"))
}

/// Whether a directory name under a repo dir is a staging directory rather
/// than a completed version.
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Whether a remote-supplied name (tag or asset name) can be used as a single
/// path component without escaping its parent directory.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

/// `.<file_name>.part`, the in-progress name of a download.
pub fn part_file_name(file_name: &str) -> String {
    format!(".{file_name}{PART_SUFFIX}")
}

/// Whether `name` is an in-progress download written by [`part_file_name`].
pub fn is_part_name(name: &str) -> bool {
    name.len() > 1 + PART_SUFFIX.len() && name.starts_with('.') && name.ends_with(PART_SUFFIX)
}

/// Names the mirror writes itself inside a version directory. A remote file
/// with one of these names would be overwritten or hidden from the manifest.
pub fn is_reserved_name(name: &str) -> bool {
    name == MANIFEST_FILE
        || name.strip_prefix(MANIFEST_FILE) == Some(".tmp")
        || is_part_name(name)
}

/// `<repo>-<tag>-source.zip`
pub fn source_zip_name(repo: &RepositoryRef, tag: &str) -> String {
    format!("{}-{tag}-source.zip", repo.name)
}

/// `<repo>-<tag>-source.tar.gz`
pub fn source_tar_name(repo: &RepositoryRef, tag: &str) -> String {
    format!("{}-{tag}-source.tar.gz", repo.name)
}
