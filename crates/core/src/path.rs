//! Remote object paths and local path resolution
//!
//! Local paths that do not exist relative to the working directory are
//! retried relative to the directory holding the executable, so a binary
//! shipped next to its data can be run from anywhere.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A bucket and key pair on the storage service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemotePath {
    pub bucket: String,
    pub key: String,
}

impl RemotePath {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// What a local path is expected to point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Dir,
}

impl PathKind {
    fn matches(self, path: &Path) -> bool {
        match self {
            PathKind::File => path.is_file(),
            PathKind::Dir => path.is_dir(),
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            PathKind::File => "File doesn't exist",
            PathKind::Dir => "Path does not exist",
        }
    }
}

/// Resolve a user-supplied local path
///
/// Tries the path as given, then relative to the executable's directory:
/// first with a leading `./` replaced by that directory, then with the
/// directory prefixed.
pub fn resolve_local_path(path: &str, kind: PathKind) -> Result<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    resolve_with_base(path, kind, exe_dir.as_deref())
}

fn resolve_with_base(path: &str, kind: PathKind, base: Option<&Path>) -> Result<PathBuf> {
    let missing = || Error::NotFound(format!("{}: {path}", kind.missing_message()));

    if path.is_empty() {
        return Err(missing());
    }

    let direct = PathBuf::from(path);
    if kind.matches(&direct) {
        return Ok(direct);
    }

    let base = base.ok_or_else(missing)?;

    if let Some(stripped) = path.strip_prefix("./") {
        let candidate = base.join(stripped);
        if kind.matches(&candidate) {
            return Ok(candidate);
        }
    }

    let candidate = base.join(path.trim_start_matches('/'));
    if kind.matches(&candidate) {
        return Ok(candidate);
    }

    Err(missing())
}

/// Object key for a file found under a walk root
///
/// The key is the path relative to `root`, joined with `/` regardless of
/// platform.
pub fn object_key(root: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        Error::InvalidPath(format!(
            "{} is not under {}",
            file.display(),
            root.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidPath(format!(
                    "unexpected component in {}",
                    relative.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} has no file name",
            file.display()
        )));
    }

    Ok(parts.join("/"))
}

/// Key used on a given pass of a repeating batch upload
///
/// The first pass (iteration 0) keeps the key unchanged; later passes append
/// `_<iteration>` so they never overwrite earlier objects.
pub fn loop_key(key: &str, iteration: u64) -> String {
    if iteration == 0 {
        key.to_string()
    } else {
        format!("{key}_{iteration}")
    }
}
