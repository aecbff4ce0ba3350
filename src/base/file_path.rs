//! Normalized, cheaply clonable file identity.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A file identity used as the key of the snapshot.
///
/// Paths are lexically normalized (`.` and `..` collapsed, `/` separators) when
/// constructed so that the same file reached through different include paths
/// maps to the same key. No filesystem access happens here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(Arc<str>);

impl FilePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(normalize(path.as_ref()).as_str()))
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    /// The directory containing this file, or `None` for a bare file name.
    pub fn parent(&self) -> Option<FilePath> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            return Some(FilePath(Arc::from("/")));
        }
        Some(FilePath(Arc::from(&self.0[..idx])))
    }

    /// Join a relative path onto this path, treating `self` as a directory.
    pub fn join(&self, relative: &str) -> FilePath {
        if relative.starts_with('/') {
            return FilePath::new(relative);
        }
        FilePath::new(format!("{}/{}", self.0, relative))
    }

    /// File name component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let dot = name.rfind('.')?;
        (dot > 0).then(|| &name[dot + 1..])
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilePath {
    fn from(value: &str) -> Self {
        FilePath::new(value)
    }
}

impl From<&Path> for FilePath {
    fn from(value: &Path) -> Self {
        FilePath::from_path(value)
    }
}

impl From<PathBuf> for FilePath {
    fn from(value: PathBuf) -> Self {
        FilePath::from_path(&value)
    }
}

/// Lexically normalize a path: unify separators, drop `.`, resolve `..`.
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            Component::Normal(part) => parts.push(part.to_str().unwrap_or_default()),
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_str().unwrap_or_default()),
        }
    }

    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_dot_segments() {
        assert_eq!(FilePath::new("/src/./a/../b.h").as_str(), "/src/b.h");
        assert_eq!(FilePath::new("src\\x.cpp").as_str(), "src/x.cpp");
        assert_eq!(FilePath::new("../x.h").as_str(), "../x.h");
    }

    #[test]
    fn test_parent_and_join() {
        let path = FilePath::new("/project/src/main.cpp");
        let dir = path.parent().unwrap();
        assert_eq!(dir.as_str(), "/project/src");
        assert_eq!(dir.join("../include/foo.h").as_str(), "/project/include/foo.h");
        assert_eq!(path.file_name(), "main.cpp");
        assert_eq!(path.extension(), Some("cpp"));
    }
}
