use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use super::error::{Error, Result};
use super::host::{EntryKind, Host};

/// Lexically normalize a path: collapse separators, drop `.` components and resolve `..` against
/// the preceding component where one exists. An empty result becomes `.`. Symlinks are not
/// consulted.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            c => out.push(c),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Join `path` onto `base` unless it is already absolute, then clean the result.
pub fn absolutize(base: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let cleaned = clean(&joined);
    if !cleaned.is_absolute() {
        return Err(Error::CouldNotAbsolutize(path.to_string_lossy().to_string()));
    }
    Ok(cleaned)
}

/// Find the directory that should be mounted so `argument` is reachable inside the container.
///
/// Walks from the cleaned argument towards its root until something exists on disk. A file
/// yields its containing directory. Arguments with no existing ancestor yield `None`, and so do
/// absolute arguments whose only existing ancestor is the filesystem root.
pub fn derive_mount_root<A: AsRef<OsStr>>(
    host: &dyn Host,
    argument: A,
) -> Result<Option<PathBuf>> {
    let cleaned = clean(Path::new(argument.as_ref()));
    let mut candidate: Option<&Path> = Some(cleaned.as_path());

    while let Some(path) = candidate {
        if path.as_os_str().is_empty() {
            break;
        }
        if path != cleaned && path.parent().is_none() && path.has_root() {
            // climbed to `/` without matching anything below it
            break;
        }

        if let Some(kind) = host.stat(path) {
            let absolute = absolutize(&host.current_dir()?, path)?;
            let dir = match kind {
                EntryKind::Directory => absolute,
                EntryKind::File => match absolute.parent() {
                    Some(p) => p.to_path_buf(),
                    None => absolute,
                },
            };
            return Ok(Some(dir));
        }

        candidate = path.parent();
    }

    Ok(None)
}

/// Host directories to bind-mount, in the order they were derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSet(Vec<PathBuf>);

impl VolumeSet {
    pub fn new(workdir: PathBuf) -> Self {
        VolumeSet(vec![workdir])
    }

    /// Start from the working directory and add one mount root per argument that names something
    /// on disk.
    pub fn derive<S: AsRef<OsStr>>(host: &dyn Host, workdir: PathBuf, args: &[S]) -> Result<Self> {
        let mut volumes = VolumeSet::new(workdir);
        for arg in args {
            match derive_mount_root(host, arg.as_ref())? {
                Some(dir) => {
                    log::debug!("mounting {} for argument {:?}", dir.display(), arg.as_ref());
                    volumes.push(dir);
                }
                None => log::trace!("argument {:?} names no path", arg.as_ref()),
            }
        }
        Ok(volumes)
    }

    pub fn push(&mut self, dir: PathBuf) {
        self.0.push(dir);
    }

    pub fn workdir(&self) -> &Path {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
