//! File objects for the regular files of a live directory tree.
//!
//! Each file gets its stat fields and MD5/SHA-1 digests. Hashing can be
//! spread over a `rayon` pool; output order always follows the walk.

use crate::error::{Error, Result};
use crate::hashing::hash_file;
use crate::objects::{FileObject, NameType, Timestamp};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Options for [`walk_with`].
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Record only the file name instead of the walked path
    pub basename_only: bool,
    /// Follow symbolic links
    pub follow_links: bool,
    /// Hashing threads; 1 hashes on the calling thread
    pub jobs: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            basename_only: false,
            follow_links: false,
            jobs: 1,
        }
    }
}

/// Walks `dir` and returns one file object per regular file.
pub fn walk_directory(dir: &Path, recursive: bool, basename_only: bool) -> Result<Vec<FileObject>> {
    walk_with(
        dir,
        &WalkOptions {
            recursive,
            basename_only,
            ..Default::default()
        },
    )
}

/// Walks `dir` with explicit options.
pub fn walk_with(dir: &Path, options: &WalkOptions) -> Result<Vec<FileObject>> {
    if !fs::metadata(dir)?.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }

    let mut walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(options.follow_links)
        .sort_by_file_name();
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in walker {
        match entry {
            Ok(e) if e.file_type().is_file() => paths.push(e.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Error walking directory: {}", e),
        }
    }
    debug!("Found {} files", paths.len());

    let basename_only = options.basename_only;
    if options.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(std::io::Error::other)?;
        Ok(pool.install(|| {
            paths
                .par_iter()
                .map(|p| path_to_fileobject(p, basename_only))
                .collect()
        }))
    } else {
        Ok(paths
            .iter()
            .map(|p| path_to_fileobject(p, basename_only))
            .collect())
    }
}

fn system_time_to_timestamp(st: SystemTime) -> Timestamp {
    let datetime: DateTime<Utc> = st.into();
    Timestamp::new(datetime.fixed_offset())
}

/// Builds a file object from a path. Failures are recorded in `error`.
fn path_to_fileobject(path: &Path, basename_only: bool) -> FileObject {
    let name = if basename_only {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        path.to_string_lossy().into_owned()
    };
    let mut fobj = FileObject::with_filename(name);
    fobj.name_type = Some(NameType::Regular);
    fobj.alloc = Some(true);

    match fs::metadata(path) {
        Ok(metadata) => populate_from_stat(&mut fobj, &metadata),
        Err(e) => {
            fobj.error = Some(format!("Failed to get metadata: {}", e));
            return fobj;
        }
    }

    match hash_file(path) {
        Ok(hashes) => fobj.hashes = hashes,
        Err(e) => fobj.error = Some(format!("Error reading file for hashing: {}", e)),
    }
    debug!(path = %path.display(), "walked");
    fobj
}

fn populate_from_stat(fobj: &mut FileObject, metadata: &Metadata) {
    fobj.filesize = Some(metadata.len());
    if let Ok(mtime) = metadata.modified() {
        fobj.mtime = Some(system_time_to_timestamp(mtime));
    }
    if let Ok(atime) = metadata.accessed() {
        fobj.atime = Some(system_time_to_timestamp(atime));
    }
    if let Ok(crtime) = metadata.created() {
        fobj.crtime = Some(system_time_to_timestamp(crtime));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        fobj.inode = Some(metadata.ino());
        fobj.mode = Some(metadata.mode());
        fobj.nlink = Some(metadata.nlink());
        fobj.uid = Some(metadata.uid());
        fobj.gid = Some(metadata.gid());
        // Inode change time
        if let Some(ctime) = DateTime::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32) {
            fobj.ctime = Some(Timestamp::new(ctime.fixed_offset()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), b"").unwrap();
        dir
    }

    fn names(files: &[FileObject]) -> Vec<String> {
        files.iter().filter_map(|f| f.filename.clone()).collect()
    }

    #[test]
    fn test_flat_walk() {
        let dir = tree();
        let files = walk_directory(dir.path(), false, true).unwrap();
        assert_eq!(names(&files), ["a.txt"]);

        let a = &files[0];
        assert_eq!(a.filesize, Some(3));
        assert_eq!(a.name_type, Some(NameType::Regular));
        assert_eq!(
            a.hashes.sha1.as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            a.hashes.md5.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
        assert!(a.mtime.is_some());
        assert!(a.error.is_none());
    }

    #[test]
    fn test_recursive_walk_keeps_paths() {
        let dir = tree();
        let files = walk_directory(dir.path(), true, false).unwrap();
        let expected: Vec<String> = [dir.path().join("a.txt"), dir.path().join("sub").join("b.txt")]
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names(&files), expected);
        assert_eq!(files[1].filesize, Some(0));
        assert_eq!(
            files[1].hashes.md5.as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
    }

    #[test]
    fn test_parallel_walk_preserves_order() {
        let dir = tree();
        for i in 0..20 {
            fs::write(dir.path().join(format!("f{:02}", i)), i.to_string()).unwrap();
        }
        let options = WalkOptions {
            recursive: true,
            basename_only: true,
            jobs: 4,
            ..Default::default()
        };
        let parallel = walk_with(dir.path(), &options).unwrap();
        let serial = walk_directory(dir.path(), true, true).unwrap();
        assert_eq!(names(&parallel), names(&serial));
        assert_eq!(parallel.len(), 22);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_directory(&dir.path().join("nope"), false, false).is_err());
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(walk_directory(&file, false, false).is_err());
    }
}
