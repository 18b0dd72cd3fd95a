//! Selective extraction of downloaded bags
//!
//! A bag unpacks to `<resource_id>/data/contents/...` plus metadata files.
//! Only the direct children of the contents directory end up in the output
//! directory; everything else is discarded with the scratch directory.

use hydrofetch_errors::{Error, ProviderError, StorageError};
use hydrofetch_events::{EventEmitter, FetchEvent};
use hydrofetch_net::ArchiveStream;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tokio::{fs, task};
use walkdir::WalkDir;

/// Name of the spooled archive inside the scratch directory
const BUNDLE_FILE: &str = "bundle.zip";
/// Directory the archive is unpacked into, inside the scratch directory
const UNPACK_DIR: &str = "unpacked";

/// Path of the content subtree relative to the unpacked bag root
#[must_use]
pub fn contents_path(resource_id: &str) -> PathBuf {
    Path::new(resource_id).join("data").join("contents")
}

/// Where scratch directories are created
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub scratch_root: PathBuf,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
        }
    }
}

/// Outcome of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub resource_id: String,
    /// Size of the downloaded archive
    pub bytes: u64,
    /// Names of the entries moved into the output directory, sorted
    pub entries: Vec<String>,
    pub output_dir: PathBuf,
}

/// Unpack `stream` and move `<resource_id>/data/contents/*` into `output_dir`.
///
/// The archive is spooled and unpacked inside a fresh scratch directory
/// under `options.scratch_root`. The scratch directory is removed whether
/// extraction succeeds or fails; a failed removal is reported as a
/// `CleanupFailed` event rather than an error.
///
/// Entries already moved stay in `output_dir` when a later one fails.
///
/// # Errors
///
/// - `StorageError::ScratchDir` if the scratch directory cannot be created
/// - `ProviderError::ArchiveFormat` if the stream is not a readable zip
/// - `ProviderError::LayoutMismatch` if the contents directory is missing
/// - `StorageError::AlreadyExists` if an entry is already in `output_dir`
/// - I/O and transport errors while spooling or moving
pub async fn extract_bundle(
    stream: ArchiveStream,
    resource_id: &str,
    output_dir: &Path,
    options: &ExtractOptions,
    tx: &impl EventEmitter,
) -> Result<ExtractReport, Error> {
    fs::create_dir_all(&options.scratch_root)
        .await
        .map_err(|e| scratch_error(&options.scratch_root, &e))?;
    let scratch = tempfile::Builder::new()
        .prefix("hydrofetch-")
        .tempdir_in(&options.scratch_root)
        .map_err(|e| scratch_error(&options.scratch_root, &e))?;

    let mut context = HashMap::from([
        ("path".to_string(), scratch.path().display().to_string()),
        ("source".to_string(), stream.source().to_string()),
    ]);
    if let Some(length) = stream.content_length() {
        context.insert("content_length".to_string(), length.to_string());
    }
    tx.emit_debug_with_context("Created scratch directory", context);

    let result = unpack_and_relocate(stream, resource_id, scratch.path(), output_dir, tx).await;

    let scratch_path = scratch.path().display().to_string();
    if let Err(e) = scratch.close() {
        tx.emit_fetch(FetchEvent::CleanupFailed {
            path: scratch_path,
            error: e.to_string(),
        });
    }

    result
}

async fn unpack_and_relocate(
    stream: ArchiveStream,
    resource_id: &str,
    scratch: &Path,
    output_dir: &Path,
    tx: &impl EventEmitter,
) -> Result<ExtractReport, Error> {
    let archive_path = scratch.join(BUNDLE_FILE);
    let bytes = stream.spool_to(&archive_path).await?;
    tx.emit_fetch(FetchEvent::Downloaded {
        resource_id: resource_id.to_string(),
        bytes,
    });

    let unpacked = scratch.join(UNPACK_DIR);
    unpack_zip(archive_path, unpacked.clone()).await?;

    let contents = unpacked.join(contents_path(resource_id));
    if !fs::metadata(&contents)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        return Err(ProviderError::LayoutMismatch {
            expected: contents_path(resource_id).display().to_string(),
        }
        .into());
    }

    let entries = relocate_children(&contents, output_dir, tx).await?;
    tx.emit_fetch(FetchEvent::Finished {
        resource_id: resource_id.to_string(),
        entries: entries.len(),
    });

    Ok(ExtractReport {
        resource_id: resource_id.to_string(),
        bytes,
        entries,
        output_dir: output_dir.to_path_buf(),
    })
}

/// Unpack a zip archive, skipping entries that would escape `dest_dir`
async fn unpack_zip(archive_path: PathBuf, dest_dir: PathBuf) -> Result<(), Error> {
    task::spawn_blocking(move || {
        let file = File::open(&archive_path).map_err(|e| Error::io_with_path(&e, &archive_path))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| ProviderError::ArchiveFormat {
            message: format!("failed to read zip archive: {e}"),
        })?;

        std::fs::create_dir_all(&dest_dir).map_err(|e| Error::io_with_path(&e, &dest_dir))?;

        // Directory modes are applied once their files are written
        let mut dir_modes = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ProviderError::ArchiveFormat {
                    message: format!("failed to read zip entry {i}: {e}"),
                })?;

            let Some(outpath) = entry.enclosed_name().map(|path| dest_dir.join(path)) else {
                continue;
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::io_with_path(&e, parent))?;
                }
                let mut outfile =
                    File::create(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
                io::copy(&mut entry, &mut outfile).map_err(|e| {
                    if e.kind() == io::ErrorKind::InvalidData {
                        Error::from(ProviderError::ArchiveFormat {
                            message: format!("corrupt entry {}: {e}", entry.name()),
                        })
                    } else {
                        Error::io_with_path(&e, &outpath)
                    }
                })?;
            }

            if let Some(mode) = entry.unix_mode() {
                if entry.is_dir() {
                    dir_modes.push((outpath, mode));
                } else {
                    set_mode(&outpath, mode);
                }
            }
        }

        // Children before parents; the owner keeps full access so the tree
        // can still be relocated and removed
        dir_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        for (path, mode) in dir_modes {
            set_mode(&path, mode | 0o700);
        }

        Ok::<(), Error>(())
    })
    .await
    .map_err(|e| Error::internal(format!("unpack task failed: {e}")))?
}

/// Move every direct child of `contents` into `output_dir`
async fn relocate_children(
    contents: &Path,
    output_dir: &Path,
    tx: &impl EventEmitter,
) -> Result<Vec<String>, Error> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, output_dir))?;

    let mut children = Vec::new();
    let mut dir = fs::read_dir(contents)
        .await
        .map_err(|e| Error::io_with_path(&e, contents))?;
    while let Some(child) = dir
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, contents))?
    {
        children.push(child.file_name());
    }
    children.sort();

    let mut moved = Vec::with_capacity(children.len());
    for name in children {
        let source = contents.join(&name);
        let target = output_dir.join(&name);

        if fs::symlink_metadata(&target).await.is_ok() {
            return Err(StorageError::AlreadyExists {
                path: target.display().to_string(),
            }
            .into());
        }

        move_entry(&source, &target).await?;

        let name = name.to_string_lossy().into_owned();
        tx.emit_fetch(FetchEvent::EntryRelocated { name: name.clone() });
        moved.push(name);
    }

    Ok(moved)
}

/// Rename `source` to `target`, copying and deleting when a rename is not
/// possible (different filesystems)
async fn move_entry(source: &Path, target: &Path) -> Result<(), Error> {
    if fs::rename(source, target).await.is_ok() {
        return Ok(());
    }

    let (source, target) = (source.to_path_buf(), target.to_path_buf());
    task::spawn_blocking(move || {
        copy_tree(&source, &target).map_err(|e| StorageError::from_io_with_path(&e, &target))?;

        let meta =
            std::fs::symlink_metadata(&source).map_err(|e| Error::io_with_path(&e, &source))?;
        if meta.is_dir() {
            std::fs::remove_dir_all(&source)
        } else {
            std::fs::remove_file(&source)
        }
        .map_err(|e| Error::io_with_path(&e, &source))
    })
    .await
    .map_err(|e| Error::internal(format!("copy task failed: {e}")))?
}

fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).map_err(io::Error::other)?;
        let dest = if relative.as_os_str().is_empty() {
            target.to_path_buf()
        } else {
            target.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(source)?, dest)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::fs::copy(source, dest).map(|_| ())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).ok();
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

fn scratch_error(root: &Path, err: &io::Error) -> Error {
    StorageError::ScratchDir {
        message: format!("{}: {err}", root.display()),
    }
    .into()
}
