//! Single-model backup archives.
//!
//! A backup is a zip whose entries are paths relative to the model store
//! root (`blobs/sha256-...`, `manifests/registry.ollama.ai/...`), so it can
//! be restored into any store root. Files are written through a temp file
//! and renamed into place, which keeps concurrent restores of models that
//! share blobs from observing half-written files.

use crate::config::StoreConfig;
use crate::error::{Result, ToolError};
use crate::store::{ModelFileSet, ModelIdentifier};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// File name of the backup archive for a model: `<name>-<version>.zip`.
pub fn archive_file_name(model: &ModelIdentifier) -> String {
    format!(
        "{}-{}.{}",
        model.name().replace('/', "_"),
        model.version(),
        StoreConfig::ARCHIVE_EXTENSION
    )
}

/// Write every file of `files` into a new zip at `destination`.
///
/// The parent directory is created if needed. The archive only appears at
/// `destination` once it is complete.
pub fn create_archive(files: &ModelFileSet, destination: &Path) -> Result<()> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| ToolError::io_with_path(e, parent))?;

    let temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(StoreConfig::PARTIAL_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| ToolError::io_with_path(e, parent))?;

    let count = write_entries(files, temp.as_file())?;

    temp.persist(destination)
        .map_err(|e| ToolError::io_with_path(e.error, destination))?;

    info!("Wrote {} file(s) to {}", count, destination.display());
    Ok(())
}

fn write_entries(files: &ModelFileSet, out: &File) -> Result<usize> {
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let mut count = 0;

    for source in files.files() {
        let entry = entry_name(&files.store_root, source)?;
        debug!("Adding {} as {}", source.display(), entry);

        zip.start_file(entry, entry_options())?;
        let mut input = File::open(source).map_err(|e| ToolError::io_with_path(e, source))?;
        io::copy(&mut input, &mut zip).map_err(|e| ToolError::io_with_path(e, source))?;
        count += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(count)
}

/// Blobs are already compressed model weights; store them as-is.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true)
}

/// Archive entry name for `path`: relative to the store root, `/`-separated.
fn entry_name(store_root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(store_root).map_err(|_| ToolError::Archive {
        message: format!("{} is outside the model store", path.display()),
        path: Some(path.to_path_buf()),
    })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Extract every entry of the zip at `source` into `destination_root`.
///
/// Returns the number of files written. Entries that would land outside
/// `destination_root` make the whole archive fail before anything is
/// written. Files already written when a later entry fails are left in
/// place.
pub fn restore_archive(source: &Path, destination_root: &Path) -> Result<usize> {
    let file = File::open(source).map_err(|e| ToolError::io_with_path(e, source))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| ToolError::Archive {
            message: format!("Invalid zip archive: {}", e),
            path: Some(source.to_path_buf()),
        })?;

    let mut plan = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| ToolError::Archive {
            message: format!("Failed to read zip entry {}: {}", i, e),
            path: Some(source.to_path_buf()),
        })?;
        let Some(enclosed) = entry.enclosed_name() else {
            return Err(ToolError::UnsafeArchiveEntry {
                archive: source.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        plan.push((store_relative(&enclosed), entry.is_dir()));
    }

    fs::create_dir_all(destination_root)
        .map_err(|e| ToolError::io_with_path(e, destination_root))?;

    let mut written = 0;
    for (i, (relative, is_dir)) in plan.into_iter().enumerate() {
        let outpath = destination_root.join(&relative);
        if is_dir {
            fs::create_dir_all(&outpath).map_err(|e| ToolError::io_with_path(e, &outpath))?;
            continue;
        }

        let parent = outpath.parent().unwrap_or(destination_root);
        fs::create_dir_all(parent).map_err(|e| ToolError::io_with_path(e, parent))?;

        let mut entry = archive.by_index(i).map_err(|e| ToolError::Archive {
            message: format!("Failed to read zip entry {}: {}", i, e),
            path: Some(source.to_path_buf()),
        })?;

        let mut temp =
            NamedTempFile::new_in(parent).map_err(|e| ToolError::io_with_path(e, parent))?;
        io::copy(&mut entry, &mut temp).map_err(|e| ToolError::io_with_path(e, &outpath))?;

        // Temp files are created owner-only; restored files must stay
        // readable by the daemon's own user.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = entry.unix_mode().map_or(0o644, |m| m & 0o777);
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(mode))
                .map_err(|e| ToolError::io_with_path(e, &outpath))?;
        }

        temp.persist(&outpath)
            .map_err(|e| ToolError::io_with_path(e.error, &outpath))?;

        debug!("Restored {}", outpath.display());
        written += 1;
    }

    info!(
        "Restored {} file(s) from {} into {}",
        written,
        source.display(),
        destination_root.display()
    );
    Ok(written)
}

/// Drop any leading components before the store layout.
///
/// Older backups stored whole-filesystem paths such as
/// `usr/share/ollama/.ollama/models/blobs/sha256-...`; those restore to
/// `blobs/sha256-...`. A manifest is recognised by `manifests/<registry
/// host>/...` at least four levels deep, a blob by sitting directly under
/// `blobs`. Directories of the same names elsewhere in the original path
/// are kept out of the result.
fn store_relative(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();
    let len = components.len();
    let name = |i: usize| components[i].as_os_str().to_string_lossy();

    let manifest_start = (0..len.saturating_sub(4)).rev().find(|&i| {
        name(i) == StoreConfig::MANIFESTS_DIR && name(i + 1).contains(['.', ':'])
    });
    let start = match manifest_start {
        Some(i) => i,
        None if len >= 2 && name(len - 2) == StoreConfig::BLOBS_DIR => len - 2,
        None => 0,
    };
    components[start..].iter().collect()
}

/// Backup archives at `path`: the file itself, or every `*.zip` directly
/// inside a directory, sorted.
pub fn find_archives(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(ToolError::io_with_path(
            io::Error::new(io::ErrorKind::NotFound, "backup path does not exist"),
            path,
        ));
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ToolError::Io {
            message: e.to_string(),
            path: e.path().map(Path::to_path_buf),
            source: None,
        })?;
        let is_zip = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == StoreConfig::ARCHIVE_EXTENSION);
        if entry.file_type().is_file() && is_zip {
            archives.push(entry.into_path());
        }
    }
    archives.sort();
    Ok(archives)
}
