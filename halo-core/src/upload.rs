//! Upload coordinator and download.
//!
//! A batch is saved one file at a time in input order; failures are collected
//! per file so the rest of the batch still lands.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::StoredFile;
use crate::error::{HaloError, Result};
use crate::files::FileStore;

pub const FALLBACK_MIME: &str = "application/octet-stream";

/// One file picked for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,
    /// Record name: the file name component of `path`.
    pub name: String,
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub saved: Vec<String>,
    pub failed: Vec<(String, HaloError)>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Expand the picked paths into files. Directories are walked only when `recursive`.
pub fn collect_sources(paths: &[PathBuf], recursive: bool) -> Vec<Source> {
    let mut out = Vec::new();
    for p in paths {
        if p.is_dir() {
            if !recursive {
                tracing::warn!(path = %p.display(), "skipping directory (use --recursive)");
                continue;
            }
            let mut files: Vec<PathBuf> = walkdir::WalkDir::new(p)
                .into_iter()
                .filter_map(|e| match e {
                    Ok(e) => Some(e),
                    Err(err) => {
                        let at = err.path().map(|p| p.display().to_string());
                        tracing::warn!(path = ?at, error = %err, "skipping unreadable entry");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            files.sort();
            out.extend(files.into_iter().filter_map(source_for));
        } else if let Some(s) = source_for(p.clone()) {
            out.push(s);
        }
    }
    out
}

fn source_for(path: PathBuf) -> Option<Source> {
    let name = path.file_name()?.to_string_lossy().to_string();
    Some(Source { path, name })
}

/// Advisory MIME type from the file extension.
pub fn guess_mime(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return FALLBACK_MIME,
    };
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        _ => FALLBACK_MIME,
    }
}

/// Save every source in order. `mime_override` replaces guessing for the whole batch.
pub async fn upload(
    store: &FileStore,
    sources: &[Source],
    mime_override: Option<&str>,
) -> UploadReport {
    let mut report = UploadReport::default();
    for src in sources {
        match upload_one(store, src, mime_override).await {
            Ok(size) => {
                tracing::info!(name = %src.name, size, "uploaded");
                report.saved.push(src.name.clone());
            }
            Err(e) => {
                tracing::warn!(name = %src.name, error = %e, "upload failed");
                report.failed.push((src.name.clone(), e));
            }
        }
    }
    report
}

async fn upload_one(store: &FileStore, src: &Source, mime_override: Option<&str>) -> Result<u64> {
    let data = tokio::fs::read(&src.path).await?;
    let mime = mime_override.unwrap_or_else(|| guess_mime(&src.name));
    let file = StoredFile::new(src.name.clone(), mime, data);
    let size = file.size();
    store.save(file).await?;
    Ok(size)
}

/// Write the stored bytes of `name` to `dest_dir/name`, replacing any file there.
pub async fn download(store: &FileStore, name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let file = store
        .get(name)
        .await?
        .ok_or_else(|| HaloError::NotFound(name.to_string()))?;
    let file_name = Path::new(&file.name)
        .file_name()
        .ok_or_else(|| HaloError::Format(format!("cannot download {name:?} as a file")))?
        .to_owned();
    let target = dest_dir.join(file_name);
    let dest_dir = dest_dir.to_path_buf();
    let out = target.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        std::fs::create_dir_all(&dest_dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dest_dir)?;
        tmp.write_all(&file.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&out).map_err(|e| HaloError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(HaloError::op_failed)??;
    tracing::info!(name, path = %target.display(), "downloaded");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mime_guessing() {
        assert_eq!(guess_mime("a.TXT"), "text/plain");
        assert_eq!(guess_mime("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("Makefile"), FALLBACK_MIME);
        assert_eq!(guess_mime("blob.unknownext"), FALLBACK_MIME);
    }

    #[test]
    fn directories_need_recursive() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("docs");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("b.txt"), b"b").unwrap();
        std::fs::write(dir.join("sub").join("a.txt"), b"a").unwrap();
        let single = tmp.path().join("single.bin");
        std::fs::write(&single, b"s").unwrap();

        let flat = collect_sources(&[dir.clone(), single.clone()], false);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].name, "single.bin");

        let deep = collect_sources(&[single, dir], true);
        let names: Vec<_> = deep.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["single.bin", "b.txt", "a.txt"]);
    }
}
