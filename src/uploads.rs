use crate::document::DocumentKind;
use std::path::{Path, PathBuf};

/// Store a copy of an accepted upload as `<dir>/<uuid>.<ext>`.
///
/// The directory is created on first use.
pub async fn archive(dir: &Path, bytes: &[u8], kind: DocumentKind) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let filename = format!("{}.{}", uuid::Uuid::new_v4().simple(), kind.extension());
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;

    Ok(path)
}
