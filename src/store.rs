use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ASSETS_DIR: &str = "assets";

/// Per-entity prefixes mirroring the upload areas of the admin console.
pub const ALLOWED_PREFIXES: [&str; 6] = [
    "students", "staff", "alumni", "banners", "gallery", "notices",
];

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "gif", "pdf"];

pub const MAX_ASSET_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug)]
pub enum StoreError {
    InvalidPrefix(String),
    InvalidType(String),
    TooLarge(usize),
    OutsideRoot(String),
    Io(anyhow::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidPrefix(p) => write!(f, "unknown asset prefix: {}", p),
            StoreError::InvalidType(e) => write!(f, "unsupported file type: {}", e),
            StoreError::TooLarge(n) => {
                write!(f, "file is {} bytes, limit is {}", n, MAX_ASSET_BYTES)
            }
            StoreError::OutsideRoot(p) => write!(f, "path escapes the asset root: {}", p),
            StoreError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidPrefix(_) => "bad_params",
            StoreError::InvalidType(_) => "asset_invalid_type",
            StoreError::TooLarge(_) => "asset_too_large",
            StoreError::OutsideRoot(_) => "bad_params",
            StoreError::Io(_) => "asset_write_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedAsset {
    /// Workspace-relative path, e.g. `assets/students/<uuid>.jpg`. Stored on
    /// the record so deletion can find the file again.
    pub path: String,
    /// Serving URL handed to the front end.
    pub url: String,
    pub sha256: String,
    pub size: usize,
}

pub fn ensure_layout(workspace: &Path) -> anyhow::Result<()> {
    for prefix in ALLOWED_PREFIXES {
        std::fs::create_dir_all(workspace.join(ASSETS_DIR).join(prefix))
            .with_context(|| format!("failed to create asset directory {}", prefix))?;
    }
    Ok(())
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn save(
    workspace: &Path,
    prefix: &str,
    file_name: &str,
    data: &[u8],
) -> Result<SavedAsset, StoreError> {
    if !ALLOWED_PREFIXES.contains(&prefix) {
        return Err(StoreError::InvalidPrefix(prefix.to_string()));
    }
    let ext = extension_of(file_name)
        .ok_or_else(|| StoreError::InvalidType("(no extension)".to_string()))?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(StoreError::InvalidType(ext));
    }
    if data.len() > MAX_ASSET_BYTES {
        return Err(StoreError::TooLarge(data.len()));
    }

    let rel = format!("{}/{}/{}.{}", ASSETS_DIR, prefix, Uuid::new_v4(), ext);
    let abs = workspace.join(&rel);
    std::fs::write(&abs, data)
        .with_context(|| format!("failed to write asset {}", abs.to_string_lossy()))
        .map_err(StoreError::Io)?;

    let mut hasher = Sha256::new();
    hasher.update(data);
    let sha256 = format!("{:x}", hasher.finalize());

    Ok(SavedAsset {
        url: format!("asset://{}", rel),
        path: rel,
        sha256,
        size: data.len(),
    })
}

/// Resolves a stored workspace-relative path back to a file, refusing
/// anything that would leave the asset root.
pub fn resolve(workspace: &Path, rel_path: &str) -> Result<PathBuf, StoreError> {
    let clean = Path::new(rel_path);
    if clean.is_absolute()
        || clean
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(StoreError::OutsideRoot(rel_path.to_string()));
    }
    if !rel_path.starts_with(&format!("{}/", ASSETS_DIR)) {
        return Err(StoreError::OutsideRoot(rel_path.to_string()));
    }
    Ok(workspace.join(clean))
}

pub fn delete(workspace: &Path, rel_path: &str) -> Result<(), StoreError> {
    let abs = resolve(workspace, rel_path)?;
    std::fs::remove_file(&abs)
        .map_err(|e| StoreError::Io(anyhow!("failed to delete {}: {}", rel_path, e)))
}

/// Record deletion keeps going even when the backing file is already gone;
/// the miss is only logged.
pub fn delete_quiet(workspace: &Path, rel_path: &str) {
    if let Err(e) = delete(workspace, rel_path) {
        tracing::warn!(path = rel_path, error = %e, "asset cleanup failed");
    }
}
