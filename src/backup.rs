use anyhow::{anyhow, Context};
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::db;
use crate::store;

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/school.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "schoold-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub asset_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub asset_count: usize,
}

fn collect_assets(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for ent in std::fs::read_dir(dir)? {
        let p = ent?.path();
        if p.is_dir() {
            collect_assets(&p, out)?;
        } else if p.is_file() {
            out.push(p);
        }
    }
    Ok(())
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(db::DB_FILE);
    if !db_path.is_file() {
        return Err(anyhow!(
            "workspace database not found: {}",
            db_path.to_string_lossy()
        ));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    let mut db_file = File::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    std::io::copy(&mut db_file, &mut zip).context("failed to write database entry")?;

    let assets_root = workspace_path.join(store::ASSETS_DIR);
    let mut asset_files = Vec::new();
    if assets_root.is_dir() {
        collect_assets(&assets_root, &mut asset_files)?;
    }
    for abs in &asset_files {
        let rel = abs
            .strip_prefix(workspace_path)
            .context("asset path outside workspace")?;
        let entry_name = rel.to_string_lossy().replace('\\', "/");
        zip.start_file(&entry_name, opts)
            .with_context(|| format!("failed to start asset entry {}", entry_name))?;
        let mut f = File::open(abs)
            .with_context(|| format!("failed to open asset {}", abs.to_string_lossy()))?;
        std::io::copy(&mut f, &mut zip)
            .with_context(|| format!("failed to write asset entry {}", entry_name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        asset_count: asset_files.len(),
    })
}

pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;
    let dst = workspace_path.join(db::DB_FILE);

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    // Extract the database beside the live file, then swap with a rename so a
    // failed extraction never clobbers the existing workspace.
    let tmp_dst = workspace_path.join(format!("{}.importing", db::DB_FILE));
    if tmp_dst.exists() {
        let _ = std::fs::remove_file(&tmp_dst);
    }
    let mut db_out = File::create(&tmp_dst).with_context(|| {
        format!(
            "failed to create temp database {}",
            tmp_dst.to_string_lossy()
        )
    })?;
    {
        let mut db_entry = archive
            .by_name(DB_ENTRY)
            .with_context(|| format!("bundle missing {}", DB_ENTRY))?;
        std::io::copy(&mut db_entry, &mut db_out).context("failed to extract database entry")?;
    }
    db_out
        .flush()
        .context("failed to flush extracted database")?;

    if dst.exists() {
        std::fs::remove_file(&dst).with_context(|| {
            format!(
                "failed to remove existing database {}",
                dst.to_string_lossy()
            )
        })?;
    }
    std::fs::rename(&tmp_dst, &dst).with_context(|| {
        format!(
            "failed to move extracted database to {}",
            dst.to_string_lossy()
        )
    })?;

    store::ensure_layout(workspace_path)?;
    let mut asset_count = 0usize;
    let prefix = format!("{}/", store::ASSETS_DIR);
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("failed to read bundle entry")?;
        let name = entry.name().to_string();
        if !name.starts_with(&prefix) || name.ends_with('/') {
            continue;
        }
        // Reject entries that would write outside the workspace.
        if name.contains("..") {
            return Err(anyhow!("bundle entry escapes workspace: {}", name));
        }
        let out = workspace_path.join(&name);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut f = File::create(&out)
            .with_context(|| format!("failed to create asset {}", out.to_string_lossy()))?;
        std::io::copy(&mut entry, &mut f)
            .with_context(|| format!("failed to extract asset {}", name))?;
        asset_count += 1;
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        asset_count,
    })
}
