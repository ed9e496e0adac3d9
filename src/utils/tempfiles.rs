use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

/// Get the temporary path the archive is written to before the final rename.
pub fn temp_path_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PackagePaths::get().pkg_name().to_string());
    output.parent().unwrap_or(Path::new("")).join(format!(
        "{name}.{}",
        PackagePaths::get().temp_suffix()
    ))
}

/// Remove a stale temp archive left over from an interrupted run and return the temp path.
pub fn prepare_output_work_path(output: &Path) -> Result<PathBuf> {
    let temp_path = temp_path_for(output);
    if temp_path.exists() {
        fs::remove_file(&temp_path)
            .with_context(|| format!("remove stale temp archive at {}", temp_path.display()))?;
    }
    Ok(temp_path)
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp archive to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}
