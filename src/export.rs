use crate::orchestrator::ViewModel;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the view model as pretty-printed JSON.
pub fn export_json(path: &Path, vm: &ViewModel) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(vm).context("serialize view model")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), runs = vm.run_count(), "exported view model");
    Ok(())
}
