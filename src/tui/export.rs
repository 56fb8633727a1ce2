use super::state::UiState;
use anyhow::{Context, Result};
use time::macros::format_description;

/// Export the current view model next to the working directory.
/// Returns the absolute path of the exported file.
pub fn export_view_model(state: &UiState) -> Result<std::path::PathBuf> {
    let stamp = time::OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("format export timestamp")?;
    let default_name = format!("ethoscope-runs-{stamp}.json");

    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(default_name);
    crate::export::export_json(&path, &state.view)?;
    Ok(path)
}
