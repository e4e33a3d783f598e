///! On-disk copy of the last successfully fetched element text
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

const CACHE_FILE_NAME: &str = "tle_cache.txt";

/// Get the path to the cached element text
pub fn get_cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(CACHE_FILE_NAME)
}

/// Load the cached text, `None` if nothing has been cached yet
pub async fn load_cached_text(cache_dir: &Path) -> Result<Option<String>> {
    let path = get_cache_path(cache_dir);
    if !path.exists() {
        return Ok(None);
    }

    let text = fs::read_to_string(&path)
        .await
        .context(format!("Failed to read TLE cache: {:?}", path))?;
    Ok(Some(text))
}

/// Write the text through a temporary file so readers never see a partial cache
pub async fn save_cached_text(cache_dir: &Path, text: &str) -> Result<()> {
    fs::create_dir_all(cache_dir)
        .await
        .context(format!("Failed to create cache directory: {:?}", cache_dir))?;

    let path = get_cache_path(cache_dir);
    let tmp_path = path.with_extension("txt.tmp");

    fs::write(&tmp_path, text)
        .await
        .context(format!("Failed to write TLE cache: {:?}", tmp_path))?;
    fs::rename(&tmp_path, &path)
        .await
        .context(format!("Failed to move TLE cache into place: {:?}", path))?;

    tracing::debug!("Saved {} bytes of TLE data to {:?}", text.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("sattrack_cache_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir).await;

        assert!(load_cached_text(&dir).await.unwrap().is_none());

        save_cached_text(&dir, "ISS\nline1\nline2\n").await.unwrap();
        let loaded = load_cached_text(&dir).await.unwrap();
        assert_eq!(loaded.as_deref(), Some("ISS\nline1\nline2\n"));
        assert!(!get_cache_path(&dir).with_extension("txt.tmp").exists());

        let _ = fs::remove_dir_all(&dir).await;
    }
}
