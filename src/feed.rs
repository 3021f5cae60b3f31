//! Crawl feeds on disk: JSON arrays of scraped items.

use crate::item::RawItem;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name crawls write their items to.
pub const FEED_FILE: &str = "feed.json";

/// Crawl output directories and the kind of items they hold.
const HINT_DIRS: &[(&str, &str)] = &[("_lst", "listing"), ("_src", "source")];

/// Expands each path into feed files: files are taken as-is, directories are
/// searched recursively for `feed.json`. Results are sorted.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut feeds = Vec::new();
    for path in paths {
        if path.is_file() {
            feeds.push(path.clone());
        } else if path.is_dir() {
            collect(path, &mut feeds)?;
        } else {
            anyhow::bail!("Feed path not found: {}", path.display());
        }
    }
    feeds.sort();
    feeds.dedup();
    debug!("Discovered {} feed files", feeds.len());
    Ok(feeds)
}

fn collect(dir: &Path, feeds: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?.path();
        if path.is_dir() {
            collect(&path, feeds)?;
        } else if path.file_name().is_some_and(|n| n == FEED_FILE) {
            feeds.push(path);
        }
    }
    Ok(())
}

/// Guesses the discriminator hint from the crawl directory a feed sits in.
pub fn infer_hint(path: &Path) -> Option<&'static str> {
    path.components().rev().find_map(|component| {
        let name = component.as_os_str().to_str()?;
        HINT_DIRS.iter().find(|(dir, _)| name.ends_with(dir)).map(|(_, hint)| *hint)
    })
}

/// Reads all items from one feed file.
pub fn read(path: &Path) -> Result<Vec<RawItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse feed: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_infer_hint() {
        assert_eq!(infer_hint(Path::new("out/idealista_lst/2024-03-01/feed.json")), Some("listing"));
        assert_eq!(infer_hint(Path::new("out/idealista_src/feed.json")), Some("source"));
        assert_eq!(infer_hint(Path::new("out/_lst/feed.json")), Some("listing"));
        assert_eq!(infer_hint(Path::new("out/misc/feed.json")), None);
    }

    #[test]
    fn test_discover_recursive() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("a_lst/run1/feed.json"), "[]");
        write(&dir.path().join("a_src/feed.json"), "[]");
        write(&dir.path().join("a_src/other.json"), "[]");

        let feeds = discover(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(feeds.len(), 2);
        assert!(feeds.iter().all(|f| f.ends_with(FEED_FILE)));
    }

    #[test]
    fn test_discover_explicit_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("items.json");
        write(&file, "[]");

        let feeds = discover(&[file.clone(), file.clone()]).unwrap();
        assert_eq!(feeds, vec![file]);
    }

    #[test]
    fn test_discover_missing_path() {
        let err = discover(&[PathBuf::from("/nonexistent/feeds")]).unwrap_err();
        assert!(err.to_string().contains("Feed path not found"));
    }

    #[test]
    fn test_read_feed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("feed.json");
        write(&file, r#"[{"discriminator": "apartment", "bedrooms": 2}, {"text": "Loft"}]"#);

        let items = read(&file).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text("text").as_deref(), Some("Loft"));
    }

    #[test]
    fn test_read_invalid_feed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("feed.json");
        write(&file, r#"{"not": "an array"}"#);

        let err = read(&file).unwrap_err();
        assert!(err.to_string().contains("Failed to parse feed"));
    }
}
