///! Build a catalog from loosely formatted element text
use super::catalog::TleCatalog;
use super::record::{TleLine, TleRecord, looks_like_tle_line};

/// Scans text for element line pairs and indexes them.
///
/// Input may hold any mix of 2-line and 3-line entries, blank lines and
/// concatenated files; a malformed entry is skipped without aborting the build.
pub struct TleCatalogBuilder;

impl TleCatalogBuilder {
    /// Build from raw text. Returns `None` when no record validated.
    pub fn from_text(text: &str) -> Option<TleCatalog> {
        Self::build(text.lines())
    }

    /// Build from an ordered sequence of lines
    pub fn build<'a, I>(lines: I) -> Option<TleCatalog>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let lines: Vec<&str> = lines.into_iter().map(str::trim_end).collect();
        let mut catalog = TleCatalog::new();
        let mut constructed = 0usize;
        let mut skipped = 0usize;
        let mut replaced = 0usize;

        for (index, line2) in lines.iter().enumerate().skip(1) {
            if !looks_like_tle_line(line2, TleLine::Two) {
                continue;
            }

            let line1 = lines[index - 1];
            let name = index.checked_sub(2).map(|i| lines[i]);

            match TleRecord::new(name, line1, line2) {
                Ok(record) => {
                    if catalog.insert(record) {
                        replaced += 1;
                    }
                    constructed += 1;
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!("Skipping element set ending at line {}: {}", index + 1, e);
                }
            }
        }

        tracing::info!(
            "Number of constructed TLEs: {} ({} skipped, {} replaced by a later entry)",
            constructed,
            skipped,
            replaced
        );

        if catalog.is_empty() {
            None
        } else {
            Some(catalog)
        }
    }
}
