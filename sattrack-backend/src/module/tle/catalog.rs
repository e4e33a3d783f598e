///! Dual-keyed, read-only TLE catalog snapshot
use super::record::TleRecord;
use std::collections::HashMap;
use std::sync::Arc;

/// How a search string is resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// All decimal digits
    CatalogNumber(u32),
    /// Short designator, e.g. `98067A` (long forms are rewritten to this)
    InternationalDesignator(String),
}

impl SearchKey {
    /// Classify a search string.
    ///
    /// Checked in order: bare digits, long designator `YYYY-NNNC` (rewritten to
    /// `YYNNNC`), then any other string of at least 6 characters.
    pub fn parse(search: &str) -> Option<Self> {
        if !search.is_empty() && search.chars().all(|c| c.is_ascii_digit()) {
            // Digit strings too large for a catalog number cannot match anything
            return search.parse().ok().map(SearchKey::CatalogNumber);
        }

        let chars: Vec<char> = search.chars().collect();
        if chars.len() < 6 {
            return None;
        }

        if chars[4] == '-' {
            let short: String = chars[2..4].iter().chain(&chars[5..]).collect();
            return Some(SearchKey::InternationalDesignator(short));
        }

        Some(SearchKey::InternationalDesignator(search.to_string()))
    }
}

/// Catalog indexed by catalog number and by international designator.
///
/// Every record is reachable through both maps under its own keys.
#[derive(Debug, Default)]
pub struct TleCatalog {
    by_catalog_number: HashMap<u32, Arc<TleRecord>>,
    by_international_designator: HashMap<String, Arc<TleRecord>>,
}

impl TleCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a record; returns true if it displaced an earlier one.
    ///
    /// A displaced record is removed from both maps so the two indexes always
    /// hold the same set of records.
    pub(crate) fn insert(&mut self, record: TleRecord) -> bool {
        let record = Arc::new(record);
        let number = record.catalog_number();
        let designator = record.international_designator().to_string();
        let mut displaced = false;

        if let Some(old) = self.by_catalog_number.remove(&number) {
            let old_designator = old.international_designator();
            if self
                .by_international_designator
                .get(old_designator)
                .is_some_and(|r| Arc::ptr_eq(r, &old))
            {
                self.by_international_designator.remove(old_designator);
            }
            displaced = true;
        }

        if let Some(old) = self.by_international_designator.remove(&designator) {
            let old_number = old.catalog_number();
            if self
                .by_catalog_number
                .get(&old_number)
                .is_some_and(|r| Arc::ptr_eq(r, &old))
            {
                self.by_catalog_number.remove(&old_number);
            }
            displaced = true;
        }

        self.by_catalog_number.insert(number, record.clone());
        self.by_international_designator.insert(designator, record);
        displaced
    }

    /// Resolve a search string (catalog number, short or long designator)
    pub fn lookup(&self, search: &str) -> Option<Arc<TleRecord>> {
        match SearchKey::parse(search)? {
            SearchKey::CatalogNumber(number) => self.by_catalog_number(number),
            SearchKey::InternationalDesignator(designator) => {
                self.by_international_designator(&designator)
            }
        }
    }

    pub fn by_catalog_number(&self, number: u32) -> Option<Arc<TleRecord>> {
        self.by_catalog_number.get(&number).cloned()
    }

    pub fn by_international_designator(&self, designator: &str) -> Option<Arc<TleRecord>> {
        self.by_international_designator.get(designator).cloned()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.by_catalog_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_catalog_number.is_empty()
    }

    /// Iterate over all records, in no particular order
    pub fn records(&self) -> impl Iterator<Item = &Arc<TleRecord>> {
        self.by_catalog_number.values()
    }
}
