//! In-process archive cache and the import scan over it.

use std::collections::HashMap;

use crucible_lang::ImportResolver;
use crucible_types::PkgPath;

/// Package path → compiled archive. Monotonic within a session: entries
/// are added by local compilation or by decoding fetched bytes, and are
/// never evicted. A failed run leaves previous entries in place.
#[derive(Debug)]
pub struct ArchiveCache<A> {
    entries: HashMap<PkgPath, A>,
}

impl<A> Default for ArchiveCache<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<A> ArchiveCache<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &PkgPath) -> Option<&A> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &PkgPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert an archive, replacing any previous entry for the path.
    /// Replacement only happens on an explicit retry path; within one
    /// attempt every key is written at most once.
    pub fn insert(&mut self, path: PkgPath, archive: A) {
        if self.entries.insert(path.clone(), archive).is_some() {
            tracing::debug!(%path, "archive cache entry replaced");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two-phase import resolution over a cache view.
///
/// `resolve` hands back a cached archive when present and otherwise
/// records the miss, ordered and deduplicated, so that a single compile
/// or decode pass surfaces every missing dependency at once. The pending
/// set is taken out explicitly with [`ImportScan::into_missing`]; a
/// fresh scan is built for every attempt.
#[derive(Debug)]
pub struct ImportScan<'c, A> {
    cache: &'c ArchiveCache<A>,
    missing: Vec<PkgPath>,
}

impl<'c, A> ImportScan<'c, A> {
    #[must_use]
    pub fn new(cache: &'c ArchiveCache<A>) -> Self {
        Self {
            cache,
            missing: Vec::new(),
        }
    }

    /// The recorded misses, in first-request order.
    #[must_use]
    pub fn into_missing(self) -> Vec<PkgPath> {
        self.missing
    }
}

impl<A: Clone> ImportResolver<A> for ImportScan<'_, A> {
    fn resolve(&mut self, path: &PkgPath) -> Option<A> {
        if let Some(archive) = self.cache.get(path) {
            return Some(archive.clone());
        }
        if !self.missing.contains(path) {
            self.missing.push(path.clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveCache, ImportScan};
    use crucible_lang::ImportResolver;
    use crucible_types::PkgPath;

    fn pkg(p: &str) -> PkgPath {
        PkgPath::new(p).unwrap()
    }

    #[test]
    fn cache_is_monotonic() {
        let mut cache: ArchiveCache<u32> = ArchiveCache::new();
        assert!(cache.is_empty());
        cache.insert(pkg("a"), 1);
        cache.insert(pkg("b"), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&pkg("a")), Some(&1));
        // Replacement is allowed (explicit retry), the entry stays.
        cache.insert(pkg("a"), 3);
        assert_eq!(cache.get(&pkg("a")), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn scan_records_ordered_deduped_misses() {
        let mut cache: ArchiveCache<u32> = ArchiveCache::new();
        cache.insert(pkg("cached"), 7);

        let mut scan = ImportScan::new(&cache);
        assert_eq!(scan.resolve(&pkg("cached")), Some(7));
        assert_eq!(scan.resolve(&pkg("z")), None);
        assert_eq!(scan.resolve(&pkg("a")), None);
        assert_eq!(scan.resolve(&pkg("z")), None);
        assert_eq!(scan.into_missing(), vec![pkg("z"), pkg("a")]);
    }

    #[test]
    fn fresh_scan_starts_empty() {
        let cache: ArchiveCache<u32> = ArchiveCache::new();
        let scan = ImportScan::new(&cache);
        assert!(scan.into_missing().is_empty());
    }
}
