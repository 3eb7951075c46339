//! Memoized class-name and file-name lookups.
//!
//! Both caches are bounded moka caches with a TTL. Entries are keyed by the
//! [`SourceQuery::generation`] they were computed at, so a changed index is
//! looked up afresh and the stale entries age out.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use moka::sync::Cache;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::error::SourceError;
use crate::source::{SourceLocation, SourceQuery};

/// Where a name resolved to, grouped by file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveInfo {
    pub locations_by_file: BTreeMap<PathBuf, Vec<SourceLocation>>,
    /// Every location lies outside the project roots.
    pub in_library: bool,
}

impl ResolveInfo {
    pub fn from_locations(locations: Vec<SourceLocation>) -> Self {
        let in_library = !locations.is_empty() && locations.iter().all(|l| l.in_library());
        let mut locations_by_file: BTreeMap<PathBuf, Vec<SourceLocation>> = BTreeMap::new();
        for location in locations {
            locations_by_file
                .entry(location.file.clone())
                .or_default()
                .push(location);
        }
        Self {
            locations_by_file,
            in_library,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locations_by_file.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = &SourceLocation> {
        self.locations_by_file.values().flatten()
    }
}

/// Shared result for names that resolve to nothing.
fn empty_info() -> Arc<ResolveInfo> {
    static EMPTY: OnceLock<Arc<ResolveInfo>> = OnceLock::new();
    Arc::clone(EMPTY.get_or_init(|| Arc::new(ResolveInfo::default())))
}

/// Cache key: the looked-up name and the index generation it was computed at.
type LookupKey = (String, u64);

/// Lookup cache shared by scanners over the same [`SourceQuery`].
///
/// Concurrent misses on one key run a single lookup; the other callers wait
/// for its result.
pub struct ResolutionCache {
    query: Arc<dyn SourceQuery>,
    classes: Cache<LookupKey, Arc<ResolveInfo>>,
    files: Cache<LookupKey, Arc<ResolveInfo>>,
}

impl ResolutionCache {
    pub fn new(query: Arc<dyn SourceQuery>) -> Self {
        Self::with_config(query, &CacheConfig::default())
    }

    pub fn with_config(query: Arc<dyn SourceQuery>, config: &CacheConfig) -> Self {
        Self {
            query,
            classes: build_cache("class", config),
            files: build_cache("file", config),
        }
    }

    pub fn query(&self) -> &Arc<dyn SourceQuery> {
        &self.query
    }

    /// Declarations of a JVM class name.
    pub fn resolve_class(&self, class_name: &str) -> Arc<ResolveInfo> {
        self.lookup(&self.classes, class_name, |query| {
            query.resolve_class_candidates(class_name)
        })
    }

    /// Files carrying the given file name, for frames whose class is unknown.
    pub fn resolve_file(&self, file_name: &str) -> Arc<ResolveInfo> {
        self.lookup(&self.files, file_name, |query| query.files_by_name(file_name))
    }

    /// Whether a current entry exists for the class name.
    pub fn contains_class(&self, class_name: &str) -> bool {
        let key = (class_name.to_string(), self.query.generation());
        self.classes.contains_key(&key)
    }

    /// Drop every entry.
    pub fn invalidate(&self) {
        self.classes.invalidate_all();
        self.files.invalidate_all();
    }

    fn lookup(
        &self,
        cache: &Cache<LookupKey, Arc<ResolveInfo>>,
        name: &str,
        compute: impl FnOnce(&dyn SourceQuery) -> Result<Vec<SourceLocation>, SourceError>,
    ) -> Arc<ResolveInfo> {
        let generation = self.query.generation();
        let result = cache.try_get_with((name.to_string(), generation), || {
            trace!(name, generation, "lookup");
            compute(self.query.as_ref()).map(|locations| {
                if locations.is_empty() {
                    empty_info()
                } else {
                    Arc::new(ResolveInfo::from_locations(locations))
                }
            })
        });

        match result {
            Ok(info) => info,
            Err(err) => {
                match err.as_ref() {
                    SourceError::NotReady => debug!(name, "index not ready, lookup skipped"),
                    other => warn!(name, error = %other, "lookup failed"),
                }
                empty_info()
            }
        }
    }
}

fn build_cache(label: &'static str, config: &CacheConfig) -> Cache<LookupKey, Arc<ResolveInfo>> {
    Cache::builder()
        .max_capacity(config.max_entries)
        .time_to_live(config.ttl())
        .eviction_listener(move |key: Arc<LookupKey>, _value, cause| {
            trace!(cache = label, name = %key.0, generation = key.1, ?cause, "evicted");
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{
        Declaration, JavaSourceIndex, NodeId, SourceFile, SourceOrigin, TypeDesc, TypeParamRef,
    };
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Counts class lookups reaching the index.
    struct Counting {
        index: JavaSourceIndex,
        class_lookups: AtomicUsize,
        delay: Duration,
    }

    impl SourceQuery for Counting {
        fn resolve_class_candidates(
            &self,
            class_name: &str,
        ) -> Result<Vec<SourceLocation>, SourceError> {
            self.class_lookups.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.index.resolve_class_candidates(class_name)
        }

        fn files_by_name(&self, file_name: &str) -> Result<Vec<SourceLocation>, SourceError> {
            self.index.files_by_name(file_name)
        }

        fn source_file(&self, path: &Path) -> Option<Arc<SourceFile>> {
            self.index.source_file(path)
        }

        fn type_of(&self, file: &SourceFile, expr: NodeId) -> Option<TypeDesc> {
            self.index.type_of(file, expr)
        }

        fn resolve_reference(&self, file: &SourceFile, node: NodeId) -> Option<Declaration> {
            self.index.resolve_reference(file, node)
        }

        fn type_param_bounds(&self, param: &TypeParamRef) -> Vec<TypeDesc> {
            self.index.type_param_bounds(param)
        }

        fn generation(&self) -> u64 {
            self.index.generation()
        }
    }

    fn setup() -> (Arc<Counting>, ResolutionCache) {
        setup_with_delay(Duration::ZERO)
    }

    fn setup_with_delay(delay: Duration) -> (Arc<Counting>, ResolutionCache) {
        let index = JavaSourceIndex::new();
        index
            .add_source(
                "src/com/example/Widget.java",
                "package com.example;\nclass Widget {}\n",
                SourceOrigin::Project,
            )
            .unwrap();
        let query = Arc::new(Counting {
            index,
            class_lookups: AtomicUsize::new(0),
            delay,
        });
        let cache = ResolutionCache::new(query.clone());
        (query, cache)
    }

    #[test]
    fn test_lookup_is_memoized() {
        let (query, cache) = setup();
        let info = cache.resolve_class("com.example.Widget");
        assert_eq!(info.locations().count(), 1);
        assert!(!info.in_library);

        cache.resolve_class("com.example.Widget");
        assert_eq!(query.class_lookups.load(Ordering::SeqCst), 1);
        assert!(cache.contains_class("com.example.Widget"));
    }

    #[test]
    fn test_concurrent_misses_share_one_lookup() {
        let (query, cache) = setup_with_delay(Duration::from_millis(50));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve_class("com.example.Widget").locations().count())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(query.class_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generation_change_recomputes() {
        let (query, cache) = setup();
        assert!(cache.resolve_class("com.example.Gadget").is_empty());

        query
            .index
            .add_source(
                "src/com/example/Gadget.java",
                "package com.example;\nclass Gadget {}\n",
                SourceOrigin::Project,
            )
            .unwrap();
        assert!(!cache.contains_class("com.example.Gadget"));
        assert_eq!(cache.resolve_class("com.example.Gadget").locations().count(), 1);
        assert_eq!(query.class_lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_drops_entries() {
        let (query, cache) = setup();
        cache.resolve_class("com.example.Widget");
        cache.invalidate();
        assert!(!cache.contains_class("com.example.Widget"));

        cache.resolve_class("com.example.Widget");
        assert_eq!(query.class_lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_not_ready_is_not_cached() {
        let (query, cache) = setup();
        query.index.set_ready(false);
        assert!(cache.resolve_class("com.example.Widget").is_empty());
        assert!(!cache.contains_class("com.example.Widget"));

        query.index.set_ready(true);
        assert!(!cache.resolve_class("com.example.Widget").is_empty());
    }

    #[test]
    fn test_file_name_lookup() {
        let (_query, cache) = setup();
        let info = cache.resolve_file("Widget.java");
        assert_eq!(
            info.locations_by_file.keys().collect::<Vec<_>>(),
            vec![&PathBuf::from("src/com/example/Widget.java")]
        );
        assert!(cache.resolve_file("Missing.java").is_empty());
    }

    #[test]
    fn test_library_only_locations() {
        let info = ResolveInfo::from_locations(vec![SourceLocation {
            file: PathBuf::from("lib/Foo.java"),
            line: 3,
            class_name: Some("org.lib.Foo".into()),
            origin: SourceOrigin::Library,
        }]);
        assert!(info.in_library);
        assert!(!ResolveInfo::from_locations(Vec::new()).in_library);
    }
}
