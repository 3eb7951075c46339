//! In-memory Java source index.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ignore::WalkBuilder;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::resolve::{Resolver, TYPE_DECLARATIONS};
use super::tree::{NodeId, SourceFile};
use super::treesitter::{fingerprint, JavaParser};
use super::types::{TypeDesc, TypeParamRef};
use super::{Declaration, SourceLocation, SourceOrigin, SourceQuery};
use crate::config::IndexConfig;
use crate::error::SourceError;

#[derive(Debug, Clone)]
pub(crate) struct ClassEntry {
    pub file: PathBuf,
    pub node: NodeId,
    pub line: u32,
    pub binary_name: String,
}

#[derive(Default)]
pub(crate) struct IndexState {
    pub files: HashMap<PathBuf, Arc<SourceFile>>,
    /// Keyed by both the canonical (`a.Outer.Inner`) and binary (`a.Outer$Inner`) name.
    pub classes: HashMap<String, Vec<ClassEntry>>,
    pub by_file_name: HashMap<String, Vec<PathBuf>>,
}

impl IndexState {
    fn insert(&mut self, file: Arc<SourceFile>) {
        let path = file.path().to_path_buf();
        for entry in collect_classes(&file) {
            let canonical = entry.binary_name.replace('$', ".");
            if canonical != entry.binary_name {
                self.classes.entry(canonical).or_default().push(entry.clone());
            }
            self.classes
                .entry(entry.binary_name.clone())
                .or_default()
                .push(entry);
        }
        if let Some(name) = file.file_name() {
            self.by_file_name
                .entry(name.to_string())
                .or_default()
                .push(path.clone());
        }
        self.files.insert(path, file);
    }

    fn remove(&mut self, path: &Path) -> Option<Arc<SourceFile>> {
        let file = self.files.remove(path)?;
        self.classes.retain(|_, entries| {
            entries.retain(|e| e.file != path);
            !entries.is_empty()
        });
        if let Some(name) = file.file_name() {
            if let Some(paths) = self.by_file_name.get_mut(name) {
                paths.retain(|p| p != path);
                if paths.is_empty() {
                    self.by_file_name.remove(name);
                }
            }
        }
        Some(file)
    }

    fn class_locations(&self, name: &str) -> Vec<SourceLocation> {
        self.classes
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let file = self.files.get(&entry.file)?;
                        Some(SourceLocation {
                            file: entry.file.clone(),
                            line: entry.line,
                            class_name: Some(entry.binary_name.clone()),
                            origin: file.origin(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Type declarations of a file with their binary names. Local and anonymous
/// classes are skipped.
fn collect_classes(file: &SourceFile) -> Vec<ClassEntry> {
    let mut out = Vec::new();
    let package = super::resolve::package_of(file);
    let mut stack: Vec<(NodeId, Option<String>)> = vec![(file.root(), None)];

    while let Some((node, outer)) = stack.pop() {
        for child in file.named_children(node).collect::<Vec<_>>().into_iter().rev() {
            let kind = file.kind(child);
            if TYPE_DECLARATIONS.contains(&kind) {
                let Some(name) = Resolver::declared_name(file, child) else {
                    continue;
                };
                let binary_name = match (&outer, &package) {
                    (Some(outer), _) => format!("{outer}${name}"),
                    (None, Some(package)) => format!("{package}.{name}"),
                    (None, None) => name.to_string(),
                };
                out.push(ClassEntry {
                    file: file.path().to_path_buf(),
                    node: child,
                    line: file
                        .child_by_field(child, "name")
                        .map(|n| file.start_line(n))
                        .unwrap_or_else(|| file.start_line(child)),
                    binary_name: binary_name.clone(),
                });
                if let Some(body) = file.child_by_field(child, "body") {
                    stack.push((body, Some(binary_name)));
                }
            } else if kind == "enum_body_declarations" {
                stack.push((child, outer.clone()));
            }
        }
    }
    out
}

/// Tree-sitter backed [`SourceQuery`] over a set of Java files.
///
/// Files are added individually or by walking source roots. The index is
/// safe to update while scanners read it; every change bumps the
/// [`generation`](SourceQuery::generation).
pub struct JavaSourceIndex {
    parser: JavaParser,
    state: RwLock<IndexState>,
    generation: AtomicU64,
    ready: AtomicBool,
}

impl JavaSourceIndex {
    /// Create an empty index that reports itself ready.
    pub fn new() -> Self {
        Self {
            parser: JavaParser::new(),
            state: RwLock::new(IndexState::default()),
            generation: AtomicU64::new(0),
            ready: AtomicBool::new(true),
        }
    }

    /// Build an index from the configured source and library roots.
    pub fn from_config(config: &IndexConfig) -> Result<Self, SourceError> {
        let index = Self::new();
        index.set_ready(false);
        for root in &config.source_roots {
            index.index_directory(root, SourceOrigin::Project, config)?;
        }
        for root in &config.library_roots {
            index.index_directory(root, SourceOrigin::Library, config)?;
        }
        index.set_ready(true);
        Ok(index)
    }

    /// Mark the index as (not) ready for class lookups.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Add or replace one file. Returns `false` when the content is unchanged.
    pub fn add_source(
        &self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        origin: SourceOrigin,
    ) -> Result<bool, SourceError> {
        let path = path.into();
        let content = content.into();

        if let Some(existing) = self.state.read().files.get(&path) {
            if existing.fingerprint() == fingerprint(&content) && existing.origin() == origin {
                debug!(path = %path.display(), "source unchanged");
                return Ok(false);
            }
        }

        let file = Arc::new(self.parser.parse_file(path.clone(), content, origin)?);
        {
            let mut state = self.state.write();
            state.remove(&path);
            state.insert(file);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!(path = %path.display(), ?origin, "indexed source");
        Ok(true)
    }

    /// Drop a file from the index.
    pub fn remove_source(&self, path: &Path) -> bool {
        let removed = self.state.write().remove(path).is_some();
        if removed {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    /// Index every matching file under `root`. Returns the number of files
    /// whose content changed.
    pub fn index_directory(
        &self,
        root: impl AsRef<Path>,
        origin: SourceOrigin,
        config: &IndexConfig,
    ) -> Result<usize, SourceError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SourceError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let walker = WalkBuilder::new(root).hidden(true).git_ignore(true).build();
        let mut changed = 0;

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !config.extensions.iter().any(|e| e == extension) {
                continue;
            }

            let excluded = path
                .strip_prefix(root)
                .unwrap_or(path)
                .components()
                .any(|c| config.exclude_dirs.iter().any(|d| c.as_os_str() == d.as_str()));
            if excluded {
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable source");
                    continue;
                }
            };
            if self.add_source(path, content, origin)? {
                changed += 1;
            }
        }

        info!(root = %root.display(), ?origin, changed, "indexed source root");
        Ok(changed)
    }

    pub fn file_count(&self) -> usize {
        self.state.read().files.len()
    }

    /// Canonical and binary names of all indexed classes.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run `f` with a resolver over the indexed copy of `file`.
    fn with_resolver<T>(
        &self,
        file: &SourceFile,
        f: impl FnOnce(&Resolver<'_>, &Arc<SourceFile>) -> Option<T>,
    ) -> Option<T> {
        let state = self.state.read();
        let indexed = Arc::clone(state.files.get(file.path())?);
        let resolver = Resolver::new(&state);
        f(&resolver, &indexed)
    }
}

impl Default for JavaSourceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceQuery for JavaSourceIndex {
    fn resolve_class_candidates(
        &self,
        class_name: &str,
    ) -> Result<Vec<SourceLocation>, SourceError> {
        if !self.is_ready() {
            return Err(SourceError::NotReady);
        }
        let state = self.state.read();

        // Hidden classes print as `Outer$$Lambda$14/0x...`.
        let mut name = class_name.split('/').next().unwrap_or(class_name);
        loop {
            let found = state.class_locations(name);
            if !found.is_empty() {
                return Ok(found);
            }
            // Anonymous, local and synthetic classes live in their outer class's file.
            match name.rfind('$') {
                Some(idx) => name = name[..idx].trim_end_matches('$'),
                None => return Ok(Vec::new()),
            }
        }
    }

    fn files_by_name(&self, file_name: &str) -> Result<Vec<SourceLocation>, SourceError> {
        if !self.is_ready() {
            return Err(SourceError::NotReady);
        }
        let state = self.state.read();
        let mut locations: Vec<SourceLocation> = state
            .by_file_name
            .get(file_name)
            .into_iter()
            .flatten()
            .filter_map(|path| {
                let file = state.files.get(path)?;
                Some(SourceLocation {
                    file: path.clone(),
                    line: 1,
                    class_name: None,
                    origin: file.origin(),
                })
            })
            .collect();
        locations.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(locations)
    }

    fn source_file(&self, path: &Path) -> Option<Arc<SourceFile>> {
        self.state.read().files.get(path).cloned()
    }

    fn type_of(&self, file: &SourceFile, expr: NodeId) -> Option<TypeDesc> {
        self.with_resolver(file, |resolver, file| resolver.type_of(file, expr))
    }

    fn resolve_reference(&self, file: &SourceFile, node: NodeId) -> Option<Declaration> {
        self.with_resolver(file, |resolver, file| resolver.resolve_reference(file, node))
    }

    fn type_param_bounds(&self, param: &TypeParamRef) -> Vec<TypeDesc> {
        let state = self.state.read();
        Resolver::new(&state).type_param_bounds(param)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DeclarationKind, PrimitiveType};

    const BOX: &str = r#"package com.example;

public class Box<T extends Number> {
    private T value;
    static final int SIZE = 3;

    public T get() { return value; }

    public static class Inner {
        int[] data;
    }
}
"#;

    fn index() -> JavaSourceIndex {
        let index = JavaSourceIndex::new();
        index
            .add_source("src/com/example/Box.java", BOX, SourceOrigin::Project)
            .unwrap();
        index
    }

    #[test]
    fn test_class_names_are_indexed() {
        let index = index();
        let names = index.class_names();
        assert!(names.contains(&"com.example.Box".to_string()));
        assert!(names.contains(&"com.example.Box$Inner".to_string()));
        assert!(names.contains(&"com.example.Box.Inner".to_string()));
    }

    #[test]
    fn test_resolve_class_candidates() {
        let index = index();
        let found = index.resolve_class_candidates("com.example.Box").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 3);
        assert!(!found[0].in_library());

        let inner = index.resolve_class_candidates("com.example.Box$Inner").unwrap();
        assert_eq!(inner[0].line, 9);

        let lambda = index
            .resolve_class_candidates("com.example.Box$$Lambda$14/0x0000000800066840")
            .unwrap();
        assert_eq!(lambda[0].class_name.as_deref(), Some("com.example.Box"));

        let anonymous = index.resolve_class_candidates("com.example.Box$1").unwrap();
        assert_eq!(anonymous.len(), 1);

        assert!(index.resolve_class_candidates("com.example.Missing").unwrap().is_empty());
    }

    #[test]
    fn test_unchanged_source_keeps_generation() {
        let index = index();
        let generation = index.generation();
        assert!(!index
            .add_source("src/com/example/Box.java", BOX, SourceOrigin::Project)
            .unwrap());
        assert_eq!(index.generation(), generation);

        assert!(index
            .add_source("src/com/example/Box.java", format!("{BOX}\n"), SourceOrigin::Project)
            .unwrap());
        assert!(index.generation() > generation);
    }

    #[test]
    fn test_remove_source() {
        let index = index();
        assert!(index.remove_source(Path::new("src/com/example/Box.java")));
        assert!(index.resolve_class_candidates("com.example.Box").unwrap().is_empty());
        assert_eq!(index.file_count(), 0);
        assert!(!index.remove_source(Path::new("src/com/example/Box.java")));
    }

    #[test]
    fn test_not_ready() {
        let index = index();
        index.set_ready(false);
        assert!(matches!(
            index.resolve_class_candidates("com.example.Box"),
            Err(SourceError::NotReady)
        ));
        assert!(matches!(index.files_by_name("Box.java"), Err(SourceError::NotReady)));
    }

    #[test]
    fn test_type_param_bounds_and_field_types() {
        let index = index();
        let file = index.source_file(Path::new("src/com/example/Box.java")).unwrap();
        let line = file.leaves_on_line(7);
        let value = line
            .iter()
            .copied()
            .find(|l| file.text_of(*l) == "value")
            .unwrap();
        let decl = index.resolve_reference(&file, value).unwrap();
        assert_eq!(decl.kind, DeclarationKind::Field);
        let Some(TypeDesc::TypeParam(param)) = decl.declared_type else {
            panic!("expected type parameter");
        };
        assert_eq!(param.name, "T");
        assert_eq!(
            index.type_param_bounds(&param),
            vec![TypeDesc::class("java.lang.Number")]
        );

        let size = file
            .leaves_on_line(5)
            .iter()
            .copied()
            .find(|l| file.text_of(*l) == "SIZE")
            .unwrap();
        let declarator = file.parent(size).unwrap();
        let init = file.child_by_field(declarator, "value").unwrap();
        assert_eq!(
            index.type_of(&file, init),
            Some(TypeDesc::primitive(PrimitiveType::Int))
        );
    }

    #[test]
    fn test_field_access_type_is_substituted() {
        let index = index();
        index
            .add_source(
                "src/com/example/Reader.java",
                "package com.example;\n\nclass Reader {\n    Object read(Box<Integer> box) { return box.value; }\n}\n",
                SourceOrigin::Project,
            )
            .unwrap();
        let file = index.source_file(Path::new("src/com/example/Reader.java")).unwrap();
        let value = file
            .leaves_on_line(4)
            .iter()
            .copied()
            .find(|l| file.text_of(*l) == "value")
            .unwrap();
        let access = file.parent(value).unwrap();
        assert_eq!(file.kind(access), "field_access");
        match index.type_of(&file, access) {
            Some(TypeDesc::Class(class)) => assert_eq!(class.simple_name(), "Integer"),
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn test_index_directory_respects_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/com/example");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Box.java"), BOX).unwrap();
        let build = dir.path().join("build/generated");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("Gen.java"), "package gen; class Gen {}").unwrap();
        fs::write(src.join("notes.txt"), "not java").unwrap();

        let config = IndexConfig::default();
        let index = JavaSourceIndex::new();
        let changed = index
            .index_directory(dir.path(), SourceOrigin::Project, &config)
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(index.files_by_name("Box.java").unwrap().len(), 1);
        assert!(index.files_by_name("Gen.java").unwrap().is_empty());
    }
}
