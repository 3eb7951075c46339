//! Line-by-line stack-trace scanning.
//!
//! A [`StackTraceScanner`] is fed the lines of a console or log one at a time.
//! Exception headers arm a [`Refiner`]; the next frame line is resolved to
//! source files and the refiner pinpoints the failing expression on the
//! frame's line. Every frame then arms a call-site refiner for its caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::{ResolutionCache, ResolveInfo};
use crate::config::ScanConfig;
use crate::exception::{ExceptionKindRegistry, ExceptionRecord};
use crate::frame::{self, ParsedFrame};
use crate::matcher::MatchContext;
use crate::refiner::Refiner;
use crate::source::SourceLocation;
use crate::text::TextRange;

/// Where a highlighted range navigates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub file: PathBuf,
    /// 1-based line.
    pub line: u32,
    /// Byte range in `file` of the blamed expression.
    pub anchor: Option<TextRange>,
}

/// One highlighted range of the scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    pub start_offset: usize,
    pub end_offset: usize,
    pub targets: Vec<NavigationTarget>,
    /// All targets are library sources.
    pub greyed_out: bool,
}

/// Highlights produced for one frame line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub items: Vec<ResultItem>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct StackTraceScanner {
    cache: Arc<ResolutionCache>,
    registry: Arc<ExceptionKindRegistry>,
    config: ScanConfig,
    refiner: Option<Refiner>,
}

impl StackTraceScanner {
    pub fn new(cache: Arc<ResolutionCache>) -> Self {
        Self::with_config(cache, ScanConfig::default())
    }

    pub fn with_config(cache: Arc<ResolutionCache>, config: ScanConfig) -> Self {
        Self {
            cache,
            registry: Arc::new(ExceptionKindRegistry::new()),
            config,
            refiner: None,
        }
    }

    /// Use a registry with additional exception kinds.
    pub fn with_registry(mut self, registry: Arc<ExceptionKindRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Forget any chase in progress.
    pub fn reset(&mut self) {
        self.refiner = None;
    }

    pub fn refiner(&self) -> Option<&Refiner> {
        self.refiner.as_ref()
    }

    /// Feed one line. `text_end_offset` is the document offset right after
    /// `line` (terminator included when `line` carries one).
    ///
    /// Returns `Some` for frame lines, `None` for everything else.
    pub fn apply_line(&mut self, line: &str, text_end_offset: usize) -> Option<ScanResult> {
        let line_start = text_end_offset.saturating_sub(line.len());
        let content = line.trim_end_matches(['\n', '\r']);
        if content.len() > self.config.max_line_length {
            debug!(length = content.len(), "line too long, chase reset");
            self.refiner = None;
            return None;
        }

        let Some(frame) = frame::parse_line(content) else {
            self.refiner = match self.refiner.as_ref().and_then(|r| r.consume_next_line(content)) {
                Some(next) => Some(next),
                None => self
                    .registry
                    .parse_message(content)
                    .map(|record| Refiner::Exception(record.shifted(line_start))),
            };
            return None;
        };

        let held = self.refiner.take();
        let class_name = frame.class_name(content);
        let method_name = frame.method_name(content);

        let mut result = ScanResult::default();
        if let Some(record) = held.as_ref().and_then(Refiner::exception) {
            result.items.extend(self.class_name_item(record));
        }
        result.items.extend(self.frame_item(&frame, class_name, line_start, held.as_ref()));

        self.refiner = held
            .as_ref()
            .and_then(|r| r.consume_next_line(content))
            .or_else(|| {
                self.config
                    .highlight_call_sites
                    .then(|| Refiner::call_site(class_name, method_name))
            });
        Some(result)
    }

    /// Feed a whole document, one line at a time.
    pub fn scan_text(&mut self, text: &str) -> Vec<ScanResult> {
        let mut offset = 0;
        let mut results = Vec::new();
        for line in text.split_inclusive('\n') {
            offset += line.len();
            if let Some(result) = self.apply_line(line, offset) {
                results.push(result);
            }
        }
        results
    }

    /// Highlight of the exception class name in its header line.
    fn class_name_item(&self, record: &ExceptionRecord) -> Option<ResultItem> {
        let info = self.cache.resolve_class(record.class_name());
        if info.is_empty() {
            return None;
        }
        let targets = info
            .locations()
            .map(|location| NavigationTarget {
                file: location.file.clone(),
                line: location.line,
                anchor: None,
            })
            .collect();
        Some(ResultItem {
            start_offset: record.class_name_offset(),
            end_offset: record.class_name_end(),
            targets,
            greyed_out: info.in_library,
        })
    }

    /// Highlight of the `File.java:42` part, pointing into each candidate file.
    fn frame_item(
        &self,
        frame: &ParsedFrame,
        class_name: &str,
        line_start: usize,
        refiner: Option<&Refiner>,
    ) -> Option<ResultItem> {
        let candidates = self.candidate_files(frame, class_name);
        if candidates.is_empty() {
            debug!(class_name, "frame did not resolve");
            return None;
        }

        let greyed_out = candidates.in_library;
        let targets: Vec<NavigationTarget> = candidates
            .locations_by_file
            .iter()
            .filter_map(|(file, locations)| {
                let first = locations.first()?;
                Some(self.navigation_target(file, first, frame, refiner))
            })
            .collect();

        Some(ResultItem {
            start_offset: line_start + frame.file_line_range.start,
            end_offset: line_start + frame.file_line_range.end,
            targets,
            greyed_out,
        })
    }

    /// Class lookup narrowed to the frame's file name; the file-name lookup
    /// when the class is unknown or declared in other files.
    fn candidate_files(&self, frame: &ParsedFrame, class_name: &str) -> Arc<ResolveInfo> {
        let by_class = self.cache.resolve_class(class_name);
        let Some(file_name) = frame.file_name.as_deref() else {
            return by_class;
        };

        let matching: Vec<SourceLocation> = by_class
            .locations()
            .filter(|l| l.file.file_name().and_then(|n| n.to_str()) == Some(file_name))
            .cloned()
            .collect();
        if !matching.is_empty() {
            return Arc::new(ResolveInfo::from_locations(matching));
        }

        let by_name = self.cache.resolve_file(file_name);
        if by_name.is_empty() {
            by_class
        } else {
            by_name
        }
    }

    fn navigation_target(
        &self,
        file: &Path,
        location: &SourceLocation,
        frame: &ParsedFrame,
        refiner: Option<&Refiner>,
    ) -> NavigationTarget {
        if !frame.has_source_line() {
            return NavigationTarget {
                file: file.to_path_buf(),
                line: location.line,
                anchor: None,
            };
        }
        let line = frame.line_number as u32;
        let query = self.cache.query();
        let anchor = refiner.and_then(|refiner| {
            let source = query.source_file(file)?;
            let ctx = MatchContext::new(query.as_ref(), &source);
            refiner.find_in_line(&ctx, line).map(|m| m.anchor)
        });
        NavigationTarget {
            file: file.to_path_buf(),
            line,
            anchor,
        }
    }
}
