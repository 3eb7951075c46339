pub mod cache;
pub mod config;
pub mod error;
pub mod exception;
pub mod frame;
pub mod matcher;
pub mod refiner;
pub mod scan;
pub mod source;
pub mod text;

pub use cache::{ResolutionCache, ResolveInfo};
pub use config::Config;
pub use error::SourceError;
pub use exception::{parse_message, ExceptionKind, ExceptionKindRegistry, ExceptionRecord};
pub use frame::{parse_line, ParsedFrame};
pub use refiner::{Refiner, RefinerMatch};
pub use scan::{NavigationTarget, ResultItem, ScanResult, StackTraceScanner};
pub use source::{JavaSourceIndex, SourceQuery};
pub use text::TextRange;
