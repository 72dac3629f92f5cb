pub mod api;
pub mod diagnostic;
pub mod error;
pub mod formatter;
#[cfg(feature = "lsp")]
pub mod lsp;
pub mod registry;
pub mod resources;
pub mod setting;
pub mod text_range;
pub mod utils;
pub mod validator;

pub use api::{apply_edits, format, format_with, validate, validate_with, ValidationReport};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{ChartsError, EngineError, RegistryError};
pub use formatter::{FormattingOptions, TextEdit};
pub use registry::Registry;
pub use setting::{Setting, SettingType};
pub use text_range::{Position, Range};
