use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ChartsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

/// Failures while building a setting registry from dictionary data.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum RegistryError {
    #[error("Malformed settings dictionary: {message}")]
    #[diagnostic(
        code(registry::malformed),
        help("The dictionary must be a JSON or YAML object with a `settings` array.")
    )]
    Malformed { message: String },

    #[error("Setting '{setting}' has an unsupported type '{type_name}'")]
    #[diagnostic(
        code(registry::unknown_type),
        help("Supported types are: string, number, integer, boolean, enum, interval, date.")
    )]
    UnknownType { setting: String, type_name: String },

    #[error("Required setting '{setting}' of section [{section}] is not in the dictionary")]
    #[diagnostic(
        code(registry::unknown_required_setting),
        help("Every name listed in `requiredSettings` must be declared in `settings`.")
    )]
    UnknownRequiredSetting { section: String, setting: String },

    #[error("Could not read dictionary '{path}': {message}")]
    #[diagnostic(code(registry::io))]
    Io { path: String, message: String },
}

/// Internal invariant violations of the validation engine. These are defects
/// in the engine, never problems in the validated document.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("This validator has already processed a document")]
    #[diagnostic(
        code(engine::already_processed),
        help("Create a new Validator for every document.")
    )]
    AlreadyProcessed,

    #[error("Keyword '{keyword}' reached a handler that does not accept it")]
    #[diagnostic(code(engine::unhandled_keyword))]
    UnhandledKeyword { keyword: String },

    #[error("A setting inside 'if' was found on line {line}, but no condition is active")]
    #[diagnostic(code(engine::missing_condition))]
    MissingCondition { line: u32 },
}
