pub mod defs;
pub mod event;
mod load;
pub mod store;
mod template;
pub mod value;

pub use defs::{
    ArgumentDefinition, ArgumentKind, BaseType, EnumDefinition, EnumEntry, EventDefinition,
    LogLevel,
};
pub use event::{Event, ParsedEvent, EVENT_ARGUMENTS_LEN};
pub use store::Parser;
pub use value::ArgumentValue;

/// Rendering profile. Selects which `<profile>` blocks of a message
/// template survive expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Normal,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Dev => "dev",
            Profile::Normal => "normal",
        }
    }
}

pub type ParamFormatter = Box<dyn Fn(&str) -> String + Send + Sync>;
pub type UrlFormatter = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Hooks for embedding `<param>` and `<a>` tag content into the host UI.
/// Whatever a formatter returns is inserted verbatim and never re-scanned.
pub struct Formatters {
    /// Gets the parameter name, returns the replacement text.
    pub param: ParamFormatter,
    /// Gets (content, link), returns the replacement text.
    pub url: UrlFormatter,
}

impl Default for Formatters {
    fn default() -> Self {
        Self {
            param: Box::new(|content| content.to_string()),
            url: Box::new(|content, _link| content.to_string()),
        }
    }
}

/// Rendering configuration. Immutable once the store is shared; all events
/// parsed from one store render with the same profile and formatters.
pub struct Config {
    pub profile: Profile,
    pub formatters: Formatters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::Dev,
            formatters: Formatters::default(),
        }
    }
}
