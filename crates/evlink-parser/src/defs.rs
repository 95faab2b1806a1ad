use std::collections::BTreeMap;
use std::fmt;

/// Primitive wire types an event argument can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Invalid,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float,
}

impl BaseType {
    /// Map a definition-file type token. Unknown tokens yield `Invalid`.
    pub fn parse(token: &str) -> BaseType {
        match token {
            "uint8_t" => BaseType::Uint8,
            "int8_t" => BaseType::Int8,
            "uint16_t" => BaseType::Uint16,
            "int16_t" => BaseType::Int16,
            "uint32_t" => BaseType::Uint32,
            "int32_t" => BaseType::Int32,
            "uint64_t" => BaseType::Uint64,
            "int64_t" => BaseType::Int64,
            "float" => BaseType::Float,
            _ => BaseType::Invalid,
        }
    }

    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            BaseType::Invalid => 0,
            BaseType::Uint8 | BaseType::Int8 => 1,
            BaseType::Uint16 | BaseType::Int16 => 2,
            BaseType::Uint32 | BaseType::Int32 | BaseType::Float => 4,
            BaseType::Uint64 | BaseType::Int64 => 8,
        }
    }
}

/// Event severity, most severe first. The derived ordering follows the
/// declaration order, so `Emergency < Alert < ... < Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Protocol,
    Disabled,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s.to_ascii_lowercase().as_str() {
            "emergency" => Some(LogLevel::Emergency),
            "alert" => Some(LogLevel::Alert),
            "critical" => Some(LogLevel::Critical),
            "error" => Some(LogLevel::Error),
            "warning" => Some(LogLevel::Warning),
            "notice" => Some(LogLevel::Notice),
            "info" => Some(LogLevel::Info),
            "protocol" => Some(LogLevel::Protocol),
            "disabled" => Some(LogLevel::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Emergency => "EMERGENCY",
            LogLevel::Alert => "ALERT",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Protocol => "PROTOCOL",
            LogLevel::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}

/// One named value of an enumeration. The numeric value is the map key in
/// [`EnumDefinition::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub name: String,
    pub description: String,
}

/// An enumeration from the definition file. Identity is
/// `namespace::name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub namespace: String,
    pub name: String,
    pub base: BaseType,
    pub description: String,
    /// Values need not be contiguous and need not start at zero.
    pub entries: BTreeMap<u64, EnumEntry>,
}

/// How an argument's wire bytes are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    Base(BaseType),
    /// Reference to an enum in the store. `key` is the resolved
    /// `namespace::name` lookup key, `base` a copy of the enum's wire type.
    Enum { key: String, base: BaseType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub description: String,
    pub kind: ArgumentKind,
    /// Rendered decimal places; only meaningful for float arguments.
    pub num_decimals: Option<u8>,
}

impl ArgumentDefinition {
    /// Wire type used for decoding. For enum references this is the enum's
    /// underlying base type.
    pub fn base_type(&self) -> BaseType {
        match &self.kind {
            ArgumentKind::Base(base) => *base,
            ArgumentKind::Enum { base, .. } => *base,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ArgumentKind::Enum { .. })
    }

    /// Store key of the referenced enum, if any.
    pub fn enum_key(&self) -> Option<&str> {
        match &self.kind {
            ArgumentKind::Base(_) => None,
            ArgumentKind::Enum { key, .. } => Some(key),
        }
    }
}

/// An event from the definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    /// High byte is the component id, low 24 bits the sub-id.
    pub id: u32,
    pub namespace: String,
    pub group: String,
    pub name: String,
    pub message: String,
    pub description: String,
    pub log_level: LogLevel,
    pub arguments: Vec<ArgumentDefinition>,
}

impl EventDefinition {
    pub fn component_id(&self) -> u8 {
        (self.id >> 24) as u8
    }

    pub fn sub_id(&self) -> u32 {
        self.id & 0x00ff_ffff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_tokens_round_trip() {
        assert_eq!(BaseType::parse("uint8_t"), BaseType::Uint8);
        assert_eq!(BaseType::parse("int64_t"), BaseType::Int64);
        assert_eq!(BaseType::parse("float"), BaseType::Float);
        assert_eq!(BaseType::parse("double"), BaseType::Invalid);
        assert_eq!(BaseType::parse(""), BaseType::Invalid);
    }

    #[test]
    fn base_type_sizes() {
        assert_eq!(BaseType::Uint8.size(), 1);
        assert_eq!(BaseType::Int16.size(), 2);
        assert_eq!(BaseType::Float.size(), 4);
        assert_eq!(BaseType::Uint64.size(), 8);
        assert_eq!(BaseType::Invalid.size(), 0);
    }

    #[test]
    fn log_levels_are_ordered() {
        assert!(LogLevel::Emergency < LogLevel::Alert);
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Protocol < LogLevel::Disabled);
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("bogus"), None);
    }

    #[test]
    fn event_id_split() {
        let def = EventDefinition {
            id: (42u32 << 24) | 7,
            namespace: "px".into(),
            group: "default".into(),
            name: "test".into(),
            message: String::new(),
            description: String::new(),
            log_level: LogLevel::Info,
            arguments: vec![],
        };
        assert_eq!(def.component_id(), 42);
        assert_eq!(def.sub_id(), 7);
    }
}
