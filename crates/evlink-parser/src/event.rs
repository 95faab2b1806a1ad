use crate::defs::{ArgumentDefinition, EventDefinition, LogLevel};
use crate::store::Parser;
use crate::template;
use crate::value::{self, ArgumentValue};

/// Raw argument payload length of an event message.
pub const EVENT_ARGUMENTS_LEN: usize = 32;

/// A received event, as handed over by the transport after decoding the
/// outer message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub id: u32,
    pub sequence: u16,
    pub time_boot_ms: u32,
    pub destination_component: u8,
    pub arguments: [u8; EVENT_ARGUMENTS_LEN],
}

/// An event joined with its definition and the store it came from. Build
/// one per received event via [`Parser::parse`]; it borrows the store and
/// renders the message and description on demand.
pub struct ParsedEvent<'a> {
    event: Event,
    def: &'a EventDefinition,
    store: &'a Parser,
}

impl<'a> ParsedEvent<'a> {
    pub(crate) fn new(event: Event, def: &'a EventDefinition, store: &'a Parser) -> Self {
        Self { event, def, store }
    }

    pub fn id(&self) -> u32 {
        self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn event_namespace(&self) -> &str {
        &self.def.namespace
    }

    pub fn group(&self) -> &str {
        &self.def.group
    }

    pub fn log_level(&self) -> LogLevel {
        self.def.log_level
    }

    pub fn sequence(&self) -> u16 {
        self.event.sequence
    }

    pub fn time_boot_ms(&self) -> u32 {
        self.event.time_boot_ms
    }

    pub fn num_arguments(&self) -> usize {
        self.def.arguments.len()
    }

    pub fn argument(&self, index: usize) -> Option<&ArgumentDefinition> {
        self.def.arguments.get(index)
    }

    /// Decoded value of the `index`-th argument, `None` when the argument
    /// did not fit the raw buffer.
    pub fn argument_value(&self, index: usize) -> Option<ArgumentValue> {
        value::read_argument(&self.def.arguments, &self.event.arguments, index)
    }

    /// Expanded message template.
    pub fn message(&self) -> String {
        self.render(&self.def.message)
    }

    /// Expanded description template. Empty when the definition carries no
    /// description.
    pub fn description(&self) -> String {
        self.render(&self.def.description)
    }

    fn render(&self, template: &str) -> String {
        let args: Vec<Option<String>> = (0..self.def.arguments.len())
            .map(|i| self.render_argument(i))
            .collect();
        template::expand(template, self.store.config(), &args)
    }

    /// Display form of one argument: the enum entry description for enum
    /// arguments (or `(unknown)` when the value has no entry), the plain
    /// decimal form otherwise.
    fn render_argument(&self, index: usize) -> Option<String> {
        let def = &self.def.arguments[index];
        let value = self.argument_value(index)?;
        let rendered = match def.enum_key() {
            Some(key) => match self
                .store
                .enum_by_key(key)
                .and_then(|e| e.entries.get(&value.as_u64()))
            {
                Some(entry) => entry.description.clone(),
                None => "(unknown)".to_string(),
            },
            None => value.render(def.num_decimals),
        };
        Some(rendered)
    }
}
