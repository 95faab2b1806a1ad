use std::collections::HashMap;

use crate::defs::{EnumDefinition, EventDefinition};
use crate::event::{Event, ParsedEvent};
use crate::{Config, Formatters, Profile};

/// Event metadata store: enum and event definitions loaded from one or
/// more definition files, plus the rendering configuration. Read-only once
/// loading is done; share it behind an `Arc` between receivers.
#[derive(Default)]
pub struct Parser {
    pub(crate) enums: HashMap<String, EnumDefinition>,
    pub(crate) events: HashMap<u32, EventDefinition>,
    config: Config,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_event(&self, id: u32) -> Option<&EventDefinition> {
        self.events.get(&id)
    }

    /// Resolve an enum reference: a bare `name` resolves within
    /// `namespace`, `ns::name` resolves absolutely.
    pub fn find_enum(&self, namespace: &str, type_token: &str) -> Option<&EnumDefinition> {
        self.enums.get(&resolve_enum_key(namespace, type_token))
    }

    pub(crate) fn enum_by_key(&self, key: &str) -> Option<&EnumDefinition> {
        self.enums.get(key)
    }

    /// Join an event with its definition. `None` when the id is unknown.
    pub fn parse(&self, event: &Event) -> Option<ParsedEvent<'_>> {
        let def = self.events.get(&event.id)?;
        Some(ParsedEvent::new(*event, def, self))
    }

    /// Set the rendering profile. Anything but `dev` or `normal` keeps the
    /// previous setting.
    pub fn set_profile(&mut self, profile: &str) {
        match profile {
            "dev" => self.config.profile = Profile::Dev,
            "normal" => self.config.profile = Profile::Normal,
            _ => {}
        }
    }

    pub fn profile(&self) -> Profile {
        self.config.profile
    }

    /// Install custom `<param>`/`<a>` formatters before sharing the store.
    pub fn formatters_mut(&mut self) -> &mut Formatters {
        &mut self.config.formatters
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn num_enums(&self) -> usize {
        self.enums.len()
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.values()
    }
}

/// Store key for an enum reference: `ns::name` is absolute, a bare name is
/// event-namespace relative.
pub(crate) fn resolve_enum_key(namespace: &str, type_token: &str) -> String {
    match type_token.split_once("::") {
        Some((ns, name)) => format!("{}::{}", ns, name),
        None => format!("{}::{}", namespace, type_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_key_resolution() {
        assert_eq!(resolve_enum_key("px4", "failsafe_cause"), "px4::failsafe_cause");
        assert_eq!(resolve_enum_key("px4", "common::level"), "common::level");
    }

    #[test]
    fn profile_setter_ignores_unknown_values() {
        let mut store = Parser::new();
        assert_eq!(store.profile(), Profile::Dev);
        store.set_profile("normal");
        assert_eq!(store.profile(), Profile::Normal);
        store.set_profile("verbose");
        assert_eq!(store.profile(), Profile::Normal);
        store.set_profile("dev");
        assert_eq!(store.profile(), Profile::Dev);
    }
}
