use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::defs::{
    ArgumentDefinition, ArgumentKind, BaseType, EnumDefinition, EnumEntry, EventDefinition,
    LogLevel,
};
use crate::store::{resolve_enum_key, Parser};

impl Parser {
    /// Load event definitions from a JSON file, merging into the store.
    pub fn load_definitions_file(&mut self, path: &str) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read definitions file {}", path))?;
        self.load_definitions(&text)
            .with_context(|| format!("load definitions file {}", path))
    }

    /// Load event definitions from a JSON string, merging into the store.
    ///
    /// On error the store keeps whatever was inserted before the failure;
    /// load into a fresh [`Parser`] and swap it in if a clean store
    /// matters.
    pub fn load_definitions(&mut self, text: &str) -> Result<()> {
        let j: Value = serde_json::from_str(text).context("parse definitions json")?;

        match j.get("version").and_then(Value::as_u64) {
            Some(1) => {}
            _ => bail!("unsupported definitions version (expected 1)"),
        }
        let Some(components) = j.get("components") else {
            return Ok(());
        };
        let components = components.as_array().context("components must be an array")?;

        // Enums of all components first: an event may reference an enum of
        // another component through its qualified name.
        for component in components {
            let Some((_, namespace)) = component_header(component)? else {
                continue;
            };
            self.load_enums(component, &namespace)?;
        }
        for component in components {
            let Some((component_id, namespace)) = component_header(component)? else {
                continue;
            };
            self.load_events(component, component_id, &namespace)?;
        }
        Ok(())
    }

    fn load_enums(&mut self, component: &Value, namespace: &str) -> Result<()> {
        let Some(enums) = component.get("enums") else {
            return Ok(());
        };
        for event_enum in enums.as_array().context("enums must be an array")? {
            let name = req_str(event_enum, "name")?;
            let type_token = req_str(event_enum, "type")?;
            let base = BaseType::parse(type_token);
            if base == BaseType::Invalid {
                warn!("enum {}::{}: unknown type {}, skipping", namespace, name, type_token);
                continue;
            }

            let mut entries = BTreeMap::new();
            if let Some(list) = event_enum.get("entries") {
                for entry in list.as_array().context("entries must be an array")? {
                    let value = entry
                        .get("value")
                        .and_then(Value::as_u64)
                        .context("entry value must be an unsigned integer")?;
                    entries.insert(
                        value,
                        EnumEntry {
                            name: req_str(entry, "name")?.to_string(),
                            description: req_str(entry, "description")?.to_string(),
                        },
                    );
                }
            }

            debug!("enum: {}::{} ({} entries)", namespace, name, entries.len());
            self.enums.insert(
                format!("{}::{}", namespace, name),
                EnumDefinition {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    base,
                    description: opt_str(event_enum, "description"),
                    entries,
                },
            );
        }
        Ok(())
    }

    fn load_events(&mut self, component: &Value, component_id: u8, namespace: &str) -> Result<()> {
        let Some(groups) = component.get("event_groups") else {
            return Ok(());
        };
        for group in groups.as_array().context("event_groups must be an array")? {
            let group_name = req_str(group, "name")?;
            let events = group
                .get("events")
                .context("missing key events")?
                .as_array()
                .context("events must be an array")?;

            for event in events {
                let name = req_str(event, "name")?;
                let message = req_str(event, "message")?;
                let sub_id = event
                    .get("sub_id")
                    .and_then(Value::as_u64)
                    .context("sub_id must be an unsigned integer")?;
                let id = ((component_id as u32) << 24) | (sub_id as u32 & 0x00ff_ffff);

                let log_level = match event.get("log_level").and_then(Value::as_str) {
                    Some(s) => LogLevel::parse(s)
                        .with_context(|| format!("unknown log_level {}", s))?,
                    None => LogLevel::Info,
                };

                let mut arguments = Vec::new();
                let mut unresolved = false;
                if let Some(args) = event.get("arguments") {
                    for arg in args.as_array().context("arguments must be an array")? {
                        let arg_name = req_str(arg, "name")?;
                        let type_token = req_str(arg, "type")?;
                        let num_decimals = arg
                            .get("decimals")
                            .and_then(Value::as_u64)
                            .map(|d| d as u8);

                        let base = BaseType::parse(type_token);
                        let kind = if base == BaseType::Invalid {
                            // not a base type: resolve as an enum reference
                            match self.find_enum(namespace, type_token) {
                                Some(e) => ArgumentKind::Enum {
                                    key: resolve_enum_key(namespace, type_token),
                                    base: e.base,
                                },
                                None => {
                                    warn!(
                                        "event {}: argument {} has unresolved type {}",
                                        name, arg_name, type_token
                                    );
                                    unresolved = true;
                                    ArgumentKind::Base(BaseType::Invalid)
                                }
                            }
                        } else {
                            ArgumentKind::Base(base)
                        };

                        arguments.push(ArgumentDefinition {
                            name: arg_name.to_string(),
                            description: opt_str(arg, "description"),
                            kind,
                            num_decimals,
                        });
                    }
                }
                if unresolved {
                    // an argument we cannot decode poisons the whole event
                    continue;
                }
                if self.events.contains_key(&id) {
                    warn!("event {} (0x{:08x}) already registered, ignoring", name, id);
                    continue;
                }

                debug!("event: {} id=0x{:08x} group={}", name, id, group_name);
                self.events.insert(
                    id,
                    EventDefinition {
                        id,
                        namespace: namespace.to_string(),
                        group: group_name.to_string(),
                        name: name.to_string(),
                        message: message.to_string(),
                        description: opt_str(event, "description"),
                        log_level,
                        arguments,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Component id and namespace, or `None` to skip a component entry that
/// lacks either key.
fn component_header(component: &Value) -> Result<Option<(u8, String)>> {
    let (Some(id), Some(ns)) = (component.get("component_id"), component.get("namespace")) else {
        return Ok(None);
    };
    let id = id.as_u64().context("component_id must be an unsigned integer")?;
    let ns = ns.as_str().context("namespace must be a string")?;
    Ok(Some(((id & 0xff) as u8, ns.to_string())))
}

fn req_str<'a>(v: &'a Value, key: &str) -> Result<&'a str> {
    v.get(key)
        .with_context(|| format!("missing key {}", key))?
        .as_str()
        .with_context(|| format!("key {} must be a string", key))
}

fn opt_str(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}
