use evlink_parser::{Event, LogLevel, Parser, EVENT_ARGUMENTS_LEN};

const DEFS: &str = r#"{
    "version": 1,
    "components": [{
        "component_id": 1,
        "namespace": "px4",
        "enums": [{
            "name": "sensor_state",
            "type": "uint8_t",
            "entries": [
                { "value": 3, "name": "ready", "description": "READY" },
                { "value": 4, "name": "fault", "description": "FAULT" }
            ]
        }],
        "event_groups": [{
            "name": "health",
            "events": [{
                "name": "sensor_report",
                "sub_id": 1,
                "message": "Sensor {1}: {2}",
                "description": "<profile name=\"dev\">raw state {1}</profile>",
                "log_level": "notice",
                "arguments": [
                    { "name": "instance", "type": "uint8_t" },
                    { "name": "state", "type": "sensor_state" }
                ]
            }, {
                "name": "battery_level",
                "sub_id": 2,
                "message": "Battery at {1}V",
                "arguments": [
                    { "name": "voltage", "type": "float", "decimals": 2 }
                ]
            }, {
                "name": "plain",
                "sub_id": 3,
                "message": "nothing to expand"
            }]
        }]
    }]
}"#;

fn store() -> Parser {
    let mut store = Parser::new();
    store.load_definitions(DEFS).unwrap();
    store
}

fn event(id: u32, arguments: &[u8]) -> Event {
    let mut buf = [0u8; EVENT_ARGUMENTS_LEN];
    buf[..arguments.len()].copy_from_slice(arguments);
    Event {
        id,
        sequence: 0,
        time_boot_ms: 0,
        destination_component: 0,
        arguments: buf,
    }
}

#[test]
fn renders_enum_argument_description() {
    let store = store();
    let parsed = store.parse(&event((1 << 24) | 1, &[2, 3])).unwrap();
    assert_eq!(parsed.message(), "Sensor 2: READY");
    assert_eq!(parsed.log_level(), LogLevel::Notice);
    assert_eq!(parsed.name(), "sensor_report");
    assert_eq!(parsed.group(), "health");
    assert_eq!(parsed.event_namespace(), "px4");
}

#[test]
fn unknown_enum_value_renders_placeholder_text() {
    let store = store();
    let parsed = store.parse(&event((1 << 24) | 1, &[2, 7])).unwrap();
    assert_eq!(parsed.message(), "Sensor 2: (unknown)");
}

#[test]
fn float_argument_uses_decimals() {
    let store = store();
    let parsed = store
        .parse(&event((1 << 24) | 2, &3.14159f32.to_le_bytes()))
        .unwrap();
    assert_eq!(parsed.message(), "Battery at 3.14V");
}

#[test]
fn description_follows_profile() {
    let mut store = store();
    store.set_profile("normal");
    assert_eq!(
        store.parse(&event((1 << 24) | 1, &[2, 3])).unwrap().description(),
        ""
    );

    store.set_profile("dev");
    assert_eq!(
        store.parse(&event((1 << 24) | 1, &[2, 3])).unwrap().description(),
        "raw state 2"
    );
}

#[test]
fn missing_description_renders_empty() {
    let store = store();
    let parsed = store.parse(&event((1 << 24) | 3, &[])).unwrap();
    assert_eq!(parsed.description(), "");
    assert_eq!(parsed.message(), "nothing to expand");
}

#[test]
fn unknown_event_id_does_not_parse() {
    let store = store();
    assert!(store.parse(&event((9 << 24) | 1, &[])).is_none());
}

#[test]
fn custom_formatters_run_on_render() {
    let mut store = Parser::new();
    store
        .load_definitions(
            r#"{
                "version": 1,
                "components": [{
                    "component_id": 1,
                    "namespace": "px4",
                    "event_groups": [{
                        "name": "g",
                        "events": [{
                            "name": "e",
                            "sub_id": 1,
                            "message": "check <param>COM_ARM</param> (<a href=\"https://docs\">docs</a>)"
                        }]
                    }]
                }]
            }"#,
        )
        .unwrap();
    store.formatters_mut().param = Box::new(|c| format!("`{}`", c));
    store.formatters_mut().url = Box::new(|c, l| format!("[{}]({})", c, l));

    let parsed = store.parse(&event((1 << 24) | 1, &[])).unwrap();
    assert_eq!(parsed.message(), "check `COM_ARM` ([docs](https://docs))");
}

#[test]
fn argument_accessors() {
    let store = store();
    let parsed = store.parse(&event((1 << 24) | 1, &[2, 3])).unwrap();
    assert_eq!(parsed.num_arguments(), 2);
    assert_eq!(parsed.argument(0).unwrap().name, "instance");
    assert!(parsed.argument(1).unwrap().is_enum());
    assert_eq!(parsed.argument_value(0).unwrap().as_u64(), 2);
    assert!(parsed.argument(2).is_none());
}
