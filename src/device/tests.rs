use super::*;
use serde_json::json;

#[test]
fn attribute_state_wire_shape() {
    let numeric = AttributeState::numeric(50.0);
    assert_eq!(serde_json::to_value(&numeric).unwrap(), json!({"numeric": 50.0}));

    let text = AttributeState::text("on");
    assert_eq!(serde_json::to_value(&text).unwrap(), json!({"text": "on"}));

    let unset = AttributeState::unset();
    assert_eq!(serde_json::to_value(&unset).unwrap(), json!(null));
}

#[test]
fn attribute_state_parses_each_variant() {
    let state: AttributeState = serde_json::from_value(json!({"boolean": true})).unwrap();
    assert_eq!(state, AttributeState::boolean(true));

    let state: AttributeState = serde_json::from_value(json!(null)).unwrap();
    assert_eq!(state, AttributeState::unset());
}

#[test]
fn device_update_round_trips() {
    let update: DeviceUpdate = serde_json::from_value(json!({
        "id": "lamp-1",
        "attributes": {
            "brightness": {"numeric": 75.0},
            "state": null
        }
    }))
    .unwrap();

    assert_eq!(update.id, DeviceId::from("lamp-1"));
    assert_eq!(
        update.attributes.get("brightness"),
        Some(&AttributeState::numeric(75.0))
    );
    assert_eq!(update.attributes.get("state"), Some(&AttributeState::unset()));
}

#[test]
fn attribute_spec_defaults_to_unset_state() {
    let spec: AttributeSpec = serde_json::from_value(json!({"unit": "percent"})).unwrap();
    assert_eq!(spec.state, AttributeState::unset());
    assert_eq!(spec.unit.as_deref(), Some("percent"));
}
