//! Structural checks over untrusted stored JSON
//!
//! Every element of every collection is checked before anything is
//! deserialized, so a load either yields a fully well-typed [`AppState`] or
//! nothing. Unknown keys are ignored; business rules (unique ids, references
//! that resolve) are not this module's concern.
//!
//! [`AppState`]: crate::state::AppState

use serde_json::{Map, Value};

use crate::error::ShapeError;

type Record = Map<String, Value>;

/// Check that `value` has the shape of a persisted `AppState`
pub fn check_state(value: &Value) -> Result<(), ShapeError> {
    let state = record(value, "state")?;
    let fields = array(state.get("fields"), "state.fields")?;
    let images = array(state.get("images"), "state.images")?;

    for (i, field) in fields.iter().enumerate() {
        check_entity(field, &format!("state.fields[{i}]"))?;
    }
    for (i, image) in images.iter().enumerate() {
        check_item(image, &format!("state.images[{i}]"))?;
    }
    Ok(())
}

fn check_entity(value: &Value, path: &str) -> Result<(), ShapeError> {
    let entity = record(value, path)?;
    string(entity, "id", path)?;
    string(entity, "name", path)?;
    number(entity, "createdAt", path)?;

    let ids_path = format!("{path}.imageIds");
    let ids = array(entity.get("imageIds"), &ids_path)?;
    if let Some(i) = ids.iter().position(|id| !id.is_string()) {
        return Err(ShapeError::new(format!("{ids_path}[{i}]"), "string"));
    }
    Ok(())
}

fn check_item(value: &Value, path: &str) -> Result<(), ShapeError> {
    let item = record(value, path)?;
    string(item, "id", path)?;
    string(item, "fieldId", path)?;
    string(item, "src", path)?;
    number(item, "createdAt", path)?;
    match item.get("note") {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ShapeError::new(format!("{path}.note"), "string or absent")),
    }
}

fn record<'a>(value: &'a Value, path: &str) -> Result<&'a Record, ShapeError> {
    value
        .as_object()
        .ok_or_else(|| ShapeError::new(path, "object"))
}

fn array<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a Vec<Value>, ShapeError> {
    value
        .and_then(Value::as_array)
        .ok_or_else(|| ShapeError::new(path, "array"))
}

fn string(record: &Record, key: &str, path: &str) -> Result<(), ShapeError> {
    match record.get(key) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(ShapeError::new(format!("{path}.{key}"), "string")),
    }
}

fn number(record: &Record, key: &str, path: &str) -> Result<(), ShapeError> {
    match record.get(key) {
        Some(Value::Number(_)) => Ok(()),
        _ => Err(ShapeError::new(format!("{path}.{key}"), "number")),
    }
}
