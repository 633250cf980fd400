//! Response transformation — platform payload in, declared shape out.

use serde_json::{Map, Value};

use tier0::{FieldKind, FormField, TaskUi};

/// Resolve a raw response payload against the declared UI.
///
/// Rules, in order:
/// 1. A bare string matching a quick-action id maps to that action's
///    declared value.
/// 2. An object whose `selected` key names a known action id selects
///    that action; the remaining keys are merged into the declared
///    value.
/// 3. Any other object is treated as a form submission and returned
///    as the raw field map after per-field validation.
///
/// The error string names what failed; the coordinator records the
/// response as rejected and surfaces a retryable handler error.
pub fn resolve(ui: &TaskUi, payload: &Value) -> Result<Value, String> {
    if let Value::String(id) = payload {
        return match ui.action(id) {
            Some(action) => Ok(action.value.clone()),
            None => Err(format!("unknown quick action: {id:?}")),
        };
    }

    if let Value::Object(fields) = payload {
        if let Some(Value::String(id)) = fields.get("selected") {
            let action = ui
                .action(id)
                .ok_or_else(|| format!("unknown quick action: {id:?}"))?;
            return Ok(merge_selected(&action.value, fields));
        }
        if !ui.form.is_empty() {
            validate_form(&ui.form, fields)?;
            return Ok(payload.clone());
        }
        return Err("object response without `selected` and no form declared".to_owned());
    }

    Err(format!("unsupported response payload: {payload}"))
}

/// Merge the remaining keys of a `selected` response into the action's
/// declared value. A non-object declared value is wrapped under
/// `value` first so there is somewhere to merge into.
fn merge_selected(declared: &Value, fields: &Map<String, Value>) -> Value {
    let mut base = match declared {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other.clone());
            map
        }
    };
    for (key, value) in fields {
        if key != "selected" {
            base.insert(key.clone(), value.clone());
        }
    }
    Value::Object(base)
}

fn validate_form(form: &[FormField], fields: &Map<String, Value>) -> Result<(), String> {
    for field in form {
        let Some(value) = fields.get(&field.name) else {
            if field.required {
                return Err(format!("missing required field {:?}", field.name));
            }
            continue;
        };
        let ok = match &field.kind {
            FieldKind::Text => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Select(options) => value
                .as_str()
                .is_some_and(|s| options.iter().any(|o| o == s)),
            _ => false,
        };
        if !ok {
            return Err(format!(
                "field {:?} does not match its declared kind",
                field.name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tier0::QuickAction;

    fn ui() -> TaskUi {
        let mut ui = TaskUi::titled("review");
        ui.quick_actions = vec![
            QuickAction::new("approve", "Approve", json!({ "approved": true })),
            QuickAction::new("reject", "Reject", json!("rejected")),
        ];
        ui.form = vec![
            FormField::required("comment", "Comment", FieldKind::Text),
            FormField::optional("score", "Score", FieldKind::Number),
            FormField::optional("env", "Environment", FieldKind::Select(vec![
                "staging".into(),
                "prod".into(),
            ])),
        ];
        ui
    }

    #[test]
    fn bare_action_id_maps_to_value() {
        assert_eq!(
            resolve(&ui(), &json!("approve")).unwrap(),
            json!({ "approved": true })
        );
    }

    #[test]
    fn unknown_action_id_rejected() {
        assert!(resolve(&ui(), &json!("maybe")).is_err());
    }

    #[test]
    fn selected_merges_remaining_keys() {
        let out = resolve(&ui(), &json!({ "selected": "approve", "note": "lgtm" })).unwrap();
        assert_eq!(out, json!({ "approved": true, "note": "lgtm" }));
    }

    #[test]
    fn selected_with_scalar_value_wraps() {
        let out = resolve(&ui(), &json!({ "selected": "reject", "note": "nope" })).unwrap();
        assert_eq!(out, json!({ "value": "rejected", "note": "nope" }));
    }

    #[test]
    fn form_returns_raw_field_map() {
        let payload = json!({ "comment": "ship it", "score": 9, "env": "prod" });
        assert_eq!(resolve(&ui(), &payload).unwrap(), payload);
    }

    #[test]
    fn form_missing_required_field() {
        let err = resolve(&ui(), &json!({ "score": 9 })).unwrap_err();
        assert!(err.contains("comment"));
    }

    #[test]
    fn form_kind_mismatch() {
        assert!(resolve(&ui(), &json!({ "comment": 42 })).is_err());
        assert!(resolve(&ui(), &json!({ "comment": "ok", "score": "high" })).is_err());
        assert!(resolve(&ui(), &json!({ "comment": "ok", "env": "laptop" })).is_err());
    }

    #[test]
    fn non_object_non_string_rejected() {
        assert!(resolve(&ui(), &json!(42)).is_err());
        assert!(resolve(&ui(), &json!([1, 2])).is_err());
    }
}
