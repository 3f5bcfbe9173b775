//! Settings merge semantics
//!
//! Partial settings updates are applied with [`deep_merge`]:
//!
//! - objects merge key by key, recursively
//! - arrays in the patch replace the target array wholesale (never concatenate)
//! - every other value, `null` included, replaces the target value
//!
//! Hotkey bindings and source lists are arrays, so a client that removes an
//! entry must see it removed rather than appended to.

use serde_json::Value;

/// Merge `patch` into `target` in place.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Owned variant of [`deep_merge`].
pub fn merged(mut base: Value, patch: Value) -> Value {
    deep_merge(&mut base, patch);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_merge_recursively() {
        let base = json!({ "display": { "larivaar": false, "size": 3 }, "theme": "day" });
        let result = merged(base, json!({ "display": { "larivaar": true } }));

        assert_eq!(
            result,
            json!({ "display": { "larivaar": true, "size": 3 }, "theme": "day" })
        );
    }

    #[test]
    fn test_arrays_replace_instead_of_concatenating() {
        let base = json!({ "hotkeys": { "next": ["j", "down"] } });
        let result = merged(base, json!({ "hotkeys": { "next": ["n"] } }));

        assert_eq!(result, json!({ "hotkeys": { "next": ["n"] } }));
    }

    #[test]
    fn test_scalars_and_nulls_replace() {
        let base = json!({ "closedCaptions": { "zoomApiToken": "abc" }, "count": 1 });
        let result = merged(base, json!({ "closedCaptions": { "zoomApiToken": null }, "count": { "nested": true } }));

        assert_eq!(
            result,
            json!({ "closedCaptions": { "zoomApiToken": null }, "count": { "nested": true } })
        );
    }

    #[test]
    fn test_new_keys_are_added() {
        let result = merged(json!({}), json!({ "security": { "private": true } }));
        assert_eq!(result["security"]["private"], true);
    }
}
