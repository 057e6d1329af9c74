//! Field → Delta synchronizer. Regenerates the whole delta from the Field Store.
//!
//! Each present field becomes two runs: a bold, large heading (`FIELD NAME\n`) followed by a
//! plain body (`value\n\n`). JSON object/array values are pretty-printed for display.

use std::collections::HashSet;

use serde_json::Value;

use crate::document::delta::{Attributes, Delta, NamedSize, Run, Size};
use crate::document::fields::FieldStore;

/// Builds the delta for `store`, walking `order` (or store order when `order` is empty).
pub fn fields_to_delta(store: &FieldStore, order: &[String]) -> Delta {
    let mut delta = Delta::new();

    let names: Vec<&str> = if order.is_empty() {
        store.names().collect()
    } else {
        order.iter().map(String::as_str).collect()
    };

    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            continue;
        }
        let Some(value) = store.get(name) else {
            continue;
        };
        delta.push(Run::styled(
            format!("{}\n", heading_text(name)),
            heading_attributes(),
        ));
        delta.push(Run::plain(format!("{}\n\n", display_value(value))));
    }

    delta
}

/// `work_history` → `WORK HISTORY`.
pub fn heading_text(name: &str) -> String {
    name.replace('_', " ").to_uppercase()
}

pub fn heading_attributes() -> Attributes {
    Attributes {
        bold: Some(true),
        size: Some(Size::Named(NamedSize::Large)),
        ..Attributes::default()
    }
}

/// Pretty-prints JSON objects/arrays (2-space indent); anything else is shown verbatim.
pub fn display_value(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string())
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store(pairs: &[(&str, Option<&str>)]) -> FieldStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(String::from)))
            .collect()
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_name_email_scenario() {
        let fields = store(&[("name", Some("John Doe")), ("email", Some("j@x.com"))]);
        let delta = fields_to_delta(&fields, &order(&["name", "email"]));

        let expected = Delta::from(vec![
            Run::styled("NAME\n", heading_attributes()),
            Run::plain("John Doe\n\n"),
            Run::styled("EMAIL\n", heading_attributes()),
            Run::plain("j@x.com\n\n"),
        ]);
        assert_eq!(delta, expected);
    }

    #[test]
    fn test_null_fields_are_skipped() {
        let fields = store(&[("a", Some("1")), ("b", None), ("c", Some("3"))]);
        let delta = fields_to_delta(&fields, &order(&["a", "b", "c", "missing"]));

        assert_eq!(delta.len(), 4);
        assert_eq!(delta.text(), "A\n1\n\nC\n3\n\n");
    }

    #[test]
    fn test_order_list_wins_over_store_order() {
        let fields = store(&[("first", Some("1")), ("second", Some("2"))]);
        let delta = fields_to_delta(&fields, &order(&["second", "first"]));
        assert_eq!(delta.runs[0].text, "SECOND\n");
        assert_eq!(delta.runs[2].text, "FIRST\n");
    }

    #[test]
    fn test_empty_order_falls_back_to_store_order() {
        let fields = store(&[("work_history", Some("x")), ("skills", Some("y"))]);
        let delta = fields_to_delta(&fields, &[]);
        assert_eq!(delta.runs[0].text, "WORK HISTORY\n");
        assert_eq!(delta.runs[2].text, "SKILLS\n");
    }

    #[test]
    fn test_repeated_order_entry_emitted_once() {
        let fields = store(&[("name", Some("Jane"))]);
        let delta = fields_to_delta(&fields, &order(&["name", "name"]));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let fields = store(&[("skills", Some("[\"Rust\",\"Go\"]")), ("name", Some("Jane"))]);
        let ord = order(&["name", "skills"]);
        assert_eq!(fields_to_delta(&fields, &ord), fields_to_delta(&fields, &ord));
    }

    #[test]
    fn test_display_value_pretty_prints_structures() {
        assert_eq!(display_value("[\"Rust\",\"Go\"]"), "[\n  \"Rust\",\n  \"Go\"\n]");
        assert_eq!(
            display_value("{\"b\":1,\"a\":2}"),
            "{\n  \"b\": 1,\n  \"a\": 2\n}"
        );
    }

    #[test]
    fn test_display_value_verbatim_for_scalars_and_text() {
        assert_eq!(display_value("42"), "42");
        assert_eq!(display_value("\"quoted\""), "\"quoted\"");
        assert_eq!(display_value("plain text, not json"), "plain text, not json");
        assert_eq!(display_value("{broken"), "{broken");
    }
}
