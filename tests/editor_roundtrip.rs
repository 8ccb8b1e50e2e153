//! Property-based tests for the format adapters.
//!
//! Documents are generated from a small grammar covering comments, blank
//! lines, nesting and the usual scalar styles, then parsed and rendered
//! back without mutation.

use proptest::prelude::*;

use multirepo::editor::{Document, IniDocument, StructuredDocument, TomlDocument, YamlDocument};

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,7}"
}

fn comment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,]{0,20}".prop_map(|text| format!("# {}", text.trim_end()))
}

fn yaml_scalar() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9]{0,10}",
        "[0-9]{1,5}",
        Just("true".to_string()),
        Just("null".to_string()),
        "[a-z ]{0,10}".prop_map(|s| format!("'{s}'")),
        "[a-z ]{0,10}".prop_map(|s| format!("\"{s}\"")),
        prop::collection::vec("[a-z]{1,5}", 0..4).prop_map(|items| format!("[{}]", items.join(", "))),
    ]
}

/// One top-level entry, possibly with children, as YAML lines.
fn yaml_entry() -> impl Strategy<Value = Vec<String>> {
    let trailing = prop::option::of(comment());
    prop_oneof![
        (key(), yaml_scalar(), trailing).prop_map(|(k, v, c)| {
            vec![match c {
                Some(c) => format!("{k}: {v}  {c}"),
                None => format!("{k}: {v}"),
            }]
        }),
        (key(), prop::collection::vec((key(), yaml_scalar()), 1..4)).prop_map(|(k, children)| {
            let mut lines = vec![format!("{k}:")];
            let mut seen = Vec::new();
            for (child, value) in children {
                if !seen.contains(&child) {
                    lines.push(format!("  {child}: {value}"));
                    seen.push(child);
                }
            }
            lines
        }),
        (key(), prop::collection::vec(yaml_scalar(), 1..4)).prop_map(|(k, items)| {
            let mut lines = vec![format!("{k}:")];
            lines.extend(items.into_iter().map(|item| format!("  - {item}")));
            lines
        }),
    ]
}

fn yaml_document() -> impl Strategy<Value = String> {
    prop::collection::vec((prop::option::of(comment()), any::<bool>(), yaml_entry()), 0..6)
        .prop_map(|entries| {
            let mut seen = Vec::new();
            let mut out = String::new();
            for (comment, blank, lines) in entries {
                let name = lines[0].split(':').next().unwrap_or_default().to_string();
                if seen.contains(&name) {
                    continue;
                }
                seen.push(name);
                if blank {
                    out.push('\n');
                }
                if let Some(comment) = comment {
                    out.push_str(&comment);
                    out.push('\n');
                }
                for line in lines {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            out
        })
}

fn toml_document() -> impl Strategy<Value = String> {
    let value = prop_oneof![
        "[0-9]{1,5}",
        Just("true".to_string()),
        "[a-z ]{0,10}".prop_map(|s| format!("\"{s}\"")),
        "[a-z]{0,10}".prop_map(|s| format!("'{s}'")),
        prop::collection::vec("[0-9]{1,3}", 0..4).prop_map(|items| format!("[{}]", items.join(", "))),
    ];
    let section = (
        prop::option::of(comment()),
        prop::collection::btree_map(key(), value, 0..4),
    );
    prop::collection::btree_map(key(), section, 0..4).prop_map(|sections| {
        let mut out = String::new();
        for (name, (comment, entries)) in sections {
            if let Some(comment) = comment {
                out.push_str(&comment);
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (k, v) in entries {
                out.push_str(&format!("{k} = {v}\n"));
            }
            out.push('\n');
        }
        out
    })
}

fn ini_document() -> impl Strategy<Value = String> {
    let value = "[a-zA-Z0-9_.,/ -]{0,15}".prop_map(|s| s.trim().to_string());
    let section = (
        prop::option::of(comment()),
        prop::collection::btree_map(key(), value, 0..4),
    );
    prop::collection::btree_map(key(), section, 0..4).prop_map(|sections| {
        let mut out = String::new();
        for (name, (comment, entries)) in sections {
            if let Some(comment) = comment {
                out.push_str(&comment);
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (k, v) in entries {
                out.push_str(&format!("{k} = {v}\n"));
            }
            out.push('\n');
        }
        out
    })
}

/// Every non-blank line of `original` appears in `rendered`, in order.
fn contains_in_order(rendered: &str, original: &str) -> bool {
    let mut lines = rendered.lines();
    original
        .lines()
        .filter(|line| !line.trim().is_empty())
        .all(|wanted| lines.any(|line| line == wanted))
}

proptest! {
    #[test]
    fn yaml_round_trip(text in yaml_document()) {
        let doc = YamlDocument::parse(&text).unwrap();
        prop_assert_eq!(doc.render(), text);
    }

    #[test]
    fn toml_round_trip(text in toml_document()) {
        let doc = TomlDocument::parse(&text).unwrap();
        prop_assert_eq!(doc.render(), text);
    }

    #[test]
    fn ini_round_trip(text in ini_document()) {
        let doc = IniDocument::parse(&text).unwrap();
        prop_assert_eq!(doc.render(), text);
    }

    #[test]
    fn yaml_setdefault_is_idempotent(text in yaml_document(), value in "[a-z]{1,8}") {
        let mut doc = YamlDocument::parse(&text).unwrap();
        // Generated keys are lowercase, so `Added` is always new.
        let first = doc.setdefault("Added.leaf", value.as_str()).unwrap();
        let rendered = doc.render();
        let second = doc.setdefault("Added.leaf", "other").unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(doc.render(), rendered);
        prop_assert!(doc.render().starts_with(text.trim_end_matches('\n')));
    }

    #[test]
    fn toml_set_keeps_other_sections(text in toml_document()) {
        let mut doc = TomlDocument::parse(&text).unwrap();
        doc.set("Added.key", 1).unwrap();
        let rendered = doc.render();
        prop_assert!(contains_in_order(&rendered, &text));
        prop_assert_eq!(doc.get("Added.key").and_then(|v| v.as_i64()), Some(1));
        prop_assert_eq!(TomlDocument::parse(&rendered).unwrap().to_value(), doc.to_value());
    }
}
