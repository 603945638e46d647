//! Response normalizer: free-form model text in, validated findings out.
//!
//! Grammar:
//! 1. the payload is the slice from the first `[` to the last `]`;
//! 2. that slice must parse as a JSON array, strictly;
//! 3. every element must be a JSON object;
//! 4. missing or unknown fields fall back to defaults (see [`normalize_item`]).
//!
//! A failure at steps 1–3 rejects the whole response; nothing is partially
//! trusted.

use serde_json::{Map, Value};

use designdiff_core::{
    Coordinates, DiscrepancyPriority, DiscrepancyStatus, DiscrepancyType, Shape,
};

use crate::error::VisionError;
use crate::finding::VisualDiscrepancy;

pub const DEFAULT_TITLE: &str = "Untitled discrepancy";

/// Parse the raw text of a model answer into findings.
pub fn parse_discrepancies(text: &str) -> Result<Vec<VisualDiscrepancy>, VisionError> {
    let slice = locate_array(text)
        .ok_or_else(|| VisionError::parse("no JSON array found in response"))?;

    let value: Value = serde_json::from_str(slice)
        .map_err(|e| VisionError::parse(format!("invalid JSON array: {e}")))?;

    let items = value
        .as_array()
        .ok_or_else(|| VisionError::parse("response payload is not an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_object()
                .map(normalize_item)
                .ok_or_else(|| VisionError::parse(format!("element {idx} is not an object")))
        })
        .collect()
}

/// First `[` through last `]`, inclusive.
fn locate_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Apply field-level defaults to one finding object.
///
/// - `title`: trimmed, [`DEFAULT_TITLE`] when missing or blank
/// - `description`: empty when missing
/// - `type`: `other` when missing or unknown
/// - `priority`: `medium` when missing or unknown
/// - `coordinates`: each numeric field coerced to a number, defaults
///   `x=0, y=0, width=10, height=10`; `shape` is `circle` or `rectangle`
/// - `status`: always `open`
pub fn normalize_item(obj: &Map<String, Value>) -> VisualDiscrepancy {
    let title = text_field(obj, "title")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let description = text_field(obj, "description").unwrap_or_default();

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DiscrepancyType>().ok())
        .unwrap_or(DiscrepancyType::Other);

    let priority = obj
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DiscrepancyPriority>().ok())
        .unwrap_or(DiscrepancyPriority::Medium);

    let coordinates = obj
        .get("coordinates")
        .and_then(Value::as_object)
        .map(normalize_coordinates)
        .unwrap_or_default();

    VisualDiscrepancy {
        title,
        description,
        kind,
        priority,
        status: DiscrepancyStatus::Open,
        coordinates,
    }
}

fn normalize_coordinates(obj: &Map<String, Value>) -> Coordinates {
    let shape = obj
        .get("shape")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Shape>().ok())
        .unwrap_or_default();

    Coordinates {
        x: number(obj.get("x")).unwrap_or(Coordinates::DEFAULT_X),
        y: number(obj.get("y")).unwrap_or(Coordinates::DEFAULT_Y),
        width: number(obj.get("width")).unwrap_or(Coordinates::DEFAULT_WIDTH),
        height: number(obj.get("height")).unwrap_or(Coordinates::DEFAULT_HEIGHT),
        shape,
    }
}

/// Numbers and numeric strings; anything non-finite counts as missing.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_embedded_in_prose() {
        let text = r#"Here are the differences I found:
```json
[{"title":"Button color","description":"Darker blue","type":"color","priority":"high",
  "coordinates":{"x":10,"y":10,"width":50,"height":20,"shape":"rectangle"}}]
```
Let me know if you need more."#;

        let items = parse_discrepancies(text).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "Button color");
        assert_eq!(item.kind, DiscrepancyType::Color);
        assert_eq!(item.priority, DiscrepancyPriority::High);
        assert_eq!(item.status, DiscrepancyStatus::Open);
        assert_eq!(item.coordinates, Coordinates::new(10.0, 10.0, 50.0, 20.0, Shape::Rectangle));
    }

    #[test]
    fn empty_array_is_valid_and_empty() {
        assert!(parse_discrepancies("[]").unwrap().is_empty());
        assert!(parse_discrepancies("nothing to report: [ ]").unwrap().is_empty());
    }

    #[test]
    fn missing_brackets_is_a_parse_error() {
        let err = parse_discrepancies("I could not compare these images.").unwrap_err();
        assert!(matches!(err, VisionError::AnalysisParse(_)));
    }

    #[test]
    fn inverted_brackets_is_a_parse_error() {
        assert!(matches!(
            parse_discrepancies("] oops ["),
            Err(VisionError::AnalysisParse(_))
        ));
    }

    #[test]
    fn two_separate_arrays_are_rejected() {
        // First `[` to last `]` spans both arrays and the prose between them.
        assert!(matches!(
            parse_discrepancies(r#"[{"title":"a"}] and also [{"title":"b"}]"#),
            Err(VisionError::AnalysisParse(_))
        ));
    }

    #[test]
    fn truncated_json_is_rejected() {
        assert!(matches!(
            parse_discrepancies(r#"[{"title":"a", "type": ]"#),
            Err(VisionError::AnalysisParse(_))
        ));
    }

    #[test]
    fn non_object_element_rejects_whole_response() {
        let err = parse_discrepancies(r#"[{"title":"ok"}, "stray string"]"#).unwrap_err();
        match err {
            VisionError::AnalysisParse(msg) => assert!(msg.contains("element 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_width_defaults_to_ten() {
        let items =
            parse_discrepancies(r#"[{"title":"Logo","coordinates":{"x":5,"y":6,"height":7}}]"#).unwrap();
        let c = items[0].coordinates;
        assert_eq!(c.width, 10.0);
        assert_eq!((c.x, c.y, c.height), (5.0, 6.0, 7.0));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let items = parse_discrepancies(
            r#"[{"coordinates":{"x":"12.5","y":" 40 ","width":"abc","height":null,"shape":"CIRCLE"}}]"#,
        )
        .unwrap();
        let c = items[0].coordinates;
        assert_eq!(c.x, 12.5);
        assert_eq!(c.y, 40.0);
        assert_eq!(c.width, Coordinates::DEFAULT_WIDTH);
        assert_eq!(c.height, Coordinates::DEFAULT_HEIGHT);
        assert_eq!(c.shape, Shape::Circle);
    }

    #[test]
    fn missing_coordinates_get_placeholder_box() {
        let items = parse_discrepancies(r#"[{"title":"Spacing"}]"#).unwrap();
        assert_eq!(items[0].coordinates, Coordinates::default());
    }

    #[test]
    fn unknown_enums_and_blank_title_get_defaults() {
        let items = parse_discrepancies(
            r#"[{"title":"  ","type":"spacing","priority":"critical","status":"resolved","shape":"star"}]"#,
        )
        .unwrap();
        let item = &items[0];
        assert_eq!(item.title, DEFAULT_TITLE);
        assert_eq!(item.description, "");
        assert_eq!(item.kind, DiscrepancyType::Other);
        assert_eq!(item.priority, DiscrepancyPriority::Medium);
        // Whatever the model claims, findings start open.
        assert_eq!(item.status, DiscrepancyStatus::Open);
    }

    #[test]
    fn enum_values_are_case_insensitive() {
        let items = parse_discrepancies(r#"[{"type":"Typography","priority":"LOW"}]"#).unwrap();
        assert_eq!(items[0].kind, DiscrepancyType::Typography);
        assert_eq!(items[0].priority, DiscrepancyPriority::Low);
    }

    #[test]
    fn item_count_is_not_enforced() {
        let many: Vec<String> = (0..9).map(|i| format!(r#"{{"title":"item {i}"}}"#)).collect();
        let text = format!("[{}]", many.join(","));
        assert_eq!(parse_discrepancies(&text).unwrap().len(), 9);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: each coordinate field is either the given number or its default.
            #[test]
            fn coordinates_use_value_or_default(
                x in proptest::option::of((-100i32..200).prop_map(f64::from)),
                y in proptest::option::of((-100i32..200).prop_map(f64::from)),
                width in proptest::option::of((0i32..100).prop_map(f64::from)),
                height in proptest::option::of((0i32..100).prop_map(f64::from)),
            ) {
                let mut coords = serde_json::Map::new();
                for (key, v) in [("x", x), ("y", y), ("width", width), ("height", height)] {
                    if let Some(v) = v {
                        coords.insert(key.to_string(), serde_json::json!(v));
                    }
                }
                let text = serde_json::json!([{ "title": "t", "coordinates": coords }]).to_string();

                let items = parse_discrepancies(&text).unwrap();
                let c = items[0].coordinates;
                prop_assert_eq!(c.x, x.unwrap_or(Coordinates::DEFAULT_X));
                prop_assert_eq!(c.y, y.unwrap_or(Coordinates::DEFAULT_Y));
                prop_assert_eq!(c.width, width.unwrap_or(Coordinates::DEFAULT_WIDTH));
                prop_assert_eq!(c.height, height.unwrap_or(Coordinates::DEFAULT_HEIGHT));
            }

            /// Property: every normalized finding is open, whatever status the model sent.
            #[test]
            fn every_item_is_open(status in "[a-z-]{0,12}", n in 0usize..8) {
                let items: Vec<_> = (0..n)
                    .map(|i| serde_json::json!({ "title": format!("t{i}"), "status": status }))
                    .collect();
                let text = format!("prefix {} suffix", serde_json::Value::Array(items));

                let parsed = parse_discrepancies(&text).unwrap();
                prop_assert_eq!(parsed.len(), n);
                prop_assert!(parsed.iter().all(|d| d.status == DiscrepancyStatus::Open));
            }
        }
    }
}
