#![forbid(unsafe_code)]

use hookedit_core::{compute_diff, Entity, WebhookField, IDENTITY_FIELDS};
use proptest::prelude::*;
use serde_json::{json, Value as Json};

fn arb_field() -> impl Strategy<Value = WebhookField> {
    prop::sample::select(WebhookField::ALL.to_vec())
}

fn arb_path() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just("/up".to_string()), "/[a-z]{1,4}"]
}

// Small alphabets so that two generated entities often share values.
fn arb_value() -> impl Strategy<Value = Json> {
    prop_oneof![
        Just(Json::Null),
        prop_oneof![Just("http://a"), Just("http://b")].prop_map(|s| json!(s)),
        prop_oneof![Just("json"), Just("protobuf")].prop_map(|s| json!(s)),
        arb_path().prop_map(|p| json!({ "path": p })),
        (arb_path(), prop::collection::vec(0u8..3, 0..3)).prop_map(|(p, xs)| json!({ "meta": { "x": xs }, "path": p })),
    ]
}

fn arb_entity() -> impl Strategy<Value = Entity> {
    prop::collection::btree_map(arb_field(), arb_value(), 0..6).prop_map(|fields| {
        let mut e = Entity::new();
        for (f, v) in fields {
            e.set_value(f, v);
        }
        e
    })
}

fn arb_excluded() -> impl Strategy<Value = Vec<WebhookField>> {
    prop::sample::subsequence(WebhookField::ALL.to_vec(), 0..=3)
}

fn or_null(v: Option<&Json>) -> Json {
    v.cloned().unwrap_or(Json::Null)
}

proptest! {
    #[test]
    fn self_diff_is_empty(a in arb_entity(), excluded in arb_excluded()) {
        prop_assert!(compute_diff(&a, &a, &excluded).is_empty());
    }

    #[test]
    fn excluded_fields_never_appear(a in arb_entity(), b in arb_entity(), excluded in arb_excluded()) {
        let p = compute_diff(&a, &b, &excluded);
        for f in &excluded {
            prop_assert!(!p.contains(*f), "field {} leaked into {:?}", f, p);
        }
    }

    #[test]
    fn every_patched_field_differs_and_carries_edited_value(a in arb_entity(), b in arb_entity()) {
        let p = compute_diff(&a, &b, IDENTITY_FIELDS);
        for (field, value) in p.iter() {
            prop_assert_eq!(Some(value), b.get(field));
            prop_assert_ne!(&or_null(a.get(field)), value, "field {} did not change", field);
        }
    }

    #[test]
    fn every_changed_field_is_patched(a in arb_entity(), b in arb_entity(), excluded in arb_excluded()) {
        let p = compute_diff(&a, &b, &excluded);
        for (field, value) in b.iter() {
            if excluded.contains(&field) {
                continue;
            }
            let changed = &or_null(a.get(field)) != value;
            prop_assert_eq!(p.contains(field), changed, "field {}", field);
        }
    }

    #[test]
    fn omitted_fields_are_never_patched(a in arb_entity(), b in arb_entity()) {
        let p = compute_diff(&a, &b, &[]);
        for (field, _) in p.iter() {
            prop_assert!(b.contains(field));
        }
    }

    #[test]
    fn diff_is_deterministic(a in arb_entity(), b in arb_entity(), excluded in arb_excluded()) {
        let p1 = compute_diff(&a, &b, &excluded);
        let p2 = compute_diff(&a, &b, &excluded);
        prop_assert_eq!(serde_json::to_string(&p1).unwrap(), serde_json::to_string(&p2).unwrap());
        prop_assert_eq!(p1, p2);
    }

    #[test]
    fn applying_the_patch_reaches_the_edited_fields(a in arb_entity(), b in arb_entity()) {
        let p = compute_diff(&a, &b, IDENTITY_FIELDS);
        let mut merged = a.clone();
        merged.apply(&p);
        for (field, value) in b.iter() {
            if field == WebhookField::Ids {
                continue;
            }
            prop_assert_eq!(&or_null(merged.get(field)), value, "field {}", field);
        }
        for (field, value) in a.iter() {
            if !b.contains(field) || field == WebhookField::Ids {
                prop_assert_eq!(merged.get(field), Some(value), "untouched field {}", field);
            }
        }
    }
}

#[test]
fn nested_key_order_does_not_count_as_a_change() {
    let a: Entity = serde_json::from_str(r#"{ "join_accept": { "path": "/j", "meta": { "a": 1, "b": [1, 2] } } }"#).unwrap();
    let b: Entity = serde_json::from_str(r#"{ "join_accept": { "meta": { "b": [1, 2], "a": 1 }, "path": "/j" } }"#).unwrap();
    assert!(compute_diff(&a, &b, IDENTITY_FIELDS).is_empty());
}
