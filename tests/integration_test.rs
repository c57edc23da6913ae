// End-to-end tests for stickler
use serde_json::{json, Value};
use stickler::prelude::*;
use stickler_core::NodeResult;

fn registry() -> ComparatorRegistry {
    ComparatorRegistry::with_defaults()
}

fn invoice_schema() -> (SchemaSet, SchemaId) {
    parse_schema(&json!({
        "title": "Invoice",
        "type": "object",
        "properties": {
            "invoice_number": {"type": "string", "x-comparator": "exact"},
            "total": {"type": "number", "x-threshold": 0.95},
            "items": {
                "type": "array",
                "items": {
                    "title": "LineItem",
                    "type": "object",
                    "properties": {
                        "sku": {"type": "string", "x-comparator": "exact"},
                        "qty": {"type": "integer"}
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn product_list_schema() -> (SchemaSet, SchemaId) {
    parse_schema(&json!({
        "title": "Catalog",
        "type": "object",
        "properties": {
            "products": {
                "type": "array",
                "items": {
                    "title": "Product",
                    "type": "object",
                    "x-match-threshold": 0.8,
                    "properties": {
                        "product_id": {"type": "string", "x-comparator": "exact", "x-weight": 3.0},
                        "name": {"type": "string", "x-threshold": 0.7, "x-weight": 2.0},
                        "price": {"type": "number", "x-threshold": 0.9}
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn run(
    schemas: &(SchemaSet, SchemaId),
    gt: &Value,
    pred: &Value,
) -> ComparisonResult {
    compare(
        gt,
        pred,
        &schemas.0,
        schemas.1,
        &registry(),
        &CompareOptions::default(),
    )
    .unwrap()
}

/// Every node must keep fp equal to fd + fa.
fn assert_fp_consistent(node: &NodeResult) {
    assert_eq!(
        node.overall.counts.fp,
        node.overall.counts.fd + node.overall.counts.fa,
        "overall fp must equal fd + fa"
    );
    if let Some(aggregate) = &node.aggregate {
        assert_eq!(aggregate.counts.fp, aggregate.counts.fd + aggregate.counts.fa);
    }
    for child in node.fields.values() {
        assert_fp_consistent(child);
    }
}

/// Non-leaf aggregates must be the sum of their children's aggregates.
fn assert_aggregate_sums(node: &NodeResult) {
    if node.fields.is_empty() {
        return;
    }
    let mut sum = Counts::default();
    for child in node.fields.values() {
        sum.add(&child.aggregate.as_ref().unwrap().counts);
        assert_aggregate_sums(child);
    }
    assert_eq!(node.aggregate.as_ref().unwrap().counts, sum);
}

// --- End-to-end scenarios ------------------------------------------------

#[test]
fn test_exact_invoice_scores_one() {
    let schemas = invoice_schema();
    let record = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1}]
    });
    let result = run(&schemas, &record, &record);

    assert_eq!(result.overall_score(), 1.0);
    assert!(result.all_fields_matched());
    assert!(result.non_matches().is_empty());

    let aggregate = result.aggregate_counts();
    assert_eq!(aggregate.tp, 6); // 2 scalars + 2 skus + 2 qtys
    assert_eq!(aggregate.fd, 0);
    assert_eq!(aggregate.fa, 0);
    assert_eq!(aggregate.fn_, 0);
    assert_eq!(aggregate.tn, 0);
}

#[test]
fn test_numeric_tolerance_within_band() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "total": {"type": "number", "x-comparator": "tolerance", "x-threshold": 0.95}
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"total": 1247.50}),
        &json!({"total": 1247.48}),
    );

    assert_eq!(result.overall_counts().tp, 1);
    let total = &result.root.fields["total"];
    assert!(total.scores.unwrap().raw_similarity_score >= 0.95);
}

#[test]
fn test_reordered_primitive_list_matches() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "tags": {"type": "array", "items": {"type": "string"}, "x-threshold": 0.7}
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"tags": ["red", "blue", "green"]}),
        &json!({"tags": ["blue", "green", "red"]}),
    );

    let counts = result.overall_counts();
    assert_eq!(counts.tp, 3);
    assert_eq!(counts.fd + counts.fa + counts.fn_, 0);
    assert_eq!(result.root.fields["tags"].overall.similarity_score, 1.0);
}

#[test]
fn test_primitive_list_with_typo_and_substitute() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "fruit": {"type": "array", "items": {"type": "string"}, "x-threshold": 0.7}
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"fruit": ["apple", "banana", "cherry"]}),
        &json!({"fruit": ["aple", "banana", "orange"]}),
    );

    let counts = result.overall_counts();
    assert_eq!(counts.tp, 2); // apple<->aple (0.8), banana<->banana
    assert_eq!(counts.fd, 1); // cherry<->orange
    assert_eq!(counts.fn_, 0);
    assert_eq!(counts.fa, 0);
}

#[test]
fn test_record_list_threshold_gating() {
    let schemas = product_list_schema();
    let gt = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "002", "name": "Mouse", "price": 29.99},
        {"product_id": "003", "name": "Cable", "price": 14.99}
    ]});
    let pred = json!({"products": [
        {"product_id": "001", "name": "Laptop Computer", "price": 999.99},
        {"product_id": "002", "name": "Different Product", "price": 99.99},
        {"product_id": "004", "name": "New", "price": 19.99}
    ]});
    let result = run(&schemas, &gt, &pred);

    // Only (001, 001) clears the 0.8 match threshold.
    let products = &result.root.fields["products"];
    assert_eq!(products.overall.counts.tp, 1);
    assert_eq!(products.overall.counts.fd, 2);
    assert_eq!(products.overall.counts.fa, 0);
    assert_eq!(products.overall.counts.fn_, 0);

    // Field children aggregate the gated-in pair only.
    let product_id = &products.fields["product_id"];
    assert_eq!(product_id.overall.counts.tp, 1);
    assert_eq!(product_id.overall.counts.total(), 1);

    // Both gated-out pairs are documented with their similarity.
    let object_fds: Vec<_> = result
        .non_matches()
        .iter()
        .filter(|nm| nm.field_path == "products" && nm.kind == Classification::Fd)
        .collect();
    assert_eq!(object_fds.len(), 2);
    assert!(object_fds.iter().all(|nm| nm.similarity.is_some()));

    // The gated-in pair still reports its below-threshold name.
    assert!(result
        .non_matches()
        .iter()
        .any(|nm| nm.field_path == "products[0].name"));
}

#[test]
fn test_missing_field_is_fn() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "phone": {"type": "string"}
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"name": "John", "phone": "555-1"}),
        &json!({"name": "John"}),
    );

    let aggregate = result.aggregate_counts();
    assert_eq!(aggregate.tp, 1);
    assert_eq!(aggregate.fn_, 1);
    assert!(!result.all_fields_matched());

    let nm = &result.non_matches()[0];
    assert_eq!(nm.field_path, "phone");
    assert_eq!(nm.kind, Classification::Fn);
}

#[test]
fn test_type_mismatch_is_fd_not_error() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {"age": {"type": "integer"}}
    }))
    .unwrap();
    let result = run(&schemas, &json!({"age": 30}), &json!({"age": "thirty"}));

    let age = &result.root.fields["age"];
    assert_eq!(age.overall.counts.fd, 1);
    assert_eq!(age.scores.unwrap().raw_similarity_score, 0.0);
}

// --- Invariants ----------------------------------------------------------

#[test]
fn test_fp_decomposition_everywhere() {
    let schemas = product_list_schema();
    let gt = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "002", "name": "Mouse", "price": 29.99}
    ]});
    let pred = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "009", "name": "Webcam", "price": 59.99},
        {"product_id": "010", "name": "Stand", "price": 89.99}
    ]});
    let result = run(&schemas, &gt, &pred);
    assert_fp_consistent(&result.root);
}

#[test]
fn test_leaf_aggregate_equals_overall() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "a": {"type": "string"},
            "b": {"type": "number"}
        }
    }))
    .unwrap();
    let result = run(&schemas, &json!({"a": "x", "b": 1.0}), &json!({"a": "y", "b": 1.0}));
    for child in result.root.fields.values() {
        assert_eq!(child.aggregate.as_ref().unwrap().counts, child.overall.counts);
    }
}

#[test]
fn test_aggregates_sum_over_children() {
    let schemas = invoice_schema();
    let gt = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1}]
    });
    let pred = json!({
        "invoice_number": "INV-2",
        "total": 90.0,
        "items": [{"sku": "A", "qty": 2}]
    });
    let result = run(&schemas, &gt, &pred);
    assert_aggregate_sums(&result.root);
}

#[test]
fn test_self_comparison_is_perfect() {
    let schemas = product_list_schema();
    let record = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "002", "name": "Mouse", "price": 29.99}
    ]});
    let result = run(&schemas, &record, &record);

    assert_eq!(result.overall_score(), 1.0);
    assert!(result.all_fields_matched());
    let aggregate = result.aggregate_counts();
    assert_eq!(aggregate.fd + aggregate.fa + aggregate.fn_, 0);
}

#[test]
fn test_null_equivalence_forms_agree() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    }))
    .unwrap();
    let gt = json!({"name": "John", "tags": ["a"]});

    let variants = [
        json!({"name": "John"}),
        json!({"name": "John", "tags": null}),
        json!({"name": "John", "tags": []}),
    ];
    let baseline = run(&schemas, &gt, &variants[0]).to_value();
    for variant in &variants[1..] {
        assert_eq!(run(&schemas, &gt, variant).to_value(), baseline);
    }

    // The empty string is null-equivalent too: null vs "" is a TN.
    let result = run(&schemas, &json!({"name": ""}), &json!({"tags": []}));
    assert_eq!(result.root.fields["name"].overall.counts.tn, 1);
    assert_eq!(result.root.fields["tags"].overall.counts.tn, 1);
    assert_eq!(result.overall_score(), 1.0);
}

#[test]
fn test_primitive_list_order_invariance() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "tags": {"type": "array", "items": {"type": "string"}, "x-threshold": 0.7}
        }
    }))
    .unwrap();
    let gt = json!({"tags": ["alpha", "beta", "gamma", "delta"]});
    let pred = json!({"tags": ["beta", "gama", "epsilon", "alpha"]});
    let shuffled_gt = json!({"tags": ["delta", "gamma", "alpha", "beta"]});
    let shuffled_pred = json!({"tags": ["alpha", "epsilon", "beta", "gama"]});

    let a = run(&schemas, &gt, &pred);
    let b = run(&schemas, &shuffled_gt, &shuffled_pred);
    assert_eq!(a.overall_counts(), b.overall_counts());
    assert_eq!(
        a.root.fields["tags"].overall.similarity_score,
        b.root.fields["tags"].overall.similarity_score
    );
}

#[test]
fn test_record_list_order_invariance() {
    let schemas = product_list_schema();
    let gt = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "002", "name": "Mouse", "price": 29.99},
        {"product_id": "003", "name": "Cable", "price": 14.99}
    ]});
    let pred = json!({"products": [
        {"product_id": "003", "name": "Cable", "price": 14.99},
        {"product_id": "001", "name": "Laptop", "price": 999.99},
        {"product_id": "002", "name": "Trackball", "price": 34.99}
    ]});
    let shuffled = json!({"products": [
        {"product_id": "002", "name": "Trackball", "price": 34.99},
        {"product_id": "003", "name": "Cable", "price": 14.99},
        {"product_id": "001", "name": "Laptop", "price": 999.99}
    ]});

    let a = run(&schemas, &gt, &pred);
    let b = run(&schemas, &gt, &shuffled);
    assert_eq!(a.overall_counts(), b.overall_counts());
    assert_eq!(a.overall_score(), b.overall_score());
}

#[test]
fn test_gated_out_pairs_contribute_no_children() {
    let schemas = product_list_schema();
    // Nothing here comes close to the 0.8 match threshold.
    let gt = json!({"products": [
        {"product_id": "001", "name": "Laptop", "price": 999.99}
    ]});
    let pred = json!({"products": [
        {"product_id": "777", "name": "Umbrella", "price": 9.99}
    ]});
    let result = run(&schemas, &gt, &pred);

    let products = &result.root.fields["products"];
    assert_eq!(products.overall.counts.fd, 1);
    assert!(products.fields.is_empty());
    assert_eq!(products.aggregate.as_ref().unwrap().counts, Counts::default());
}

#[test]
fn test_all_fields_matched_iff_no_non_matches() {
    let schemas = invoice_schema();
    let gt = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 2}]
    });

    let clean = run(&schemas, &gt, &gt);
    assert!(clean.all_fields_matched());
    assert!(clean.non_matches().is_empty());

    // A deep sub-field failure inside a gated-in pair must flip both:
    // the qty drift keeps the pair above the 0.7 match threshold but
    // fails the qty field itself.
    let gt_qty = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 10}]
    });
    let pred = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 22}]
    });
    let dirty = run(&schemas, &gt_qty, &pred);
    assert!(!dirty.all_fields_matched());
    assert!(dirty
        .non_matches()
        .iter()
        .any(|nm| nm.field_path == "items[0].qty"));
}

#[test]
fn test_aggregate_opt_out_excludes_subtree_from_root() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "debug_info": {"type": "string", "x-aggregate": false}
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"name": "John", "debug_info": "trace-a"}),
        &json!({"name": "John", "debug_info": "completely different"}),
    );

    // The excluded field keeps its own counts...
    let debug_info = &result.root.fields["debug_info"];
    assert_eq!(debug_info.overall.counts.fd, 1);
    assert_eq!(debug_info.aggregate.as_ref().unwrap().counts.fd, 1);

    // ...but the root rollup ignores it.
    assert_eq!(result.aggregate_counts().tp, 1);
    assert_eq!(result.aggregate_counts().fd, 0);

    // Root overall still includes the object-level count.
    assert_eq!(result.overall_counts().fd, 1);
}

// --- Options, rendering, and errors --------------------------------------

#[test]
fn test_clip_under_threshold_zeroes_applied_score() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "a": {"type": "string", "x-threshold": 0.9, "x-clip-under-threshold": true},
            "b": {"type": "string", "x-threshold": 0.9}
        }
    }))
    .unwrap();
    // Identical one-edit drift on both fields: raw 0.8, below the 0.9
    // threshold; only the clipping field contributes zero.
    let result = run(
        &schemas,
        &json!({"a": "apple", "b": "apple"}),
        &json!({"a": "aple", "b": "aple"}),
    );

    let a = result.root.fields["a"].scores.unwrap();
    let b = result.root.fields["b"].scores.unwrap();
    assert!((a.raw_similarity_score - 0.8).abs() < 1e-9);
    assert_eq!(a.threshold_applied_score, 0.0);
    assert!((b.threshold_applied_score - 0.8).abs() < 1e-9);

    // Both classify as FD regardless of clipping.
    assert_eq!(result.aggregate_counts().fd, 2);
    // Parent score: (0.0 + 0.8) / 2.
    assert!((result.overall_score() - 0.4).abs() < 1e-9);
}

#[test]
fn test_evaluator_format_reshape() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "phone": {"type": "string"}
        }
    }))
    .unwrap();
    let options = CompareOptions {
        evaluator_format: true,
        ..CompareOptions::default()
    };
    let result = compare(
        &json!({"name": "John", "phone": "555-1"}),
        &json!({"name": "John"}),
        &schemas.0,
        schemas.1,
        &registry(),
        &options,
    )
    .unwrap();

    let doc = result.to_value();
    assert_eq!(doc["precision"], 1.0);
    assert_eq!(doc["recall"], 0.5);
    assert_eq!(doc["accuracy"], 0.5);
    assert_eq!(doc["anls_score"], 0.5);
    assert!(doc["fields"]["phone"].get("recall").is_some());
    // The reshape never mixes with the standard tree.
    assert!(doc.get("overall").is_none());
    assert!(doc.get("aggregate").is_none());
}

#[test]
fn test_confusion_matrix_can_be_omitted() {
    let schemas = invoice_schema();
    let record = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 2}]
    });
    let options = CompareOptions {
        include_confusion_matrix: false,
        ..CompareOptions::default()
    };
    let result = compare(&record, &record, &schemas.0, schemas.1, &registry(), &options).unwrap();

    let doc = result.to_value();
    assert!(doc.get("aggregate").is_none());
    assert!(doc["fields"]["items"].get("aggregate").is_none());
    assert!(doc.get("overall").is_some());
    assert_eq!(doc["version"], 1);
}

#[test]
fn test_non_matches_rendered_on_request() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {"name": {"type": "string"}}
    }))
    .unwrap();
    let gt = json!({"name": "John"});
    let pred = json!({});

    let silent = run(&schemas, &gt, &pred).to_value();
    assert!(silent.get("non_matches").is_none());

    let options = CompareOptions {
        document_non_matches: true,
        ..CompareOptions::default()
    };
    let documented = compare(&gt, &pred, &schemas.0, schemas.1, &registry(), &options)
        .unwrap()
        .to_value();
    let non_matches = documented["non_matches"].as_array().unwrap();
    assert_eq!(non_matches.len(), 1);
    assert_eq!(non_matches[0]["field_path"], "name");
    assert_eq!(non_matches[0]["kind"], "FN");
    assert_eq!(non_matches[0]["details"]["reason"], "missing in prediction");
}

#[test]
fn test_recall_with_fd_only_changes_derived() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "a": {"type": "string", "x-comparator": "exact"},
            "b": {"type": "string", "x-comparator": "exact"},
            "c": {"type": "string", "x-comparator": "exact"}
        }
    }))
    .unwrap();
    let gt = json!({"a": "x", "b": "y", "c": "z"});
    let pred = json!({"a": "x", "b": "wrong"});

    let plain = run(&schemas, &gt, &pred);
    let options = CompareOptions {
        recall_with_fd: true,
        ..CompareOptions::default()
    };
    let with_fd = compare(&gt, &pred, &schemas.0, schemas.1, &registry(), &options).unwrap();

    // Base counts identical: tp=1, fd=1, fn=1.
    assert_eq!(plain.aggregate_counts(), with_fd.aggregate_counts());

    let d1 = plain.root.aggregate.as_ref().unwrap().derived.unwrap();
    let d2 = with_fd.root.aggregate.as_ref().unwrap().derived.unwrap();
    assert!((d1.recall - 0.5).abs() < 1e-9);
    assert!((d2.recall - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(d1.precision, d2.precision);
}

#[test]
fn test_unknown_comparator_rejected_up_front() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {"name": {"type": "string", "x-comparator": "embedding-cosine"}}
    }))
    .unwrap();
    let err = compare(
        &json!({"name": "a"}),
        &json!({"name": "a"}),
        &schemas.0,
        schemas.1,
        &registry(),
        &CompareOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[test]
fn test_non_record_input_is_precondition_error() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {"name": {"type": "string"}}
    }))
    .unwrap();
    let err = compare(
        &json!(42),
        &json!({"name": "a"}),
        &schemas.0,
        schemas.1,
        &registry(),
        &CompareOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_cancelled_comparison_returns_no_tree() {
    let schemas = invoice_schema();
    let token = CancelToken::new();
    token.cancel();
    let options = CompareOptions {
        cancel: Some(token),
        ..CompareOptions::default()
    };
    let record = json!({
        "invoice_number": "INV-1",
        "total": 100.0,
        "items": [{"sku": "A", "qty": 2}]
    });
    let err = compare(&record, &record, &schemas.0, schemas.1, &registry(), &options).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_custom_comparator_through_registry() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {"name": {"type": "string", "x-comparator": "always-match"}}
    }))
    .unwrap();
    let mut registry = ComparatorRegistry::with_defaults();
    registry.register(
        "always-match",
        |_: &Value, _: &Value| -> std::result::Result<f64, ComparatorError> { Ok(1.0) },
    );

    let result = compare(
        &json!({"name": "completely"}),
        &json!({"name": "different"}),
        &schemas.0,
        schemas.1,
        &registry,
        &CompareOptions::default(),
    )
    .unwrap();
    assert_eq!(result.overall_score(), 1.0);
}

#[test]
fn test_nested_record_one_side_null() {
    let schemas = parse_schema(&json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "address": {
                "type": "object",
                "properties": {
                    "street": {"type": "string"},
                    "city": {"type": "string"}
                }
            }
        }
    }))
    .unwrap();
    let result = run(
        &schemas,
        &json!({"name": "John", "address": {"street": "Main St", "city": "Springfield"}}),
        &json!({"name": "John"}),
    );

    // One object-level miss, zero primitives recursed into.
    let address = &result.root.fields["address"];
    assert_eq!(address.overall.counts.fn_, 1);
    assert!(address.fields.is_empty());
    assert_eq!(address.aggregate.as_ref().unwrap().counts, Counts::default());

    // Root aggregate sees only the name primitive.
    assert_eq!(result.aggregate_counts().tp, 1);
    assert_eq!(result.aggregate_counts().fn_, 0);
    // Root overall sees the object-level miss.
    assert_eq!(result.overall_counts().fn_, 1);
}
