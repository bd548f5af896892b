use std::path::PathBuf;

use promptloom::normalize::{DiagnosticCode, EvaluationType, Normalizer};
use promptloom::patch::{apply_batch, order_by_descending_position, PatchStatus};
use promptloom::{default_config, ErrorKind};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("Failed to read fixture")
}

fn normalizer() -> Normalizer {
    Normalizer::new(default_config()).expect("Default config should compile")
}

#[test]
fn test_fenced_evaluation_with_patch_plan() {
    let raw = fixture("evaluation_fenced.txt");
    let out = normalizer()
        .evaluation(&raw, EvaluationType::Optimized)
        .expect("Should normalize");

    assert!(!out.degraded);
    let result = out.value;
    assert_eq!(result.score.overall, 100.0, "112 should clamp to 100");
    assert_eq!(result.score.dimensions.len(), 3);
    assert_eq!(result.issues.len(), 2);
    assert_eq!(result.patch_plan.len(), 2);

    let prompt = "Explain recursion. Keep it short.";
    let ordered = order_by_descending_position(prompt, &result.patch_plan);
    let batch = apply_batch(prompt, &ordered);
    assert!(batch.all_applied());
    assert_eq!(
        batch.text,
        "Explain recursion to a first-year student. Answer as a numbered list of at most five items."
    );
}

#[test]
fn test_compare_prose_uses_heuristic() {
    let raw = fixture("compare_prose.txt");
    let out = normalizer()
        .evaluation(&raw, EvaluationType::Compare)
        .expect("Heuristic should find a score");

    assert!(out.degraded);
    assert_eq!(out.value.score.overall, 76.0);
    assert_eq!(out.value.score.dimensions[0].key, "overall");
    assert_eq!(out.value.is_optimized_better, Some(true));
}

#[test]
fn test_array_wrapped_evaluation() {
    let raw = fixture("evaluation_array.txt");
    let out = normalizer()
        .evaluation(&raw, EvaluationType::Original)
        .expect("Should select the scored element");

    assert_eq!(out.value.score.overall, 64.0);
    assert_eq!(out.value.issues, vec!["Missing constraints"]);
    assert!(out.value.improvements.is_empty());
}

#[test]
fn test_truncated_evaluation_is_repaired() {
    let raw = fixture("evaluation_truncated.txt");
    let out = normalizer()
        .evaluation(&raw, EvaluationType::Original)
        .expect("Repair should close the truncated object");

    let result = out.value;
    assert!(!out.degraded);
    assert_eq!(result.score.overall, 58.0);
    assert_eq!(result.score.dimensions[0].key, "clarity");
    assert_eq!(result.issues, vec!["Rambling intro", "Unclear goal"]);
    assert!(result.summary.starts_with("Needs a clearer goal"));
}

#[test]
fn test_decimal_or_oversized_number_is_not_a_score() {
    let normalizer = normalizer();
    for raw in [
        "我给这个提示词打 85.5 分，整体不错。",
        "Score: 1000 points is impossible; the prompt is fine.",
    ] {
        let err = normalizer
            .evaluation(raw, EvaluationType::Original)
            .expect_err("No whole 0..=100 score in the reply");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}

#[test]
fn test_evaluation_after_bracketed_prose() {
    let raw = r#"Evaluation [v2]: {"score":{"overall":80,"dimensions":[{"key":"clarity","label":"Clarity","score":80}]},"summary":"ok"}"#;
    let out = normalizer()
        .evaluation(raw, EvaluationType::Original)
        .expect("The object after the bracketed tag should be used");

    assert!(!out.degraded);
    assert_eq!(out.value.score.overall, 80.0);
    assert_eq!(out.value.summary, "ok");
}

#[test]
fn test_extraction_filters_existing_and_duplicates() {
    let raw = fixture("extraction_season.txt");
    let out = normalizer()
        .variable_extraction(&raw, &["season".to_string()])
        .expect("Should normalize");

    let names: Vec<_> = out.value.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["city", "days"]);
    assert_eq!(out.value.variables[0].position.occurrence, 2);

    let codes: Vec<_> = out.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::ExistingName, DiagnosticCode::DuplicateName]
    );
}

#[test]
fn test_generation_aligns_with_request() {
    let raw = fixture("generation_partial.txt");
    let requested: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let out = normalizer()
        .variable_values(&raw, &requested)
        .expect("Should normalize");

    let values = &out.value.values;
    assert_eq!(values.len(), 3);
    let order: Vec<_> = values.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(order, vec!["A", "B", "C"]);
    assert_eq!(values[0].value, "Lisbon");
    assert_eq!(values[1].value, "");
    assert_eq!(values[1].confidence, Some(0.0));
    assert_eq!(
        values[1].reason,
        "(model did not generate a value for this variable)"
    );
    assert_eq!(values[2].value, "formal");

    let codes: Vec<_> = out.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::UnrequestedValue, DiagnosticCode::MissingValue]
    );
}

#[test]
fn test_unparseable_extraction_reports_length() {
    let raw = "Sorry, I can't help with that.";
    let err = normalizer()
        .variable_extraction(raw, &[])
        .expect_err("Prose has no variables object");
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains(&format!("input length: {}", raw.len())));
}

#[test]
fn test_patch_reports_skip_without_blocking() {
    let raw = fixture("evaluation_fenced.txt");
    let plan = normalizer()
        .evaluation(&raw, EvaluationType::Optimized)
        .expect("Should normalize")
        .value
        .patch_plan;

    // The first anchor is absent from this prompt; the second still applies.
    let batch = apply_batch("Keep it short.", &plan);
    assert_eq!(batch.reports[0].status, PatchStatus::Skipped);
    assert_eq!(batch.reports[1].status, PatchStatus::Applied);
    assert_eq!(batch.text, "Answer as a numbered list of at most five items.");
}

#[test]
fn test_concurrent_normalization_shares_one_normalizer() {
    let normalizer = std::sync::Arc::new(normalizer());
    let raw = std::sync::Arc::new(fixture("evaluation_fenced.txt"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let normalizer = normalizer.clone();
            let raw = raw.clone();
            std::thread::spawn(move || {
                normalizer
                    .evaluation(&raw, EvaluationType::Original)
                    .map(|out| out.value)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked").expect("normalize failed"))
        .collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
