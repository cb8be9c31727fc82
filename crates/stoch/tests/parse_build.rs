//! End-to-end tests over the bundled Knuth–Yao die program.

use std::path::PathBuf;
use stoch::{
    build_model, build_model_from_prism_program, build_parametric_model_from_prism_program,
    parse_formulas, parse_program, Error, ModelKind, ModelType,
};

fn die_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/programs/die.pm")
}

#[test]
fn parse_prism_program() {
    let program = parse_program(die_path()).unwrap();
    assert_eq!(program.nr_modules(), 1);
    assert_eq!(program.model_type(), ModelType::Dtmc);
    assert!(!program.has_undefined_constants());
}

#[test]
fn parse_missing_file_is_an_error() {
    let err = parse_program("no/such/file.pm").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn parse_prism_formula() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [F \"one\"]", &program).unwrap();
    assert_eq!(formulas.len(), 1);
    assert_eq!(formulas[0].to_string(), "P=? [F \"one\"]");
}

#[test]
fn parse_formula_with_loose_whitespace_renders_canonically() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [ F \"one\" ]", &program).unwrap();
    assert_eq!(formulas[0].to_string(), "P=? [F \"one\"]");
}

#[test]
fn parse_formulas_preserve_order() {
    let program = parse_program(die_path()).unwrap();
    let formulas =
        parse_formulas("P=? [F \"one\"]; P<=0.5 [F \"two\"]\nP=? [F \"done\"]", &program).unwrap();
    let rendered: Vec<String> = formulas.iter().map(|f| f.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["P=? [F \"one\"]", "P<=0.5 [F \"two\"]", "P=? [F \"done\"]"]
    );
}

#[test]
fn unknown_label_in_formula_is_an_error() {
    let program = parse_program(die_path()).unwrap();
    assert!(parse_formulas("P=? [F \"seven\"]", &program).is_err());
}

#[test]
fn build_model_from_program_and_formula() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [F \"one\"]", &program).unwrap();
    let result = build_model_from_prism_program(&program, &formulas).unwrap();

    assert_eq!(result.model.nr_states(), 13);
    assert_eq!(result.model.nr_transitions(), 20);
    assert_eq!(result.model.model_type(), ModelKind::Dtmc);
    assert!(!result.model.parametric());
    assert!(result.labels.contains(&"one".to_string()));
    // The builtins ride along regardless of the formulas.
    assert!(result.labels.contains(&"init".to_string()));
    assert!(result.labels.contains(&"deadlock".to_string()));
    // Labels the formulas do not reference are filtered out.
    assert!(!result.labels.contains(&"two".to_string()));
}

#[test]
fn build_model_without_formulas_keeps_all_labels() {
    let program = parse_program(die_path()).unwrap();
    let result = build_model_from_prism_program(&program, &[]).unwrap();
    assert_eq!(result.model.nr_states(), 13);
    for label in ["one", "two", "three", "four", "five", "six", "done"] {
        assert!(result.labels.contains(&label.to_string()), "missing {label}");
    }
}

#[test]
fn build_model_single_formula_uses_parametric_engine() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [ F \"one\" ]", &program).unwrap();
    let model = build_model(&program, &formulas[0]).unwrap();

    assert_eq!(model.nr_states(), 13);
    assert_eq!(model.nr_transitions(), 20);
    assert_eq!(model.model_type(), ModelKind::Dtmc);
    // The engine choice, not the program, decides the flag: die.pm has no
    // undefined constants, yet the model is parametric.
    assert!(model.parametric());
}

#[test]
fn build_parametric_model_from_program() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [F \"one\"]", &program).unwrap();
    let result = build_parametric_model_from_prism_program(&program, &formulas).unwrap();
    assert_eq!(result.model.nr_states(), 13);
    assert_eq!(result.model.nr_transitions(), 20);
    assert!(result.model.parametric());
}

#[test]
fn rebuilding_yields_identical_counts() {
    let program = parse_program(die_path()).unwrap();
    let formulas = parse_formulas("P=? [F \"one\"]", &program).unwrap();
    let first = build_model_from_prism_program(&program, &formulas).unwrap();
    let second = build_model_from_prism_program(&program, &formulas).unwrap();
    assert_eq!(first.model.nr_states(), second.model.nr_states());
    assert_eq!(first.model.nr_transitions(), second.model.nr_transitions());
}

#[test]
fn reparsing_the_same_file_is_stable() {
    let a = parse_program(die_path()).unwrap();
    let b = parse_program(die_path()).unwrap();
    assert_eq!(
        stoch_syntax::pretty_print(&a),
        stoch_syntax::pretty_print(&b)
    );
    assert_eq!(a.nr_modules(), b.nr_modules());
}

#[test]
fn die_model_has_coin_flip_rewards() {
    let program = parse_program(die_path()).unwrap();
    let result = build_model_from_prism_program(&program, &[]).unwrap();
    let stoch::Model::Numeric(model) = &result.model else {
        panic!("expected a concrete model");
    };
    let rewards = model.reward_model("coin_flips").unwrap();
    let per_row = rewards.state_action_rewards().unwrap();
    assert_eq!(per_row.len(), 13);
    // Seven internal states flip a coin, six final states do not.
    assert_eq!(per_row.iter().filter(|&&r| r == 1.0).count(), 7);
    assert_eq!(per_row.iter().filter(|&&r| r == 0.0).count(), 6);
}
