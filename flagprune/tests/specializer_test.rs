//! End-to-end tests for the per-module specializer: gating, branch
//! selection, alias tracking, and declaration pruning through the
//! public library API.
#![allow(clippy::unwrap_used)]

use flagprune::flag::{FlagSpec, Polarity, ResolverMethod};
use flagprune::gate::{ModuleGate, IGNORE_CHECK_NONE, IGNORE_CHECK_TEST_PREFIX};
use flagprune::specializer::{SkipReason, SpecializeError, SpecializeOutcome, Specializer};

fn specializer_for(spec: FlagSpec) -> Specializer {
    let gate = ModuleGate::with_named_check(&spec, IGNORE_CHECK_TEST_PREFIX).unwrap();
    Specializer::new(spec, gate)
}

fn bare(flag: &str) -> Specializer {
    specializer_for(FlagSpec::bare(flag).unwrap())
}

fn rewrite(specializer: &Specializer, source: &str) -> String {
    match specializer
        .specialize_module(Some("app.main"), source)
        .unwrap()
    {
        SpecializeOutcome::Rewritten { output, .. } => output,
        other => panic!("expected a rewrite, got {other:?}"),
    }
}

#[test]
fn test_bare_treatment_keeps_the_then_arm() {
    let source = "if FLAG:\n    enabled()\nelse:\n    disabled()\n";
    assert_eq!(rewrite(&bare("FLAG"), source), "enabled()\n");
}

#[test]
fn test_bare_control_keeps_the_else_arm() {
    let spec = FlagSpec::bare("FLAG").unwrap().with_polarity(Polarity::Control);
    let source = "if FLAG:\n    enabled()\nelse:\n    disabled()\n";
    assert_eq!(rewrite(&specializer_for(spec), source), "disabled()\n");
}

#[test]
fn test_negation_flips_the_selected_arm() {
    let source = "if not FLAG:\n    disabled()\nelse:\n    enabled()\n";
    assert_eq!(rewrite(&bare("FLAG"), source), "enabled()\n");
}

#[test]
fn test_double_negation_is_not_specialized() {
    // Only a single negation reads as a flag test; `not not FLAG` is a
    // compound expression and the conditional stays as written.
    let source = "if not not FLAG:\n    a()\nelse:\n    b()\n";
    let outcome = bare("FLAG")
        .specialize_module(Some("app.main"), source)
        .unwrap();
    assert_eq!(outcome, SpecializeOutcome::Unchanged);
}

#[test]
fn test_resolver_call_selects_a_branch() {
    let spec = FlagSpec::with_resolver("FLAG", "is_enabled").unwrap();
    let source = "if is_enabled(FLAG):\n    a()\nelse:\n    b()\n";
    assert_eq!(rewrite(&specializer_for(spec), source), "a()\n");
}

#[test]
fn test_control_polarity_resolver_reads_as_false() {
    let spec = FlagSpec::via_resolvers(
        "FLAG",
        vec![ResolverMethod::new("is_disabled", Polarity::Control).unwrap()],
    )
    .unwrap();
    let source = "if is_disabled(FLAG):\n    off()\nelse:\n    on()\n";
    assert_eq!(rewrite(&specializer_for(spec), source), "on()\n");
}

#[test]
fn test_mixed_resolver_polarities_in_one_module() {
    let spec = FlagSpec::via_resolvers(
        "FLAG",
        vec![
            ResolverMethod::new("is_enabled", Polarity::Treatment).unwrap(),
            ResolverMethod::new("is_disabled", Polarity::Control).unwrap(),
        ],
    )
    .unwrap();
    let source = concat!(
        "if is_enabled(FLAG):\n",
        "    a()\n",
        "if is_disabled(FLAG):\n",
        "    b()\n",
        "else:\n",
        "    c()\n",
    );
    assert_eq!(rewrite(&specializer_for(spec), source), "a()\nc()\n");
}

#[test]
fn test_dotted_resolver_matches_on_the_method_name() {
    let spec = FlagSpec::with_resolver("FLAG", "is_enabled").unwrap();
    let source = "if client.is_enabled(FLAG):\n    a()\nelse:\n    b()\n";
    assert_eq!(rewrite(&specializer_for(spec), source), "a()\n");
}

#[test]
fn test_copies_of_the_flag_value_are_not_followed() {
    // Copying the flag into another name is a value use; only direct
    // tests of the flag itself are specialized.
    let source = concat!(
        "USE_THING = FLAG\n",
        "if USE_THING:\n",
        "    a()\n",
        "else:\n",
        "    b()\n",
    );
    let outcome = bare("FLAG")
        .specialize_module(Some("app.main"), source)
        .unwrap();
    assert_eq!(outcome, SpecializeOutcome::Unchanged);
}

#[test]
fn test_import_alias_feeds_later_tests() {
    let spec = FlagSpec::with_resolver("FLAG", "is_enabled").unwrap();
    let source = concat!(
        "from app.flags import FLAG as F\n",
        "if is_enabled(F):\n",
        "    a()\n",
        "else:\n",
        "    b()\n",
    );
    assert_eq!(rewrite(&specializer_for(spec), source), "a()\n");
}

#[test]
fn test_from_import_entry_is_sliced_out() {
    let source = "from app.flags import OTHER, FLAG, LAST\nif FLAG:\n    a()\n";
    assert_eq!(
        rewrite(&bare("FLAG"), source),
        "from app.flags import OTHER, LAST\na()\n"
    );
}

#[test]
fn test_aliased_module_import_is_removed() {
    let source = "import app.flags.FLAG as flag_mod\nif FLAG:\n    a()\n";
    assert_eq!(rewrite(&bare("FLAG"), source), "a()\n");
}

#[test]
fn test_plain_module_import_is_left_alone() {
    // `import FLAG` binds a module object, not the flag constant.
    let source = "import FLAG\nif FLAG:\n    a()\n";
    assert_eq!(rewrite(&bare("FLAG"), source), "import FLAG\na()\n");
}

#[test]
fn test_annotated_declaration_is_pruned() {
    let source = "FLAG: bool = True\nif FLAG:\n    a()\n";
    assert_eq!(rewrite(&bare("FLAG"), source), "a()\n");
}

#[test]
fn test_skips_test_modules_by_identity() {
    let outcome = bare("FLAG")
        .specialize_module(Some("pkg.test_api"), "if FLAG:\n    a()\n")
        .unwrap();
    assert_eq!(outcome, SpecializeOutcome::Skipped(SkipReason::IgnoredModule));
}

#[test]
fn test_none_check_visits_test_modules() {
    let spec = FlagSpec::bare("FLAG").unwrap();
    let gate = ModuleGate::with_named_check(&spec, IGNORE_CHECK_NONE).unwrap();
    let specializer = Specializer::new(spec, gate);
    let outcome = specializer
        .specialize_module(Some("pkg.test_api"), "if FLAG:\n    a()\n")
        .unwrap();
    assert!(matches!(outcome, SpecializeOutcome::Rewritten { .. }));
}

#[test]
fn test_skips_sources_without_the_flag_text() {
    let outcome = bare("FLAG")
        .specialize_module(Some("app.main"), "print('nothing to see')\n")
        .unwrap();
    assert_eq!(outcome, SpecializeOutcome::Skipped(SkipReason::NoFlagMention));
}

#[test]
fn test_unchanged_when_the_flag_is_only_read() {
    // Mentioned, so the gate lets it through, but no conditional,
    // declaration, or import observes it.
    let outcome = bare("FLAG")
        .specialize_module(Some("app.main"), "print(FLAG)\n")
        .unwrap();
    assert_eq!(outcome, SpecializeOutcome::Unchanged);
}

#[test]
fn test_parse_errors_are_reported() {
    let result = bare("FLAG").specialize_module(Some("app.main"), "if FLAG:\n");
    assert!(matches!(result, Err(SpecializeError::Parse { .. })));
}

#[test]
fn test_nested_conditionals_converge_over_passes() {
    let source = concat!(
        "if FLAG:\n",
        "    if FLAG:\n",
        "        a()\n",
        "    else:\n",
        "        b()\n",
        "else:\n",
        "    c()\n",
    );
    let outcome = bare("FLAG")
        .specialize_module(Some("app.main"), source)
        .unwrap();
    let SpecializeOutcome::Rewritten { output, passes } = outcome else {
        panic!("expected a rewrite");
    };
    assert_eq!(output, "a()\n");
    assert_eq!(passes, 2);
}
