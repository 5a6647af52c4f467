#[test]
fn tally_error_expands_for_well_formed_enum() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/tally_error_pass.rs");
}
