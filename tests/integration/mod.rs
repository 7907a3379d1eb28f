//! End-to-end pipeline tests, run in-process against the `generate()` entry
//! point and small SQL fixtures under `tests/fixtures/` (spec §10 Testing:
//! no child-process CLI invocation is required since the binary is a thin
//! wrapper over this library).

use pg2rs::{generate, GenerateOptions};

fn default_options() -> GenerateOptions {
    GenerateOptions { permissive: false, omit_helpers: false }
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture must exist")
}

#[test]
fn setof_over_schema_qualified_table() {
    let source = fixture("companies_functions.sql");
    let outcome =
        generate(&source, "companies_functions.sql", None, None, &default_options()).unwrap();

    assert!(outcome.code.contains("pub struct Company {"));
    assert!(outcome.code.contains("pub id: i32,"));
    assert!(outcome.code.contains("pub name: String,"));
    assert!(outcome.code.contains("pub founded: Option<chrono::NaiveDate>,"));
    assert!(outcome.code.contains("pub async fn list_companies(conn: &impl Connection)"));
    assert!(outcome.code.contains("-> Result<Vec<Company>, GeneratedClientError>"));
}

#[test]
fn schema_defaults_activation_omits_untouched_optional_parameters() {
    let source = fixture("defaults_functions.sql");
    let outcome =
        generate(&source, "defaults_functions.sql", None, None, &default_options()).unwrap();

    assert!(outcome
        .code
        .contains("pub async fn upsert_widget(conn: &impl Connection, name: String, qty: Option<i32>, cat: Option<i32>)"));
    assert!(outcome.code.contains("if let Some(v) = &qty {"));
    assert!(outcome.code.contains("if let Some(v) = &cat {"));
    assert!(outcome.code.contains("\"p_name := %(name)s\".to_string()"));
}

#[test]
fn enum_parameter_round_trips_through_value_accessor() {
    let source = fixture("enum_functions.sql");
    let outcome = generate(&source, "enum_functions.sql", None, None, &default_options()).unwrap();

    assert!(outcome.code.contains("pub enum StatusType {"));
    assert!(outcome.code.contains("Pending,"));
    assert!(outcome.code.contains("Active,"));
    assert!(outcome.code.contains("Inactive,"));
    assert!(outcome.code.contains("StatusType::Pending => \"pending\""));
    assert!(outcome.code.contains("role: StatusType"));
    assert!(outcome.code.contains("role.value()"));
}

#[test]
fn nested_composite_wrapper_carries_both_decode_paths() {
    let source = fixture("nested_composite_functions.sql");
    let outcome =
        generate(&source, "nested_composite_functions.sql", None, None, &default_options())
            .unwrap();

    assert!(outcome.code.contains("pub struct Meter {"));
    assert!(outcome.code.contains("pub struct MeterUpsert {"));
    assert!(outcome.code.contains("pub meter: Meter,") || outcome.code.contains("pub meter: Option<Meter>,"));
    assert!(outcome.code.contains("fn split_composite_fields"));
    assert!(outcome.code.contains("pub async fn upsert_meter"));
    // Meter must be emitted before MeterUpsert (topological-order invariant).
    let meter_pos = outcome.code.find("pub struct Meter {").unwrap();
    let upsert_pos = outcome.code.find("pub struct MeterUpsert {").unwrap();
    assert!(meter_pos < upsert_pos);
}

#[test]
fn trivial_record_recovery_infers_enum_and_date_columns() {
    let source = fixture("trivial_record_functions.sql");
    let outcome =
        generate(&source, "trivial_record_functions.sql", None, None, &default_options())
            .unwrap();

    assert!(outcome.code.contains("pub enum Mood {"));
    assert!(outcome.code.contains("pub async fn now_info"));
    assert!(outcome.code.contains("AS (current_mood"));
    assert!(outcome.code.contains("created_at"));
}

#[test]
fn schema_file_wins_over_functions_file_on_conflicting_definition() {
    let functions_source = fixture("precedence_functions.sql");
    let schema_source = fixture("precedence_schema.sql");
    let outcome = generate(
        &functions_source,
        "precedence_functions.sql",
        Some(&schema_source),
        Some("precedence_schema.sql"),
        &default_options(),
    )
    .unwrap();

    assert!(outcome.code.contains("pub name: String,"));
    assert!(outcome.code.contains("pub founded: chrono::NaiveDate,"));
    assert!(outcome.warnings.iter().any(|w| w.contains("overrides record")));
}

#[test]
fn missing_schema_without_permissive_fails_naming_function_and_type() {
    let source = "CREATE FUNCTION get_x() RETURNS SETOF undefined_tab AS $$ SELECT 1 $$ LANGUAGE sql;";
    let err = generate(source, "functions.sql", None, None, &default_options()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("get_x"));
    assert!(message.contains("undefined_tab"));
}

#[test]
fn missing_schema_permissive_emits_placeholder_and_completes() {
    let source = "CREATE FUNCTION get_x() RETURNS SETOF undefined_tab AS $$ SELECT 1 $$ LANGUAGE sql;";
    let options = GenerateOptions { permissive: true, omit_helpers: false };
    let outcome = generate(source, "functions.sql", None, None, &options).unwrap();

    assert!(outcome.code.contains("TODO"));
    assert!(outcome.code.contains("undefined_tab"));
    assert!(outcome.code.contains("pub async fn get_x"));
}

#[test]
fn zero_parameter_void_function_has_empty_call_and_no_fetch() {
    let source = "CREATE FUNCTION noop() RETURNS void AS $$ BEGIN NULL; END; $$ LANGUAGE plpgsql;";
    let outcome = generate(source, "functions.sql", None, None, &default_options()).unwrap();

    assert!(outcome.code.contains("pub async fn noop(conn: &impl Connection) -> Result<(), GeneratedClientError>"));
    assert!(outcome.code.contains("SELECT * FROM noop({})"));
    assert!(outcome.code.contains("conn.execute(&query, &bound).await?;"));
    assert!(outcome.code.contains("Ok(())"));
}

#[test]
fn idempotent_reruns_produce_byte_identical_output() {
    let source = fixture("nested_composite_functions.sql");
    let first =
        generate(&source, "nested_composite_functions.sql", None, None, &default_options())
            .unwrap();
    let second =
        generate(&source, "nested_composite_functions.sql", None, None, &default_options())
            .unwrap();
    assert_eq!(first.code, second.code);
}

#[test]
fn out_parameter_is_rejected_as_a_survivable_function_parse_failure() {
    let source = "CREATE FUNCTION broken(p_x INT, OUT p_y INT) RETURNS INT AS $$ SELECT 1 $$ LANGUAGE sql;\nCREATE FUNCTION fine() RETURNS INT AS $$ SELECT 2 $$ LANGUAGE sql;";
    let outcome = generate(source, "functions.sql", None, None, &default_options()).unwrap();

    assert!(!outcome.code.contains("pub async fn broken"));
    assert!(outcome.code.contains("pub async fn fine"));
    assert!(outcome.warnings.iter().any(|w| w.contains("broken")));
}
