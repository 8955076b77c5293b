//! Tests for loading, merging and writing the override file.

use sql_dummy::config::OverrideConfig;
use sql_dummy::generator::{apply_defaults, resolve, BindingSpec};
use sql_dummy::schema::{read_schema, TableSpec};
use std::fs;
use tempfile::TempDir;

const SCHEMA: &str = r#"
CREATE TABLE orgs (
    id serial PRIMARY KEY,
    name varchar(80) NOT NULL
);

CREATE TABLE users (
    id serial PRIMARY KEY,
    org_id integer NOT NULL REFERENCES orgs(id),
    first_name text,
    last_name text,
    email text,
    age integer
);
"#;

const OVERRIDES: &str = r#"
tables:
  users:
    __numrows: 12
    __unique:
      - email
      - first_name, last_name
    email:
      generator: email
      unique: true
    age:
      generator: integer
      min: 18
      max: 90
    first_name:
      generator: first_name
      distinct: 4
"#;

fn tables() -> Vec<TableSpec> {
    let mut tables = read_schema(SCHEMA).unwrap();
    apply_defaults(&mut tables);
    tables
}

fn specs(tables: &mut [TableSpec]) -> Vec<Vec<(String, BindingSpec)>> {
    let resolution = resolve(tables).unwrap();
    resolution
        .plans
        .iter()
        .map(|plan| {
            plan.columns
                .iter()
                .map(|c| (c.name.clone(), c.binding.spec().clone()))
                .collect()
        })
        .collect()
}

#[test]
fn test_merge_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dummy.yml");
    fs::write(&path, OVERRIDES).unwrap();

    let mut once = tables();
    OverrideConfig::load(&path).unwrap().merge_into(&mut once);

    let mut twice = tables();
    OverrideConfig::load(&path).unwrap().merge_into(&mut twice);
    OverrideConfig::load(&path).unwrap().merge_into(&mut twice);

    assert_eq!(once, twice);
    assert_eq!(specs(&mut once), specs(&mut twice));
}

#[test]
fn test_merge_applies_overrides() {
    let mut tables = tables();
    OverrideConfig::from_yaml_str(OVERRIDES)
        .unwrap()
        .merge_into(&mut tables);

    let users = tables.iter().find(|t| t.name == "users").unwrap();
    assert_eq!(users.row_count, Some(12));
    assert!(users.unique_groups.contains(&vec!["email".to_string()]));
    assert!(users
        .unique_groups
        .contains(&vec!["first_name".to_string(), "last_name".to_string()]));

    let age = users.get_column("age").unwrap();
    assert_eq!(age.generator.as_deref(), Some("integer"));
    assert_eq!(age.options.get("min").and_then(|v| v.as_i64()), Some(18));

    let email = users.get_column("email").unwrap();
    assert_eq!(email.generator.as_deref(), Some("email"));
    // the string defaults were replaced along with the kind
    assert!(email.options.get("max").is_none());
}

#[test]
fn test_declared_foreign_key_resolves() {
    let mut tables = tables();
    let specs = specs(&mut tables);
    let users = &specs[1];
    let (_, org) = users.iter().find(|(name, _)| name == "org_id").unwrap();
    assert_eq!(org.foreign_key.as_deref(), Some("orgs.id"));
    assert!(tables[0].get_column("id").unwrap().is_foreign_key);
}

#[test]
fn test_unknown_table_is_ignored() {
    let mut tables = tables();
    let before = tables.clone();
    OverrideConfig::from_yaml_str("tables:\n  nope:\n    x:\n      generator: integer\n")
        .unwrap()
        .merge_into(&mut tables);
    assert_eq!(tables, before);
}

#[test]
fn test_generated_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.yml");

    let mut merged = tables();
    let overrides = OverrideConfig::from_yaml_str(OVERRIDES).unwrap();
    overrides.merge_into(&mut merged);

    let snapshot = OverrideConfig::from_tables(&merged, Some(&overrides));
    snapshot.store(Some(&path)).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("generator: sequence"));
    assert!(written.contains("key: orgs.id"));

    // applying the written file to a fresh schema gives the same result
    let mut reloaded = tables();
    OverrideConfig::load(&path).unwrap().merge_into(&mut reloaded);
    assert_eq!(reloaded, merged);
}

#[test]
fn test_broken_yaml_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yml");
    fs::write(&path, "tables: [unclosed").unwrap();
    assert!(OverrideConfig::load(&path).is_err());
}
