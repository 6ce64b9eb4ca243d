//! Scaffold load/save with schema, invariant and replay validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::invariants::validate_invariants;
use crate::core::replay::replay;
use crate::core::table::ResourceTable;
use crate::scaffold::Scaffold;

/// Scaffold file schema, draft 2020-12.
pub const SCAFFOLD_SCHEMA: &str = include_str!("../../schemas/scaffold.v1.schema.json");

/// Load a scaffold and confirm it replays cleanly.
///
/// Order: JSON schema, then deserialization, then resource-name invariants,
/// then a full replay. Any failure is an error; a scaffold that does not
/// replay cannot seed the mutation engine.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_scaffold(path: &Path) -> Result<Scaffold> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read scaffold {}", path.display()))?;
    let (scaffold, table) =
        parse_scaffold(&contents).with_context(|| format!("load scaffold {}", path.display()))?;
    debug!(verbs = scaffold.verbs.len(), resources = table.snapshot().len(), "loaded");
    Ok(scaffold)
}

/// Validate scaffold JSON text and return it together with its final table.
pub fn parse_scaffold(contents: &str) -> Result<(Scaffold, ResourceTable)> {
    let value: Value = serde_json::from_str(contents).context("parse scaffold json")?;
    validate_schema(&value)?;
    let scaffold: Scaffold = serde_json::from_value(value).context("deserialize scaffold")?;
    let errors = validate_invariants(&scaffold.verbs);
    if !errors.is_empty() {
        return Err(anyhow!("scaffold invariants failed: {}", errors.join("; ")));
    }
    let table = replay(&scaffold.verbs).context("scaffold does not replay")?;
    Ok((scaffold, table))
}

/// Write a scaffold as pretty JSON with a trailing newline.
pub fn write_scaffold(path: &Path, scaffold: &Scaffold) -> Result<()> {
    let buf = render_scaffold(scaffold)?;
    super::write_atomic(path, &buf)
}

pub fn render_scaffold(scaffold: &Scaffold) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(scaffold).context("serialize scaffold")?;
    buf.push('\n');
    Ok(buf)
}

fn validate_schema(scaffold: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(SCAFFOLD_SCHEMA).context("parse embedded scaffold schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile scaffold schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(scaffold)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "scaffold schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::builtin;
    use crate::verbs::VerbKind;

    #[test]
    fn write_then_load_keeps_every_builtin() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["endpoint_lifecycle", "rc_send_recv", "cm_listener"] {
            let scaffold = builtin(name).expect("builtin");
            let path = temp.path().join(format!("{name}.json"));
            write_scaffold(&path, &scaffold).expect("write");
            let loaded = load_scaffold(&path).expect("load");
            assert_eq!(loaded, scaffold, "{name}");
        }
    }

    #[test]
    fn schema_rejects_unknown_verbs_and_versions() {
        let err = parse_scaffold(r#"{"version":1,"verbs":[{"verb":"post_write"}]}"#)
            .expect_err("unknown verb");
        assert!(err.to_string().contains("schema validation failed"));

        let err = parse_scaffold(r#"{"version":2,"verbs":[]}"#).expect_err("bad version");
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn bad_resource_names_are_reported_before_replay() {
        let err = parse_scaffold(r#"{"version":1,"verbs":[{"verb":"alloc_pd","pd":"pd 0"}]}"#)
            .expect_err("bad name");
        assert!(err.to_string().contains("invariants failed"));
    }

    #[test]
    fn scaffold_that_does_not_replay_is_rejected() {
        let err = parse_scaffold(r#"{"version":1,"verbs":[{"verb":"destroy_qp","qp":"qp0"}]}"#)
            .expect_err("dangling destroy");
        let chain = format!("{err:#}");
        assert!(chain.contains("does not replay"), "{chain}");
        assert!(chain.contains("requirement not satisfied for qp:qp0"), "{chain}");
    }

    #[test]
    fn schema_lists_every_catalog_verb() {
        let schema: Value = serde_json::from_str(SCAFFOLD_SCHEMA).expect("schema json");
        let tags: Vec<&str> = schema["$defs"]["verb"]["properties"]["verb"]["enum"]
            .as_array()
            .expect("enum")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        let expected: Vec<&str> = VerbKind::ALL.iter().map(|kind| kind.tag()).collect();
        assert_eq!(tags, expected);
    }
}
