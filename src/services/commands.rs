//! Constructors for the commands the engine sends to the mesh CLI.
//!
//! The exact CLI surface belongs to the external executable; these helpers
//! keep every argument vector in one place.

use serde_json::{json, Value};

use crate::domain::errors::CommandError;
use crate::domain::models::{Command, KindSpec};

/// Name of the disposable zone written by the control bootstrap probe.
pub fn probe_zone_key(mesh: &str) -> String {
    format!("{mesh}-bootstrap")
}

/// Control API probe: write a disposable marker zone.
pub fn control_probe(mesh: &str) -> Command {
    let zone = probe_zone_key(mesh);
    let payload = json!({ "zone_key": zone, "name": zone });
    Command::new(["apply", "zone"]).with_stdin(payload.to_string())
}

/// Catalog API probe: read the tenant's session status.
pub fn catalog_probe(mesh: &str) -> Command {
    Command::new(["get", "catalogmesh", "--mesh-id", mesh])
}

/// Apply `payload` as an object of `kind`. Retried until it succeeds.
pub fn apply_object(kind: &KindSpec, payload: Vec<u8>) -> Command {
    Command::new(["apply", kind.name.as_str()])
        .with_stdin(payload)
        .with_requeue(true)
}

/// Delete the object `key` of `kind`. Never retried.
pub fn delete_object(kind: &KindSpec, key: &str, mesh: &str) -> Command {
    let mut arguments = vec!["delete".to_string(), kind.name.clone(), key.to_string()];
    if kind.scoped_delete {
        arguments.extend(["--mesh-id".to_string(), mesh.to_string()]);
    }
    Command::new(arguments)
}

/// Read-modify-write: add `subject` to a listener's trusted subject names.
///
/// Fetches the current listener, merges the subject into
/// `secret.subject_names` and applies the merged object.
pub fn merge_listener_trust(listener_key: &str, subject: &str) -> Command {
    let subject = subject.to_string();
    Command::new(["get", "listener", listener_key])
        .modify(move |raw| add_subject_name(raw, &subject))
        .then(Command::new(["apply", "listener"]))
        .with_requeue(true)
}

fn add_subject_name(raw: &[u8], subject: &str) -> Result<Vec<u8>, CommandError> {
    let mut listener: Value = serde_json::from_slice(raw)?;
    let object = listener
        .as_object_mut()
        .ok_or_else(|| CommandError::Modify("listener is not a JSON object".to_string()))?;

    let secret = object
        .entry("secret")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| CommandError::Modify("listener secret is not an object".to_string()))?;

    let names = secret
        .entry("subject_names")
        .or_insert_with(|| json!([]))
        .as_array_mut()
        .ok_or_else(|| CommandError::Modify("subject_names is not an array".to_string()))?;

    if !names.iter().any(|n| n.as_str() == Some(subject)) {
        names.push(Value::String(subject.to_string()));
    }

    Ok(serde_json::to_vec(&listener)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_scoped_kind_carries_mesh() {
        let catalog = KindSpec::catalog("catalogservice", "service_id");
        let command = delete_object(&catalog, "edge", "m1");
        assert_eq!(
            command.arguments,
            vec!["delete", "catalogservice", "edge", "--mesh-id", "m1"]
        );
        assert!(!command.requeue);

        let domain = KindSpec::control("domain", "domain_key");
        assert_eq!(
            delete_object(&domain, "m1.edge", "m1").arguments,
            vec!["delete", "domain", "m1.edge"]
        );
    }

    #[test]
    fn test_apply_is_requeued() {
        let domain = KindSpec::control("domain", "domain_key");
        let command = apply_object(&domain, b"{}".to_vec());
        assert!(command.requeue);
        assert_eq!(command.stdin.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_add_subject_name_merges_once() {
        let raw = br#"{"listener_key":"m1.edge","secret":{"subject_names":["spiffe://a"]}}"#;
        let merged = add_subject_name(raw, "spiffe://b").unwrap();
        let again = add_subject_name(&merged, "spiffe://b").unwrap();

        let value: Value = serde_json::from_slice(&again).unwrap();
        assert_eq!(
            value["secret"]["subject_names"],
            json!(["spiffe://a", "spiffe://b"])
        );
        assert_eq!(value["listener_key"], "m1.edge");
    }

    #[test]
    fn test_add_subject_name_creates_secret() {
        let merged = add_subject_name(br#"{"listener_key":"m1.edge"}"#, "spiffe://a").unwrap();
        let value: Value = serde_json::from_slice(&merged).unwrap();
        assert_eq!(value["secret"]["subject_names"], json!(["spiffe://a"]));
    }

    #[test]
    fn test_add_subject_name_rejects_non_object() {
        assert!(matches!(
            add_subject_name(b"[1,2]", "spiffe://a"),
            Err(CommandError::Modify(_))
        ));
        assert!(matches!(
            add_subject_name(b"not json", "spiffe://a"),
            Err(CommandError::Modify(_))
        ));
    }

    #[test]
    fn test_probes() {
        assert_eq!(control_probe("m1").arguments, vec!["apply", "zone"]);
        assert_eq!(
            catalog_probe("m1").arguments,
            vec!["get", "catalogmesh", "--mesh-id", "m1"]
        );
    }
}
