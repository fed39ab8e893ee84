//! Integration tests for the backup, restore and update workflows through
//! the public API.

use ollama_tools::{actions, archive, ModelIdentifier, ModelStore, ToolError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write a manifest for `model` plus blobs for the given digests.
fn install_model(root: &Path, model: &str, digests: &[&str]) {
    let store = ModelStore::new(root);
    let id = ModelIdentifier::parse(model).expect("valid identifier");
    let manifest_path = store.manifest_path(&id);
    fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();

    let layers: Vec<String> = digests
        .iter()
        .map(|d| format!(r#"{{"mediaType":"application/vnd.ollama.image.model","digest":"{d}","size":1}}"#))
        .collect();
    let manifest = format!(r#"{{"schemaVersion":2,"layers":[{}]}}"#, layers.join(","));
    fs::write(&manifest_path, manifest).unwrap();

    fs::create_dir_all(store.blobs_dir()).unwrap();
    for digest in digests {
        fs::write(store.blob_path(digest), format!("content of {digest}")).unwrap();
    }
}

fn ids(names: &[&str]) -> Vec<ModelIdentifier> {
    names
        .iter()
        .map(|n| ModelIdentifier::parse(*n).unwrap())
        .collect()
}

#[test]
fn test_backup_then_restore_into_fresh_store() {
    let temp_dir = TempDir::new().unwrap();
    let source_root = temp_dir.path().join("source");
    install_model(&source_root, "llama3:8b", &["sha256:aaa", "sha256:shared"]);
    install_model(&source_root, "phi3", &["sha256:ccc", "sha256:shared"]);

    let backup_dir = temp_dir.path().join("backups");
    let source = ModelStore::new(&source_root);
    let report = actions::backup_models(&source, &backup_dir, ids(&["llama3:8b", "phi3"]), 2)
        .expect("backup dir is creatable");
    assert!(report.is_success(), "failures: {:?}", report.failed);

    let archives = archive::find_archives(&backup_dir).unwrap();
    assert_eq!(
        archives,
        vec![backup_dir.join("llama3-8b.zip"), backup_dir.join("phi3-latest.zip")]
    );

    let target_root = temp_dir.path().join("target");
    let report = actions::restore_archives(&target_root, archives, 2);
    assert!(report.is_success(), "failures: {:?}", report.failed);

    let target = ModelStore::new(&target_root);
    for model in ids(&["llama3:8b", "phi3"]) {
        let restored = target.resolve(&model).expect("restored model resolves");
        let original = source.resolve(&model).unwrap();
        for (restored_file, original_file) in restored.files().zip(original.files()) {
            assert_eq!(
                fs::read(restored_file).unwrap(),
                fs::read(original_file).unwrap()
            );
        }
    }
}

#[test]
fn test_one_broken_model_does_not_stop_the_rest() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("models");
    install_model(&root, "good", &["sha256:g1"]);
    install_model(&root, "broken", &["sha256:b1"]);
    fs::remove_file(ModelStore::new(&root).blob_path("sha256:b1")).unwrap();

    let backup_dir = temp_dir.path().join("backups");
    let report = actions::backup_models(
        &ModelStore::new(&root),
        &backup_dir,
        ids(&["broken", "good", "absent"]),
        3,
    )
    .unwrap();

    assert_eq!(report.succeeded, ids(&["good"]));
    let mut failed: Vec<&str> = report.failed.iter().map(|f| f.item.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["absent", "broken"]);
    assert!(backup_dir.join("good-latest.zip").is_file());
}

#[test]
fn test_missing_restore_path_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = archive::find_archives(&temp_dir.path().join("nope"));
    assert!(matches!(result, Err(ToolError::Io { .. })));
}

#[cfg(unix)]
#[test]
fn test_update_through_a_scripted_binary() {
    use ollama_tools::{OllamaCli, ProcessRunner};
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("ollama");
    fs::write(
        &script,
        r#"#!/bin/sh
case "$1" in
  --version) echo "ollama version is 0.5.7" ;;
  list) printf 'NAME ID SIZE MODIFIED\nllama3:8b abc 4.7GB now\nphi3:latest def 2.2GB now\n' ;;
  pull) if [ "$2" = "phi3:latest" ]; then echo "pull failed" >&2; exit 1; fi ;;
esac
"#,
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let ollama = OllamaCli::new(ProcessRunner::new(&script));
    assert!(ollama.is_available());
    assert_eq!(ollama.version().unwrap(), "0.5.7");

    let models = actions::installed_models(&ollama).unwrap();
    assert_eq!(models, ids(&["llama3:8b", "phi3:latest"]));

    let report = actions::update_models(&ollama, models, 2);
    assert_eq!(report.succeeded, ids(&["llama3:8b"]));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item.as_str(), "phi3:latest");
    assert!(report.failed[0].reason.contains("pull failed"));
}
