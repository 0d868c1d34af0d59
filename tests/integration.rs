//! Integration tests for the vault.

use serde_json::json;
use tempfile::TempDir;
use wireflow_vault::{
    Document, DocumentId, Tag, Team, Vault, VaultConfig,
};

fn test_vault(dir: &TempDir) -> Vault {
    Vault::open(VaultConfig {
        path: dir.path().join("data"),
        compress_versions: false,
    })
    .unwrap()
}

fn workflow(id: &str, name: &str, node_count: usize) -> Document {
    let mut doc = Document::new(DocumentId::new(id).unwrap(), name);
    doc.nodes = (0..node_count)
        .map(|i| json!({"id": format!("n{}", i), "type": "task"}))
        .collect();
    doc.edges = (1..node_count)
        .map(|i| json!({"source": format!("n{}", i - 1), "target": format!("n{}", i)}))
        .collect();
    doc
}

// --- Versioning ---

#[test]
fn test_overwrites_accumulate_versions_newest_first() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);
    let id = DocumentId::new("wf-1").unwrap();

    // N puts leave N-1 version entries.
    for i in 0..5 {
        vault
            .put_document(&workflow("wf-1", &format!("rev {}", i), i))
            .unwrap();
    }

    let versions = vault.list_versions(Some(&id)).unwrap();
    assert_eq!(versions.len(), 4);
    assert_eq!(versions[0].name, "rev 3");
    assert_eq!(versions[3].name, "rev 0");
    let ordinals: Vec<usize> = versions.iter().map(|v| v.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3, 4]);
}

#[test]
fn test_version_roundtrip_preserves_content() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);
    let id = DocumentId::new("wf-1").unwrap();

    let original = workflow("wf-1", "before", 3);
    vault.put_document(&original).unwrap();
    vault.put_document(&workflow("wf-1", "after", 0)).unwrap();

    let versions = vault.list_versions(Some(&id)).unwrap();
    let captured = vault.get_version(&versions[0].file).unwrap();
    assert_eq!(captured.name, "before");
    assert_eq!(captured.nodes, original.nodes);
    assert_eq!(captured.edges, original.edges);
}

#[test]
fn test_compressed_vault_roundtrips_versions() {
    let dir = TempDir::new().unwrap();
    let vault = Vault::open(VaultConfig {
        path: dir.path().join("data"),
        compress_versions: true,
    })
    .unwrap();
    let id = DocumentId::new("wf-1").unwrap();

    vault.put_document(&workflow("wf-1", "before", 2)).unwrap();
    vault.put_document(&workflow("wf-1", "after", 0)).unwrap();

    let versions = vault.list_versions(Some(&id)).unwrap();
    assert_eq!(versions.len(), 1);
    assert!(versions[0].file.ends_with(".json.gz"));
    assert_eq!(vault.get_version(&versions[0].file).unwrap().name, "before");
}

#[test]
fn test_global_version_listing_resolves_names() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);

    for id in ["wf-1", "wf-2"] {
        vault.put_document(&workflow(id, &format!("{} v1", id), 0)).unwrap();
        vault.put_document(&workflow(id, &format!("{} v2", id), 0)).unwrap();
    }

    let all = vault.list_versions(None).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|v| v.name == "wf-1 v1"));
    assert!(all.iter().any(|v| v.name == "wf-2 v1"));
    assert!(all.iter().all(|v| !v.captured_at.is_empty()));
}

// --- Archives ---

#[test]
fn test_backup_inspect_counts_documents_and_nodes() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);

    vault.put_document(&workflow("wf-1", "a", 2)).unwrap();
    vault.put_document(&workflow("wf-2", "b", 0)).unwrap();
    vault.put_document(&workflow("wf-3", "c", 5)).unwrap();
    vault
        .write_teams(&[Team {
            id: "team-1".into(),
            name: "core".into(),
            extra: Default::default(),
        }])
        .unwrap();
    vault
        .write_tags(&[
            Tag {
                id: "tag-1".into(),
                name: "urgent".into(),
                color: None,
                extra: Default::default(),
            },
            Tag {
                id: "tag-2".into(),
                name: "draft".into(),
                color: None,
                extra: Default::default(),
            },
        ])
        .unwrap();

    let archive = vault.create_backup().unwrap();
    let summary = vault.inspect_backup(&archive.file_name()).unwrap();

    assert_eq!(summary.document_count, 3);
    assert_eq!(summary.total_node_count, 7);
    assert_eq!(summary.team_count, 1);
    assert_eq!(summary.tag_count, 2);
    assert_eq!(summary.owner_count, 0);
}

#[test]
fn test_backup_reflects_state_at_build_time() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);

    vault.put_document(&workflow("wf-1", "a", 2)).unwrap();
    let archive = vault.create_backup().unwrap();

    // Later writes do not leak into the existing archive.
    vault.put_document(&workflow("wf-2", "b", 9)).unwrap();

    let summary = vault.inspect_backup(&archive.file_name()).unwrap();
    assert_eq!(summary.document_count, 1);
    assert_eq!(summary.total_node_count, 2);
}

#[test]
fn test_backups_list_newest_first() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);

    vault.put_document(&workflow("wf-1", "a", 0)).unwrap();
    let first = vault.create_backup().unwrap();
    let second = vault.create_backup().unwrap();
    let third = vault.create_backup().unwrap();

    let listed: Vec<String> = vault
        .list_backups()
        .unwrap()
        .into_iter()
        .map(|d| d.name.file_name())
        .collect();
    assert_eq!(
        listed,
        vec![third.file_name(), second.file_name(), first.file_name()]
    );
}

// --- Restore ---

#[test]
fn test_restore_end_to_end() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);

    // Live tree B, archived.
    vault.put_document(&workflow("wf-1", "b-state", 2)).unwrap();
    vault.put_document(&workflow("wf-2", "b-extra", 1)).unwrap();
    let archive_b = vault.create_backup().unwrap();

    // Mutate to live tree A.
    vault.delete_document(&DocumentId::new("wf-2").unwrap()).unwrap();
    vault.put_document(&workflow("wf-1", "a-state", 4)).unwrap();
    vault.put_document(&workflow("wf-3", "a-only", 1)).unwrap();

    let report = vault.restore_backup(&archive_b.file_name()).unwrap();

    // Live tree mirrors B.
    let ids = vault.list_documents().unwrap();
    assert_eq!(
        ids,
        vec![
            DocumentId::new("wf-1").unwrap(),
            DocumentId::new("wf-2").unwrap()
        ]
    );
    assert_eq!(
        vault
            .get_document(&DocumentId::new("wf-1").unwrap())
            .unwrap()
            .name,
        "b-state"
    );

    // The safety archive captures A and is retrievable by reported name.
    let safety = vault
        .inspect_backup(&report.safety_archive.file_name())
        .unwrap();
    assert_eq!(safety.document_count, 2);
    assert_eq!(safety.total_node_count, 5);

    // Both archives remain catalogued.
    let listed: Vec<String> = vault
        .list_backups()
        .unwrap()
        .into_iter()
        .map(|d| d.name.file_name())
        .collect();
    assert!(listed.contains(&archive_b.file_name()));
    assert!(listed.contains(&report.safety_archive.file_name()));
}

#[test]
fn test_restore_preserves_version_history() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);
    let id = DocumentId::new("wf-1").unwrap();

    vault.put_document(&workflow("wf-1", "v1", 0)).unwrap();
    vault.put_document(&workflow("wf-1", "v2", 0)).unwrap();
    let archive = vault.create_backup().unwrap();

    vault.restore_backup(&archive.file_name()).unwrap();

    // The ledger lives in the backups domain and survives the wipe.
    assert_eq!(vault.list_versions(Some(&id)).unwrap().len(), 1);
    assert_eq!(vault.get_document(&id).unwrap().name, "v2");
}

// --- Write/Version/Restore interplay ---

#[test]
fn test_version_restore_then_overwrite_versions_again() {
    let dir = TempDir::new().unwrap();
    let vault = test_vault(&dir);
    let id = DocumentId::new("wf-1").unwrap();

    vault.put_document(&workflow("wf-1", "v1", 1)).unwrap();
    vault.put_document(&workflow("wf-1", "v2", 2)).unwrap();

    let versions = vault.list_versions(Some(&id)).unwrap();
    vault.restore_version(&versions[0].file).unwrap();
    assert_eq!(vault.get_document(&id).unwrap().name, "v1");

    // The next put versions the restored state as usual.
    vault.put_document(&workflow("wf-1", "v3", 3)).unwrap();
    let versions = vault.list_versions(Some(&id)).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].name, "v1");
}
