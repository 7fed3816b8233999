use plexus_store::EngineError;

use crate::common::seeded_engine;

#[test]
fn query_rejects_write_statements() {
    let engine = seeded_engine();
    let err = engine.query("DELETE FROM t_object");
    assert!(matches!(err, Err(EngineError::UsageError(_))));
}

#[test]
fn version_reports_the_packaged_schema_version() {
    let engine = plexus_store::Engine::new_in_memory().unwrap();
    engine.create_schema(None).unwrap();
    assert_eq!(engine.version(), Some(vec![1, 0]));
}

#[test]
fn optimize_is_safe_to_call_on_a_fresh_database() {
    let engine = seeded_engine();
    engine.optimize().unwrap();
}

#[test]
fn backup_produces_a_loadable_copy() {
    let engine = seeded_engine();
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("backup.db");
    engine.backup(&backup_path).unwrap();
    assert!(backup_path.exists());

    let restored = plexus_store::Engine::open(&backup_path).unwrap();
    assert!(restored
        .query("SELECT name FROM t_class WHERE name = 'System'")
        .unwrap()
        .len()
        == 1);
}
