mod common;

use materialize::types::{AuthConfig, DesiredState, FileEntry};
use materialize::ApiError;

use common::Harness;

fn write(h: &Harness, key: &str, bytes: &[u8]) {
    let p = h.at(key);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, bytes).unwrap();
}

#[test]
fn identity_failure_restores_original_bytes() {
    let mut h = Harness::new();
    h.identity.refuse_owner = Some("ghost".into());
    write(&h, "/etc/app.conf", b"original");
    let state = DesiredState::new().with(
        "/etc/app.conf",
        FileEntry::text("replacement").with_owner(Some("ghost"), None),
    );

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    assert!(matches!(err, ApiError::Identity(_)), "{err}");
    assert_eq!(std::fs::read(h.at("/etc/app.conf")).unwrap(), b"original");
    assert!(!h.at("/etc/app.conf.bak").exists());
    assert!(!h.at("/etc/app.conf.bak2").exists());

    let rb = h.facts.of("rollback");
    assert_eq!(rb.len(), 1);
    assert_eq!(rb[0].0, "success");
    let res = h.facts.of("file.result");
    assert_eq!(res[0].0, "failure");
    assert_eq!(res[0].1["error_id"], "E_IDENTITY");
}

#[test]
fn failure_on_new_path_leaves_nothing_behind() {
    let mut h = Harness::new();
    h.identity.refuse_owner = Some("ghost".into());
    let state = DesiredState::new().with(
        "/etc/new.conf",
        FileEntry::text("x").with_owner(Some("ghost"), None),
    );

    assert!(h.materializer().apply(&state, &AuthConfig::new()).is_err());
    assert!(std::fs::symlink_metadata(h.at("/etc/new.conf")).is_err());
}

#[test]
fn failure_keeps_existing_backup_chain() {
    let mut h = Harness::new();
    write(&h, "/etc/app.conf", b"v1");
    let api = h.materializer();
    api.apply(
        &DesiredState::new().with("/etc/app.conf", FileEntry::text("v2")),
        &AuthConfig::new(),
    )
    .unwrap();
    assert_eq!(std::fs::read(h.at("/etc/app.conf.bak")).unwrap(), b"v1");

    h.identity.refuse_owner = Some("ghost".into());
    let failing = h.materializer();
    let state = DesiredState::new().with(
        "/etc/app.conf",
        FileEntry::text("v3").with_owner(Some("ghost"), None),
    );
    assert!(failing.apply(&state, &AuthConfig::new()).is_err());

    assert_eq!(std::fs::read(h.at("/etc/app.conf")).unwrap(), b"v2");
    assert_eq!(std::fs::read(h.at("/etc/app.conf.bak")).unwrap(), b"v1");
    assert!(!h.at("/etc/app.conf.bak2").exists());
}

#[test]
fn backup_depth_stays_at_one_generation_after_changes() {
    let h = Harness::new();
    let api = h.materializer();
    for v in ["v1", "v2", "v3"] {
        let state = DesiredState::new().with("/etc/app.conf", FileEntry::text(v));
        let report = api.apply(&state, &AuthConfig::new()).unwrap();
        assert_eq!(report.changed, ["/etc/app.conf"]);
    }

    assert_eq!(std::fs::read(h.at("/etc/app.conf")).unwrap(), b"v3");
    assert_eq!(std::fs::read(h.at("/etc/app.conf.bak")).unwrap(), b"v2");
    assert!(!h.at("/etc/app.conf.bak2").exists());
    assert!(!h.at("/etc/app.conf.bak3").exists());
}

#[test]
fn no_op_write_keeps_previous_generation() {
    let h = Harness::new();
    let api = h.materializer();
    for v in ["v1", "v2", "v2"] {
        let state = DesiredState::new().with("/etc/app.conf", FileEntry::text(v));
        api.apply(&state, &AuthConfig::new()).unwrap();
    }

    // the unchanged third write must not push v1 out of the chain
    assert_eq!(std::fs::read(h.at("/etc/app.conf.bak")).unwrap(), b"v1");
    assert!(!h.at("/etc/app.conf.bak2").exists());
}

#[test]
fn first_failure_stops_the_batch() {
    let h = Harness::new();
    let state = DesiredState::new()
        .with("/a", FileEntry::text("a"))
        .with("/b", FileEntry::default())
        .with("/c", FileEntry::text("c"));

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    assert!(matches!(err, ApiError::Config(ref m) if m.contains("without source or content")), "{err}");
    assert_eq!(std::fs::read(h.at("/a")).unwrap(), b"a");
    assert!(!h.at("/b").exists());
    assert!(!h.at("/c").exists());

    let summary = h.facts.of("apply.result");
    let (decision, f) = summary.last().unwrap();
    assert_eq!(decision, "failure");
    assert_eq!(f["path"], "/b");
    assert_eq!(f["error_id"], "E_CONFIG");
    assert_eq!(f["exit_code"], 10);
    assert_eq!(f["changed"], serde_json::json!(["/a"]));
}

#[test]
fn parent_that_is_a_file_is_a_configuration_error() {
    let h = Harness::new();
    write(&h, "/etc", b"not a directory");
    let state = DesiredState::new().with("/etc/app.conf", FileEntry::text("x"));

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    assert!(matches!(err, ApiError::Config(_)), "{err}");
    assert_eq!(std::fs::read(h.at("/etc")).unwrap(), b"not a directory");
}

#[test]
fn directory_at_target_is_rejected_untouched() {
    let h = Harness::new();
    std::fs::create_dir_all(h.at("/etc/app.d")).unwrap();
    let state = DesiredState::new().with("/etc/app.d", FileEntry::text("x"));

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    assert!(matches!(err, ApiError::Config(_)), "{err}");
    assert!(h.at("/etc/app.d").is_dir());
    assert!(!h.at("/etc/app.d.bak").exists());
}

#[test]
fn parent_components_are_rejected() {
    let h = Harness::new();
    let state = DesiredState::new().with("/etc/../../escape", FileEntry::text("x"));

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    assert!(matches!(err, ApiError::Config(_)), "{err}");
}

#[test]
fn file_under_symlinked_parent_is_updated_with_backup() {
    let h = Harness::new();
    write(&h, "/real/app.conf", b"old");
    std::os::unix::fs::symlink(h.at("/real"), h.at("/linked")).unwrap();
    let state = DesiredState::new().with("/linked/app.conf", FileEntry::text("new"));

    let report = h.materializer().apply(&state, &AuthConfig::new()).unwrap();

    assert_eq!(report.changed, ["/linked/app.conf"]);
    assert_eq!(std::fs::read(h.at("/real/app.conf")).unwrap(), b"new");
    assert_eq!(std::fs::read(h.at("/real/app.conf.bak")).unwrap(), b"old");
    assert!(std::fs::symlink_metadata(h.at("/linked")).unwrap().file_type().is_symlink());
}

#[test]
fn link_is_created_under_symlinked_parent() {
    let h = Harness::new();
    std::fs::create_dir_all(h.at("/run")).unwrap();
    std::fs::create_dir_all(h.at("/var")).unwrap();
    std::os::unix::fs::symlink("../run", h.at("/var/run")).unwrap();
    let state = DesiredState::new().with("/var/run/app", FileEntry::symlink("/opt/app/current"));

    let report = h.materializer().apply(&state, &AuthConfig::new()).unwrap();

    assert_eq!(report.changed, ["/var/run/app"]);
    assert_eq!(
        std::fs::read_link(h.at("/run/app")).unwrap(),
        std::path::Path::new("/opt/app/current")
    );
}
