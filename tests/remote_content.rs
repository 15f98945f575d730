mod common;

use materialize::types::{AuthConfig, Credentials, DesiredState, FileEntry};
use materialize::ApiError;

use common::Harness;

fn logical_bytes() -> Vec<u8> {
    (0..4096u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
}

#[test]
fn gzip_and_plain_sources_produce_identical_files() {
    let h = Harness::new();
    h.transport.serve_gzip("https://repo.test/blob.gz", &logical_bytes());
    h.transport.serve("https://repo.test/blob", &logical_bytes());
    let state = DesiredState::new()
        .with("/data/compressed", FileEntry::remote("https://repo.test/blob.gz"))
        .with("/data/plain", FileEntry::remote("https://repo.test/blob"));

    let report = h.materializer().apply(&state, &AuthConfig::new()).unwrap();

    assert_eq!(report.changed, ["/data/compressed", "/data/plain"]);
    let a = std::fs::read(h.at("/data/compressed")).unwrap();
    let b = std::fs::read(h.at("/data/plain")).unwrap();
    assert_eq!(a, logical_bytes());
    assert_eq!(a, b);

    let fetches = h.facts.of("fetch");
    assert_eq!(fetches.len(), 2);
    assert_eq!(fetches[0].1["gzip"], true);
    assert_eq!(fetches[1].1["gzip"], false);
}

#[test]
fn requests_ask_for_gzip_and_carry_named_credentials() {
    let h = Harness::new();
    h.transport.serve("https://repo.test/private", b"secret");
    let mut entry = FileEntry::remote("https://repo.test/private");
    entry.authentication = Some("repo".into());
    let auth = AuthConfig::new().with(
        "repo",
        Credentials::Basic { username: "deploy".into(), password: "pw".into() },
    );

    h.materializer()
        .apply(&DesiredState::new().with("/etc/private", entry), &auth)
        .unwrap();

    let reqs = h.transport.requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert!(reqs[0].1.contains(&("Accept-Encoding".to_string(), "gzip".to_string())));
    assert_eq!(reqs[0].2.as_deref(), Some("deploy"));
}

#[test]
fn unknown_authentication_name_is_a_configuration_error() {
    let h = Harness::new();
    let mut entry = FileEntry::remote("https://repo.test/private");
    entry.authentication = Some("missing".into());

    let err = h
        .materializer()
        .apply(&DesiredState::new().with("/etc/private", entry), &AuthConfig::new())
        .unwrap_err();

    assert!(matches!(err, ApiError::Config(_)), "{err}");
    assert!(h.transport.requests.lock().unwrap().is_empty());
}

#[test]
fn transport_failure_rolls_back_and_reports_reason() {
    let h = Harness::new();
    std::fs::create_dir_all(h.at("/etc")).unwrap();
    std::fs::write(h.at("/etc/remote.conf"), b"before").unwrap();
    let state = DesiredState::new().with("/etc/remote.conf", FileEntry::remote("https://repo.test/gone"));

    let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

    match err {
        ApiError::Transport(msg) => assert!(msg.contains("404"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read(h.at("/etc/remote.conf")).unwrap(), b"before");
    assert!(!h.at("/etc/remote.conf.bak").exists());
}

#[test]
fn inline_content_wins_over_source() {
    let h = Harness::new();
    let mut entry = FileEntry::text("inline");
    entry.source = Some("https://repo.test/never".into());

    h.materializer()
        .apply(&DesiredState::new().with("/etc/inline", entry), &AuthConfig::new())
        .unwrap();

    assert_eq!(std::fs::read(h.at("/etc/inline")).unwrap(), b"inline");
    assert!(h.transport.requests.lock().unwrap().is_empty());
}

#[test]
fn empty_content_falls_through_to_source() {
    let h = Harness::new();
    h.transport.serve("https://repo.test/x", b"remote");
    let state = DesiredState::from_json_str(
        r#"{"/etc/a": {"content": "", "source": "https://repo.test/x"}}"#,
    )
    .unwrap();

    let report = h.materializer().apply(&state, &AuthConfig::new()).unwrap();

    assert_eq!(report.changed, ["/etc/a"]);
    assert_eq!(std::fs::read(h.at("/etc/a")).unwrap(), b"remote");
    assert_eq!(h.transport.requests.lock().unwrap().len(), 1);
}

#[test]
fn empty_content_without_source_is_a_configuration_error() {
    let h = Harness::new();
    for doc in [r#"{"/etc/b": {"content": ""}}"#, r#"{"/etc/b": {"content": {}}}"#] {
        let state = DesiredState::from_json_str(doc).unwrap();

        let err = h.materializer().apply(&state, &AuthConfig::new()).unwrap_err();

        assert!(matches!(err, ApiError::Config(ref m) if m.contains("without source or content")), "{err}");
        assert!(std::fs::symlink_metadata(h.at("/etc/b")).is_err());
    }
}

#[test]
fn inline_entry_ignores_unknown_authentication_name() {
    let h = Harness::new();
    let mut entry = FileEntry::text("local");
    entry.authentication = Some("missing".into());

    let report = h
        .materializer()
        .apply(&DesiredState::new().with("/etc/local", entry), &AuthConfig::new())
        .unwrap();

    assert_eq!(report.changed, ["/etc/local"]);
    assert_eq!(std::fs::read(h.at("/etc/local")).unwrap(), b"local");
}
