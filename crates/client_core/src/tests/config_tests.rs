use super::{load_settings_from, normalize_server_url, PortalSettings};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use shared::domain::{StaffRole, UserId};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

fn temp_settings_file(contents: &str) -> (PathBuf, PathBuf) {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let seq = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let temp_root = env::temp_dir().join(format!("portal_settings_test_{suffix}_{seq}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("portal.toml");
    fs::write(&path, contents).expect("write settings");
    (temp_root, path)
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_yields_defaults() {
    let settings =
        load_settings_from(&env::temp_dir().join("does-not-exist/portal.toml"), no_env)
            .expect("settings");
    assert_eq!(settings, PortalSettings::default());
}

#[test]
fn file_values_are_applied() {
    let (temp_root, path) = temp_settings_file(
        r#"
server_url = "records.ward.local:9000/"
operator_id = 42
operator_name = "Dr. Okafor"
operator_role = "doctor"
"#,
    );

    let settings = load_settings_from(&path, no_env).expect("settings");
    assert_eq!(settings.server_url, "http://records.ward.local:9000");
    assert_eq!(settings.operator.user_id, UserId(42));
    assert_eq!(settings.operator.display_name, "Dr. Okafor");
    assert_eq!(settings.operator.role, StaffRole::Doctor);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn environment_overrides_file() {
    let (temp_root, path) = temp_settings_file("server_url = \"http://file:1\"\noperator_id = 1\n");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APP__SERVER_URL", "https://records.example.org"),
        ("PORTAL_OPERATOR_ID", " 7 "),
        ("PORTAL_OPERATOR_ROLE", "Finance"),
    ]);

    let settings = load_settings_from(&path, |key| vars.get(key).map(|v| v.to_string()))
        .expect("settings");
    assert_eq!(settings.server_url, "https://records.example.org");
    assert_eq!(settings.operator.user_id, UserId(7));
    assert_eq!(settings.operator.role, StaffRole::Finance);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn malformed_file_is_an_error() {
    let (temp_root, path) = temp_settings_file("operator_id = \"not a number\"\n");
    assert!(load_settings_from(&path, no_env).is_err());

    let (other_root, unknown_key) = temp_settings_file("database_url = \"sqlite://x\"\n");
    assert!(load_settings_from(&unknown_key, no_env).is_err());

    fs::remove_dir_all(temp_root).expect("cleanup");
    fs::remove_dir_all(other_root).expect("cleanup");
}

#[test]
fn invalid_operator_id_from_environment_is_an_error() {
    let err = load_settings_from(&env::temp_dir().join("missing/portal.toml"), |key| {
        (key == "PORTAL_OPERATOR_ID").then(|| "seven".to_string())
    })
    .expect_err("must fail");
    assert!(err.to_string().contains("PORTAL_OPERATOR_ID"));
}

#[test]
fn normalizes_server_urls() {
    assert_eq!(
        normalize_server_url("  127.0.0.1:8080// ").expect("url"),
        "http://127.0.0.1:8080"
    );
    assert_eq!(
        normalize_server_url("").expect("url"),
        PortalSettings::default().server_url
    );
    assert!(normalize_server_url("http://exa mple").is_err());
}
