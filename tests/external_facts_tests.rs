mod common;

use common::{write, ScriptedRunner};
use rustle_facts::facts::external::{
    ExecutionResolver, ExternalFactError, ExternalFacts, ExternalResolver, JsonResolver,
    TextResolver, YamlResolver,
};
use rustle_facts::facts::{Collection, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn get_str(collection: &mut Collection, name: &str) -> Option<String> {
    collection
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[test]
fn test_text_file_facts() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "site.txt",
        "Environment=production\nnot a fact\nmotd=Welcome = friend \n",
    );

    let external = ExternalFacts::new().with(TextResolver);
    let mut collection = Collection::empty();
    collection.add_external_facts(&external, &[temp_dir.path().to_path_buf()]);

    assert_eq!(get_str(&mut collection, "environment").as_deref(), Some("production"));
    assert_eq!(get_str(&mut collection, "motd").as_deref(), Some("Welcome = friend "));
    assert_eq!(collection.len(), 2);
}

#[test]
fn test_script_output_skips_lines_without_separator() {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("facts.sh");
    let runner = ScriptedRunner::new().with(
        &script.to_string_lossy(),
        "FOO=bar\nwarning: could not reach the metadata service",
    );

    let resolver = ExecutionResolver::new(Arc::new(runner), None);
    let mut collection = Collection::empty();
    resolver.resolve(&script, &mut collection).unwrap();

    assert_eq!(get_str(&mut collection, "foo").as_deref(), Some("bar"));
    assert_eq!(collection.len(), 1);
}

#[test]
fn test_missing_script_is_not_invoked_error() {
    let runner = ScriptedRunner::new();
    let resolver = ExecutionResolver::new(Arc::new(runner), None);
    let mut collection = Collection::empty();

    let result = resolver.resolve(&PathBuf::from("/nonexistent/facts.sh"), &mut collection);
    assert!(matches!(result, Err(ExternalFactError::NotInvoked { .. })));
}

#[test]
fn test_later_files_override_earlier_ones() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "a.txt", "role=web\n");
    write(temp_dir.path(), "b.json", r#"{"role": "db", "replicas": 3}"#);
    write(temp_dir.path(), "c.yaml", "zone: eu-west-1a\n");
    write(temp_dir.path(), "ignored.conf", "role=cache\n");

    let external = ExternalFacts::new()
        .with(TextResolver)
        .with(JsonResolver)
        .with(YamlResolver);
    let mut collection = Collection::empty();
    collection.add_external_facts(&external, &[temp_dir.path().to_path_buf()]);

    assert_eq!(get_str(&mut collection, "role").as_deref(), Some("db"));
    assert_eq!(collection.get("replicas").and_then(Value::as_integer), Some(3));
    assert_eq!(get_str(&mut collection, "zone").as_deref(), Some("eu-west-1a"));
}

#[test]
fn test_bad_file_does_not_stop_the_scan() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "a.json", "{ not json");
    write(temp_dir.path(), "b.txt", "owner=ops\n");

    let external = ExternalFacts::new().with(TextResolver).with(JsonResolver);
    let mut collection = Collection::empty();
    collection.add_external_facts(
        &external,
        &[
            PathBuf::from("/nonexistent/facts.d"),
            temp_dir.path().to_path_buf(),
        ],
    );

    assert_eq!(get_str(&mut collection, "owner").as_deref(), Some("ops"));
}

#[test]
fn test_subdirectories_are_not_scanned() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "nested/deep.txt", "deep=yes\n");

    let external = ExternalFacts::new().with(TextResolver);
    let mut collection = Collection::empty();
    collection.add_external_facts(&external, &[temp_dir.path().to_path_buf()]);

    assert!(collection.is_empty());
}

#[cfg(unix)]
#[test]
fn test_executable_script_runs() {
    use rustle_facts::process::SystemRunner;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("facts");
    fs::write(
        &script,
        "#!/bin/sh\necho FOO=bar\necho 'warning: something odd'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let external = ExternalFacts::new()
        .with(TextResolver)
        .with(ExecutionResolver::new(Arc::new(SystemRunner), None));
    let mut collection = Collection::empty();
    collection.add_external_facts(&external, &[temp_dir.path().to_path_buf()]);

    assert_eq!(get_str(&mut collection, "foo").as_deref(), Some("bar"));
    assert_eq!(collection.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_failing_script_is_script_failed_error() {
    use rustle_facts::process::SystemRunner;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("broken");
    fs::write(&script, "#!/bin/sh\necho partial=1\nexit 3\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let resolver = ExecutionResolver::new(Arc::new(SystemRunner), None);
    let mut collection = Collection::empty();
    let result = resolver.resolve(&script, &mut collection);

    assert!(matches!(result, Err(ExternalFactError::ScriptFailed { .. })));
    assert!(collection.is_empty());
}

#[cfg(unix)]
#[test]
fn test_script_with_background_child_is_cut_off_by_timeout() {
    use rustle_facts::process::SystemRunner;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("daemonizes");
    fs::write(&script, "#!/bin/sh\necho started=yes\nsleep 5 &\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let resolver = ExecutionResolver::new(
        Arc::new(SystemRunner),
        Some(Duration::from_millis(300)),
    );
    let mut collection = Collection::empty();
    let started = Instant::now();
    let result = resolver.resolve(&script, &mut collection);

    assert!(matches!(result, Err(ExternalFactError::ScriptFailed { .. })));
    assert!(started.elapsed() < Duration::from_secs(4));
}
