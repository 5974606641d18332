use std::sync::Arc;
use taskforge::error::ForgeError;
use taskforge::project::env::{install_all, InMemoryEnvironment};
use taskforge::project::{ProjectStore, SCAFFOLD_FILE};
use tempfile::tempdir;

#[tokio::test]
async fn test_create_project_scaffold() {
    let workspace = tempdir().unwrap();
    let env = Arc::new(InMemoryEnvironment::new("/bin/sh"));
    let store = ProjectStore::new(workspace.path(), env.clone());

    let project = store.create_project("demo").await.expect("create project");
    assert_eq!(project.name(), "demo");
    assert_eq!(project.dir, workspace.path().join("demo"));
    assert_eq!(std::fs::read_to_string(project.path(SCAFFOLD_FILE)).unwrap(), "");
    assert_eq!(env.created(), vec![project.dir.join("venv")]);
    assert!(project.has_environment());
    assert_eq!(store.interpreter(&project), std::path::PathBuf::from("/bin/sh"));
}

#[tokio::test]
async fn test_invalid_project_name() {
    let workspace = tempdir().unwrap();
    let store = ProjectStore::new(workspace.path(), Arc::new(InMemoryEnvironment::new("/bin/sh")));
    assert!(store.create_project("../escape").await.is_err());
    assert!(store.create_project("  ").await.is_err());
}

#[test]
fn test_open_project() {
    let workspace = tempdir().unwrap();
    std::fs::create_dir(workspace.path().join("existing")).unwrap();
    let store = ProjectStore::new(workspace.path(), Arc::new(InMemoryEnvironment::new("/bin/sh")));

    let project = store.open_project(std::path::Path::new("existing")).expect("open relative");
    assert_eq!(project.dir, workspace.path().join("existing"));
    assert!(!project.has_environment());
    assert!(project.current_file.is_none());

    let err = store.open_project(&workspace.path().join("missing")).unwrap_err();
    assert!(matches!(err, ForgeError::ProjectNotFound(_)));
}

#[tokio::test]
async fn test_files_in_project() {
    let workspace = tempdir().unwrap();
    let store = ProjectStore::new(workspace.path(), Arc::new(InMemoryEnvironment::new("/bin/sh")));
    let mut project = store.create_project("files").await.unwrap();

    let path = project.create_file("helper").expect("create file");
    assert_eq!(path, project.dir.join("helper.py"));
    assert_eq!(project.current_file.as_ref(), Some(&path));

    project.write_file("helper.py", "print('x')").unwrap();
    assert_eq!(project.open_file("helper").unwrap(), "print('x')");
    assert_eq!(project.read_file("helper.py").unwrap(), "print('x')");

    project.open_file("main.py").expect("open with extension");
    assert_eq!(project.current_file, Some(project.dir.join("main.py")));

    assert!(matches!(project.open_file("nope"), Err(ForgeError::FileNotFound(_))));
    assert!(matches!(project.write_file("a/b.py", ""), Err(ForgeError::InvalidName(_))));
    assert_eq!(project.current_file, Some(project.dir.join("main.py")));
}

#[tokio::test]
async fn test_ensure_environment_creates_once() {
    let workspace = tempdir().unwrap();
    std::fs::create_dir(workspace.path().join("bare")).unwrap();
    let env = Arc::new(InMemoryEnvironment::new("/bin/sh"));
    let store = ProjectStore::new(workspace.path(), env.clone());
    let project = store.open_project(std::path::Path::new("bare")).unwrap();

    store.ensure_environment(&project).await.unwrap();
    store.ensure_environment(&project).await.unwrap();
    assert_eq!(env.created().len(), 1);
}

#[tokio::test]
async fn test_install_all_dedups_and_reports_failures() {
    let env = InMemoryEnvironment::new("/bin/sh").with_unavailable(&["notapkg"]);
    let packages: Vec<String> = ["requests", "notapkg", "requests", "numpy"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let report = install_all(&env, std::path::Path::new("/tmp/venv"), &packages).await;
    assert_eq!(report.installed, vec!["requests", "numpy"]);
    assert_eq!(report.failed_names(), vec!["notapkg"]);
    assert!(!report.is_clean());
    assert_eq!(env.installed(), vec!["requests", "numpy"]);
}
