use nodejs_dep_hash::{DepHasher, DependencySet, Error, Options};
use std::fs;
use std::path::{Path, PathBuf};

macro_rules! get_cases_path {
    ($path: expr) => {
        dunce::canonicalize(std::env::current_dir().unwrap().join($path)).unwrap()
    };
}

fn p(paths: Vec<&str>) -> PathBuf {
    paths
        .iter()
        .fold(get_cases_path!("tests/fixtures"), |acc, path| acc.join(path))
}

fn names(set: &DependencySet) -> Vec<&str> {
    set.iter().map(|package| package.name.as_str()).collect()
}

fn base_dirs(set: &DependencySet) -> Vec<PathBuf> {
    set.iter().map(|package| package.base_dir.clone()).collect()
}

fn discover(hasher: &DepHasher, name: &str) -> DependencySet {
    hasher
        .discover_dependencies(name, Some(p(vec![]).as_path()))
        .unwrap()
}

fn write_package(dir: &Path, name: &str, dependencies: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    let dependencies = dependencies
        .iter()
        .map(|dep| format!("\"{dep}\": \"1.0.0\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(
        dir.join("package.json"),
        format!(r#"{{ "name": "{name}", "version": "1.0.0", "dependencies": {{ {dependencies} }} }}"#),
    )
    .unwrap();
}

#[test]
fn recursive_set_test() {
    let hasher = DepHasher::new(Options::default());
    let set = discover(&hasher, "foo");

    assert_eq!(names(&set), vec!["foo", "bar", "dedupped", "dedupped-child"]);
    assert_eq!(
        base_dirs(&set),
        vec![
            p(vec!["node_modules", "foo"]),
            p(vec!["node_modules", "foo", "node_modules", "bar"]),
            p(vec!["node_modules", "dedupped"]),
            p(vec!["node_modules", "dedupped", "node_modules", "dedupped-child"]),
        ]
    );

    let root = set.root().unwrap();
    assert_eq!(root.version, "1.0.0");
    assert_eq!(
        root.dependencies.keys().collect::<Vec<_>>(),
        vec!["bar", "dedupped", "missing"]
    );
    assert_eq!(
        root.manifest_path,
        p(vec!["node_modules", "foo", "package.json"])
    );
}

#[test]
fn two_roots_test() {
    let root = tempfile::tempdir().unwrap();
    let modules = root.path().join("node_modules");
    write_package(&modules.join("foo"), "foo", &["bar"]);
    write_package(&modules.join("bar"), "bar", &[]);
    write_package(&modules.join("dedupped"), "dedupped", &["dedupped-child"]);
    write_package(
        &modules.join("dedupped").join("node_modules").join("dedupped-child"),
        "dedupped-child",
        &[],
    );

    let hasher = DepHasher::new(Options::default());
    let foo = hasher.discover_dependencies("foo", Some(root.path())).unwrap();
    assert_eq!(names(&foo), vec!["foo", "bar"]);
    let dedupped = hasher
        .discover_dependencies("dedupped", Some(root.path()))
        .unwrap();
    assert_eq!(names(&dedupped), vec!["dedupped", "dedupped-child"]);
}

#[test]
fn optional_dependencies_test() {
    let hasher = DepHasher::new(Options {
        include_optional_deps: true,
        ..Default::default()
    });
    let set = discover(&hasher, "optional");
    assert_eq!(
        names(&set),
        vec!["optional", "optional-foo", "bar", "dedupped", "dedupped-child"]
    );
    assert_eq!(
        set.iter().nth(2).unwrap().base_dir,
        p(vec!["node_modules", "optional", "node_modules", "bar"])
    );

    let hasher = DepHasher::new(Options::default());
    let set = discover(&hasher, "optional");
    assert_eq!(names(&set), vec!["optional", "bar", "dedupped", "dedupped-child"]);
}

#[test]
fn optional_dependencies_at_every_depth_test() {
    let root = tempfile::tempdir().unwrap();
    let modules = root.path().join("node_modules");
    write_package(&modules.join("top"), "top", &["middle"]);
    fs::create_dir_all(modules.join("middle")).unwrap();
    fs::write(
        modules.join("middle").join("package.json"),
        r#"{ "name": "middle", "version": "1.0.0", "optionalDependencies": { "deep": "1" } }"#,
    )
    .unwrap();
    write_package(&modules.join("deep"), "deep", &[]);

    let hasher = DepHasher::new(Options {
        include_optional_deps: true,
        ..Default::default()
    });
    let set = hasher.discover_dependencies("top", Some(root.path())).unwrap();
    assert_eq!(names(&set), vec!["top", "middle", "deep"]);
}

#[test]
fn cycle_test() {
    let hasher = DepHasher::new(Options::default());
    assert_eq!(names(&discover(&hasher, "cycle-a")), vec!["cycle-a", "cycle-b"]);
    assert_eq!(names(&discover(&hasher, "cycle-b")), vec!["cycle-b", "cycle-a"]);
}

#[test]
fn diamond_test() {
    let hasher = DepHasher::new(Options::default());
    let set = discover(&hasher, "diamond");
    assert_eq!(names(&set), vec!["diamond", "left", "shared", "right"]);
    assert_eq!(set.base_dirs().len(), 4);
}

#[test]
fn shadowing_empty_dir_test() {
    let hasher = DepHasher::new(Options::default());
    let set = discover(&hasher, "empty-node-modules-directories");
    assert_eq!(
        base_dirs(&set),
        vec![
            p(vec!["node_modules", "empty-node-modules-directories"]),
            p(vec!["node_modules", "dedupped"]),
            p(vec!["node_modules", "dedupped", "node_modules", "dedupped-child"]),
        ]
    );
}

#[test]
fn missing_root_test() {
    let hasher = DepHasher::new(Options::default());
    let set = discover(&hasher, "does-not-exist");
    assert!(set.is_empty());
    assert!(set.root().is_none());
}

#[test]
fn invalid_arguments_test() {
    let hasher = DepHasher::new(Options::default());
    assert!(matches!(
        hasher.discover_dependencies("", None),
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        hasher.discover_dependencies("foo", Some(Path::new("with-garbage-basedir"))),
        Err(Error::InvalidDirectory(_))
    ));
}

#[test]
fn broken_manifest_test() {
    let root = tempfile::tempdir().unwrap();
    let broken = root.path().join("node_modules").join("broken");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("package.json"), "{ \"name\": ").unwrap();

    let hasher = DepHasher::new(Options::default());
    assert!(matches!(
        hasher.discover_dependencies("broken", Some(root.path())),
        Err(Error::UnexpectedJson(..))
    ));
}
