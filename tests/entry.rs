use indexmap::IndexMap;
use nodejs_dep_hash::{
    CacheSizes, DepHasher, Error, Fingerprint, ModuleEntry, Options, TreeFingerprint,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

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

fn locate(hasher: &DepHasher, name: &str) -> Arc<ModuleEntry> {
    hasher.locate(name, Some(p(vec![]).as_path()), None).unwrap()
}

fn stub() -> Arc<dyn Fingerprint> {
    Arc::new(|_: &Path| String::from("24"))
}

#[test]
fn gather_dependencies_test() {
    let hasher = DepHasher::new(Options::default());
    let entry = locate(&hasher, "foo");

    let mut dependencies = IndexMap::new();
    entry.gather_dependencies(&mut dependencies).unwrap();
    assert_eq!(
        dependencies.keys().cloned().collect::<Vec<_>>(),
        vec![
            p(vec!["node_modules", "foo"]),
            p(vec!["node_modules", "foo", "node_modules", "bar"]),
            p(vec!["node_modules", "dedupped"]),
            p(vec!["node_modules", "dedupped", "node_modules", "dedupped-child"]),
        ]
    );

    // running it again over the same map changes nothing
    entry.gather_dependencies(&mut dependencies).unwrap();
    assert_eq!(dependencies.len(), 4);
}

#[test]
fn locate_test() {
    let hasher = DepHasher::new(Options::default());
    let entry = locate(&hasher, "foo");

    assert_eq!(entry.name(), "foo");
    assert_eq!(entry.version(), "1.0.0");
    assert_eq!(entry.root_dir(), p(vec!["node_modules", "foo"]));
    assert!(!entry.is_missing());
    let direct = entry.dependencies();
    assert_eq!(
        direct.iter().map(|dep| dep.name()).collect::<Vec<_>>(),
        vec!["bar", "dedupped"]
    );

    // same instance, however it is reached
    let again = hasher
        .locate("./node_modules/foo", Some(p(vec![]).as_path()), None)
        .unwrap();
    assert!(Arc::ptr_eq(&entry, &again));
    assert!(Arc::ptr_eq(&direct[1], &locate(&hasher, "dedupped")));
}

#[test]
fn get_hash_test() {
    let hasher = DepHasher::new(Options::default());
    let entry = locate(&hasher, "foo");
    let hash1 = entry.get_hash().unwrap();
    assert_eq!(hash1, entry.get_hash().unwrap());

    let hasher = DepHasher::new(Options::default());
    let hash2 = locate(&hasher, "foo").get_hash().unwrap();
    assert_eq!(hash1, hash2);

    let source = entry.source_hash().unwrap();
    assert_eq!(
        source,
        TreeFingerprint::default()
            .fingerprint(&p(vec!["node_modules", "foo"]))
            .unwrap()
    );
}

#[test]
fn custom_fingerprint_test() {
    let hasher = DepHasher::new(Options::default());
    let fixtures = p(vec![]);

    let entry = hasher
        .locate("foo", Some(fixtures.as_path()), Some(stub()))
        .unwrap();
    assert_eq!(entry.root_dir(), p(vec!["node_modules", "foo"]));
    assert_eq!(entry.dependencies().len(), 2);
    assert_eq!(entry.source_hash().unwrap(), "24");
    let hash1 = entry.get_hash().unwrap();

    let entry = hasher
        .locate("foo", Some(fixtures.as_path()), Some(stub()))
        .unwrap();
    assert_eq!(hash1, entry.get_hash().unwrap());

    assert_eq!(hasher.cache_sizes(), CacheSizes::default());
}

#[test]
fn missing_package_test() {
    let hasher = DepHasher::new(Options::default());
    let entry = locate(&hasher, "foo2");
    let entry2 = locate(&hasher, "foo2");

    assert!(entry.is_missing());
    assert!(entry.package().is_none());
    assert_eq!(entry.root_dir(), p(vec![]));
    let hash1 = entry.get_hash().unwrap();
    assert_eq!(hash1.len(), 64);
    assert_eq!(hash1, entry2.get_hash().unwrap());
    assert_eq!(hasher.cache_sizes().module_entry, 1);
}

#[test]
fn cache_sizes_test() {
    let hasher = DepHasher::new(Options::default());
    locate(&hasher, "foo").get_hash().unwrap();
    let sizes = hasher.cache_sizes();
    assert_eq!(sizes.module_entry, 4);
    assert_eq!(sizes.manifest, 4);
    assert_eq!(sizes.real_directory_path, 1);

    // dedupped and its child are already there
    locate(&hasher, "empty-node-modules-directories");
    assert_eq!(hasher.cache_sizes().module_entry, 5);

    locate(&hasher, "diamond");
    assert_eq!(hasher.cache_sizes().module_entry, 9);
}

#[test]
fn cycle_test() {
    let hasher = DepHasher::new(Options::default());
    let a = locate(&hasher, "cycle-a");
    let b = locate(&hasher, "cycle-b");

    let mut dependencies = IndexMap::new();
    a.gather_dependencies(&mut dependencies).unwrap();
    assert_eq!(
        dependencies.values().map(|e| e.name()).collect::<Vec<_>>(),
        vec!["cycle-a", "cycle-b"]
    );
    assert!(Arc::ptr_eq(&a.dependencies()[0], &b));
    assert!(Arc::ptr_eq(&b.dependencies()[0], &a));
    assert_eq!(a.get_hash().unwrap(), a.get_hash().unwrap());
    assert_eq!(b.get_hash().unwrap().len(), 64);
    assert_eq!(hasher.cache_sizes().module_entry, 2);
}

#[test]
fn cycle_under_custom_fingerprint_test() {
    let hasher = DepHasher::new(Options::default());
    let a = hasher
        .locate("cycle-a", Some(p(vec![]).as_path()), Some(stub()))
        .unwrap();
    // the throwaway session is gone, the entry still reaches the whole cycle
    let dependencies = a.dependencies();
    let b = &dependencies[0];
    assert!(Arc::ptr_eq(&b.dependencies()[0], &a));
    assert_eq!(a.get_hash().unwrap(), b.get_hash().unwrap());
}

#[test]
fn stale_entry_test() {
    let hasher = DepHasher::new(Options::default());
    let b = locate(&hasher, "cycle-a").dependencies()[0].clone();
    hasher.reset_cache();

    assert!(matches!(b.get_hash(), Err(Error::StaleEntry(_))));
}
