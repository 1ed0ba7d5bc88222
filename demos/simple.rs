use std::{env, path::PathBuf};

use nodejs_dep_hash::{DepHasher, Options};

// cargo run --example simple -- foo `pwd`/tests/fixtures
// DEP_HASH_TRACE=DEBUG cargo run --example simple -- foo `pwd`/tests/fixtures

fn main() {
    let name = env::args().nth(1).expect("name");
    let dir = env::args().nth(2).map(PathBuf::from);
    let hasher = DepHasher::new(Options::default());

    match hasher.discover_dependencies(&name, dir.as_deref()) {
        Ok(set) => {
            for package in &set {
                println!("{}@{} {}", package.name, package.version, package.base_dir.display());
            }
        }
        Err(err) => println!("{err}"),
    }
    match hasher.hash_for_dep(&name, dir.as_deref(), None) {
        Ok(hash) => println!("{hash}"),
        Err(err) => println!("{err}"),
    }
}
