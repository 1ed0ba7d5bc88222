use crate::DepHasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `.`, `..`, `./x`, `../x`
    Relative,
    /// `/x`, `\x`, `C:/x`, `C:\x`
    Absolute,
    /// A package name looked up in the modules directories.
    Normal,
}

fn is_drive_prefix(target: &str) -> bool {
    let bytes = target.as_bytes();
    bytes.len() > 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\')
}

impl DepHasher {
    pub fn get_target_kind(target: &str) -> PathKind {
        if target == "."
            || target == ".."
            || target.starts_with("./")
            || target.starts_with("../")
        {
            PathKind::Relative
        } else if target.starts_with('/') || target.starts_with('\\') || is_drive_prefix(target) {
            PathKind::Absolute
        } else {
            PathKind::Normal
        }
    }
}

#[test]
fn test_target_kind() {
    for target in [".", "..", "./", "../", "./foo", "../foo/bar"] {
        assert_eq!(DepHasher::get_target_kind(target), PathKind::Relative, "{target}");
    }
    for target in ["/", "/foo", "\\foo", "C:/", "c:/foo", "Z:\\foo"] {
        assert_eq!(DepHasher::get_target_kind(target), PathKind::Absolute, "{target}");
    }
    for target in ["foo", ".foo", "..foo", "@scope/pkg", "C:", "C:foo", "1:/x"] {
        assert_eq!(DepHasher::get_target_kind(target), PathKind::Normal, "{target}");
    }
}
