//! File and directory naming conventions of cached artifacts.

/// Extension of packed Unity packages.
pub const PACKAGE_EXTENSION: &str = "tgz";

/// Extension of standalone assemblies.
pub const ASSEMBLY_EXTENSION: &str = "dll";

/// `<name>-<version>.tgz`
pub fn package_file_name(name: &str, version: &str) -> String {
    format!("{}-{}.{}", name, version, PACKAGE_EXTENSION)
}

/// Split a package file name at its last `-`: `com.unity.addressables-1.21.2.tgz`
/// yields `("com.unity.addressables", "1.21.2")`. Without a separator the
/// version is `unknown`.
pub fn parse_package_file_name(file_name: &str) -> (String, String) {
    let stem = file_stem(file_name);
    match stem.rfind('-') {
        Some(i) if i > 0 => (stem[..i].to_string(), stem[i + 1..].to_string()),
        _ => (stem.to_string(), "unknown".to_string()),
    }
}

/// Whether a package file name follows `<name>-<version>`.
pub fn has_version_separator(file_name: &str) -> bool {
    file_stem(file_name).rfind('-').is_some_and(|i| i > 0)
}

/// `name@hash` directory shape of an unpacked package.
pub fn parse_hashed_dir(dir_name: &str) -> Option<(String, String)> {
    let (name, hash) = dir_name.split_once('@')?;
    if name.is_empty() || hash.is_empty() {
        return None;
    }
    Some((name.to_string(), hash.to_string()))
}

/// `Name.Major.Minor.Patch` directory shape of a versioned assembly; `Name`
/// may itself contain dots.
pub fn parse_versioned_dir(dir_name: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = dir_name.split('.').collect();
    if parts.len() < 4 {
        return None;
    }
    let (name_parts, version_parts) = parts.split_at(parts.len() - 3);
    let numeric = version_parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !numeric || name_parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some((name_parts.join("."), version_parts.join(".")))
}

/// File name without its last extension.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(i) if i > 0 => &file_name[..i],
        _ => file_name,
    }
}

/// Lower-cased last extension, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    match file_name.rfind('.') {
        Some(i) if i > 0 && i + 1 < file_name.len() => {
            Some(file_name[i + 1..].to_ascii_lowercase())
        }
        _ => None,
    }
}
