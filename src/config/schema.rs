use serde::{Deserialize, Serialize};
use std::fmt;

/// Declarative description of one preparation run.
///
/// Loaded fresh per run, mutated only through the explicit add/remove
/// operations below, and written back with [`crate::config::save_to_path`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageReference>,
    #[serde(default)]
    pub assemblies: Vec<AssemblyReference>,
    #[serde(default)]
    pub asset_manipulations: Vec<AssetManipulation>,
    #[serde(default)]
    pub code_patches: Vec<CodePatch>,
    #[serde(
        default,
        rename = "scriptingDefineSymbols",
        skip_serializing_if = "Option::is_none"
    )]
    pub define_symbols: Option<DefineSymbols>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Path of the cached package, project-relative
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReference {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetOperation {
    #[serde(alias = "copy")]
    Copy,
    #[serde(alias = "move")]
    Move,
    #[serde(alias = "delete")]
    Delete,
}

impl fmt::Display for AssetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetOperation::Copy => "Copy",
            AssetOperation::Move => "Move",
            AssetOperation::Delete => "Delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManipulation {
    pub operation: AssetOperation,
    /// Required for Copy and Move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Content format of a patch target, selecting the patcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchType {
    #[serde(alias = "SourceCode", alias = "csharp")]
    CSharp,
    #[serde(alias = "StructuredData", alias = "json")]
    Json,
    #[serde(alias = "SemiStructuredAsset", alias = "unityAsset")]
    UnityAsset,
    #[serde(alias = "text")]
    Text,
}

impl PatchType {
    pub const ALL: [PatchType; 4] = [
        PatchType::CSharp,
        PatchType::Json,
        PatchType::UnityAsset,
        PatchType::Text,
    ];

    /// File extensions this patch type is expected to target. Empty means any.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            PatchType::CSharp => &["cs"],
            PatchType::Json => &["json"],
            PatchType::UnityAsset => &["asset", "prefab", "unity", "mat", "controller", "anim"],
            PatchType::Text => &[],
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchType::CSharp => "CSharp",
            PatchType::Json => "Json",
            PatchType::UnityAsset => "UnityAsset",
            PatchType::Text => "Text",
        };
        f.write_str(name)
    }
}

/// How literal (and regex) substitutions place `replace`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchMode {
    #[default]
    Replace,
    InsertBefore,
    InsertAfter,
    Delete,
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchMode::Replace => "Replace",
            PatchMode::InsertBefore => "InsertBefore",
            PatchMode::InsertAfter => "InsertAfter",
            PatchMode::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// One declarative edit of one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePatch {
    /// Target file, project-relative
    #[serde(default)]
    pub file: String,
    #[serde(rename = "type")]
    pub patch_type: PatchType,
    /// Format-specific operation; absent means Mode-driven text substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default)]
    pub mode: PatchMode,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub replace: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CodePatch {
    pub fn new(file: impl Into<String>, patch_type: PatchType, search: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            patch_type,
            operation: None,
            mode: PatchMode::Replace,
            search: search.into(),
            replace: String::new(),
            optional: false,
            description: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_mode(mut self, mode: PatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_replace(mut self, replace: impl Into<String>) -> Self {
        self.replace = replace.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineSymbols {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default)]
    pub clear_existing: bool,
}

impl DefineSymbols {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && !self.clear_existing
    }
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PreparationConfig {
    pub const DEFAULT_VERSION: &'static str = "1.0";

    /// An empty config at the current format version.
    pub fn new() -> Self {
        Self {
            version: Self::DEFAULT_VERSION.to_string(),
            description: None,
            packages: Vec::new(),
            assemblies: Vec::new(),
            asset_manipulations: Vec::new(),
            code_patches: Vec::new(),
            define_symbols: None,
        }
    }

    /// Add a package, replacing any entry with the same name and version.
    pub fn add_package(&mut self, package: PackageReference) {
        match self
            .packages
            .iter_mut()
            .find(|p| p.name == package.name && p.version == package.version)
        {
            Some(existing) => *existing = package,
            None => self.packages.push(package),
        }
    }

    /// Add an assembly, replacing any entry with the same name.
    pub fn add_assembly(&mut self, assembly: AssemblyReference) {
        match self.assemblies.iter_mut().find(|a| a.name == assembly.name) {
            Some(existing) => *existing = assembly,
            None => self.assemblies.push(assembly),
        }
    }

    pub fn add_asset_manipulation(&mut self, manipulation: AssetManipulation) {
        self.asset_manipulations.push(manipulation);
    }

    pub fn add_patch(&mut self, patch: CodePatch) {
        self.code_patches.push(patch);
    }

    /// Schedule a define symbol for addition. Returns false if already scheduled.
    pub fn add_define_symbol(&mut self, symbol: &str) -> bool {
        let symbols = self.define_symbols.get_or_insert_with(DefineSymbols::default);
        symbols.remove.retain(|s| s != symbol);
        if symbols.add.iter().any(|s| s == symbol) {
            return false;
        }
        symbols.add.push(symbol.to_string());
        true
    }

    /// Schedule a define symbol for removal. Returns false if already scheduled.
    pub fn remove_define_symbol(&mut self, symbol: &str) -> bool {
        let symbols = self.define_symbols.get_or_insert_with(DefineSymbols::default);
        symbols.add.retain(|s| s != symbol);
        if symbols.remove.iter().any(|s| s == symbol) {
            return false;
        }
        symbols.remove.push(symbol.to_string());
        true
    }

    /// Remove packages by name, and by version when given.
    pub fn remove_package(&mut self, name: &str, version: Option<&str>) -> bool {
        let before = self.packages.len();
        self.packages
            .retain(|p| !(p.name == name && version.map_or(true, |v| p.version == v)));
        self.packages.len() != before
    }

    pub fn remove_assembly(&mut self, name: &str) -> bool {
        let before = self.assemblies.len();
        self.assemblies.retain(|a| a.name != name);
        self.assemblies.len() != before
    }

    pub fn remove_patch(&mut self, file: &str, search: &str) -> bool {
        let before = self.code_patches.len();
        self.code_patches
            .retain(|p| !(p.file == file && p.search == search));
        self.code_patches.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str, target: &str) -> PackageReference {
        PackageReference {
            name: name.to_string(),
            version: version.to_string(),
            source: format!("cache/{name}-{version}.tgz"),
            target: target.to_string(),
        }
    }

    #[test]
    fn add_package_replaces_on_name_and_version() {
        let mut config = PreparationConfig::new();
        config.add_package(package("com.foo", "1.0.0", "a"));
        config.add_package(package("com.foo", "1.0.0", "b"));
        config.add_package(package("com.foo", "2.0.0", "c"));

        assert_eq!(config.packages.len(), 2);
        assert_eq!(config.packages[0].target, "b");
    }

    #[test]
    fn add_assembly_replaces_on_name() {
        let mut config = PreparationConfig::new();
        let mut assembly = AssemblyReference {
            name: "Newtonsoft.Json".to_string(),
            version: Some("13.0.1".to_string()),
            source: "cache/Newtonsoft.Json.dll".to_string(),
            target: "Assets/Plugins/Newtonsoft.Json.dll".to_string(),
        };
        config.add_assembly(assembly.clone());
        assembly.version = Some("13.0.3".to_string());
        config.add_assembly(assembly);

        assert_eq!(config.assemblies.len(), 1);
        assert_eq!(config.assemblies[0].version.as_deref(), Some("13.0.3"));
    }

    #[test]
    fn define_symbols_dedupe_and_flip() {
        let mut config = PreparationConfig::new();
        assert!(config.add_define_symbol("ENABLE_LOGS"));
        assert!(!config.add_define_symbol("ENABLE_LOGS"));
        assert!(config.remove_define_symbol("ENABLE_LOGS"));

        let symbols = config.define_symbols.unwrap();
        assert!(symbols.add.is_empty());
        assert_eq!(symbols.remove, vec!["ENABLE_LOGS"]);
    }

    #[test]
    fn remove_operations_report_change() {
        let mut config = PreparationConfig::new();
        config.add_package(package("com.foo", "1.0.0", "a"));
        config.add_package(package("com.foo", "2.0.0", "b"));
        config.add_patch(CodePatch::new("a.cs", PatchType::CSharp, "x"));

        assert!(config.remove_package("com.foo", Some("2.0.0")));
        assert_eq!(config.packages.len(), 1);
        assert!(config.remove_package("com.foo", None));
        assert!(!config.remove_package("com.foo", None));
        assert!(!config.remove_assembly("missing"));
        assert!(config.remove_patch("a.cs", "x"));
    }

    #[test]
    fn patch_type_accepts_aliases() {
        let json = r#"[{"file":"a","type":"SourceCode","search":"x"},
                       {"file":"b","type":"StructuredData","search":"x"},
                       {"file":"c","type":"UnityAsset","search":"x"},
                       {"file":"d","type":"Text","search":"x","mode":"InsertAfter"}]"#;
        let patches: Vec<CodePatch> = serde_json::from_str(json).unwrap();
        let types: Vec<_> = patches.iter().map(|p| p.patch_type).collect();
        assert_eq!(
            types,
            vec![
                PatchType::CSharp,
                PatchType::Json,
                PatchType::UnityAsset,
                PatchType::Text
            ]
        );
        assert_eq!(patches[3].mode, PatchMode::InsertAfter);
        assert_eq!(patches[0].mode, PatchMode::Replace);
    }
}
