pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, save_to_path, to_json_string, ConfigError};
pub use schema::{
    AssemblyReference, AssetManipulation, AssetOperation, CodePatch, DefineSymbols,
    PackageReference, PatchMode, PatchType, PreparationConfig,
};
