use crate::config::PatchType;
use crate::patcher::{
    CSharpPatcher, JsonPatcher, PatchError, Patcher, RollbackStore, TextPatcher, UnityAssetPatcher,
};
use std::collections::HashMap;

/// Patchers keyed by the patch type they handle.
///
/// Adding a format means registering one more implementation here; callers
/// only ever go through [`PatcherSet::get`].
pub struct PatcherSet {
    patchers: HashMap<PatchType, Box<dyn Patcher>>,
}

impl PatcherSet {
    /// All built-in patchers sharing one rollback store.
    pub fn new(rollback: RollbackStore) -> Self {
        let mut set = Self::empty();
        set.register(Box::new(TextPatcher::new(rollback.clone())));
        set.register(Box::new(JsonPatcher::new(rollback.clone())));
        set.register(Box::new(CSharpPatcher::new(rollback.clone())));
        set.register(Box::new(UnityAssetPatcher::new(rollback)));
        set
    }

    pub fn empty() -> Self {
        Self {
            patchers: HashMap::new(),
        }
    }

    /// Register a patcher, replacing any previous one for the same type.
    pub fn register(&mut self, patcher: Box<dyn Patcher>) {
        self.patchers.insert(patcher.patch_type(), patcher);
    }

    pub fn get(&self, patch_type: PatchType) -> Result<&dyn Patcher, PatchError> {
        self.patchers
            .get(&patch_type)
            .map(|p| p.as_ref())
            .ok_or(PatchError::NoPatcher(patch_type))
    }
}

impl Default for PatcherSet {
    fn default() -> Self {
        Self::new(RollbackStore::in_temp_dir())
    }
}
