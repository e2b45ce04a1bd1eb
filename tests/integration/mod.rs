//! End-to-end scenarios against temporary project trees.

mod batch_processing;
mod cache_population;
mod patch_scenarios;
mod prepare_rollback;
mod properties;
