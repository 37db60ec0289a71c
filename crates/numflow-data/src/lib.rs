//! Numflow Data -- stage files and engine settings.
//!
//! Stages are authored as RON, JSON or TOML. The [`schema`] module mirrors the
//! authoring format; [`loader`] detects formats, resolves names into engine
//! types and validates every stage before handing it out.

pub mod loader;
pub mod schema;

pub use loader::{
    load_catalog, load_sim_config, load_stage, load_stage_pack, DataLoadError, StageCatalog,
    StagePack,
};
