//! Test utilities shared by unit tests in `src/` and integration tests in
//! `tests/`.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature.

pub mod doubles;
pub mod fixtures;
pub mod runtime;

pub use doubles::{
    MemoryLockNode, MemoryRemoteStore, RecordingMetricsSink, ScriptedCategorySource,
    StaticPhotoResolver,
};
pub use runtime::{ClockAdvancingSleeper, ImmediateSleeper, MutableClock, NoJitter, RecordingSleeper};
