mod scripted;
mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use scripted::{ScriptStep, ScriptedBackend};
pub use stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
