mod backend;
mod backends;
mod registry;
mod result;

pub use backend::ClassifierBackend;
pub use backends::{ScriptStep, ScriptedBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::Classification;
