pub mod detect;
pub mod native;
pub mod swe_agent;

pub use detect::{detect_format, import_path, ImportFormat};
pub use native::NativeImporter;
pub use swe_agent::{repo_from_instance, SweAgentImporter};
