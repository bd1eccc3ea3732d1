mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
pub use selectors::{ModelSelection, ModelSelector, SelectionError};
