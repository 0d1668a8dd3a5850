//! Analysis-wide context shared by every rule invocation.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context provided to rules alongside each file.
///
/// Holds the project root (used for relative path filters) and an optional
/// type-resolution binding. Rules that declare
/// [`crate::Rule::requires_type_resolution`] are skipped when no binding is
/// present.
#[derive(Clone, Default)]
pub struct AnalysisContext {
    base_path: PathBuf,
    binding: Option<Arc<dyn Any + Send + Sync>>,
}

impl AnalysisContext {
    /// Creates a context rooted at `base_path`, without type resolution.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            binding: None,
        }
    }

    /// Attaches a type-resolution binding.
    #[must_use]
    pub fn with_binding<B: Any + Send + Sync>(mut self, binding: B) -> Self {
        self.binding = Some(Arc::new(binding));
        self
    }

    /// Root of the analyzed project.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns true if a type-resolution binding is attached.
    #[must_use]
    pub fn has_binding(&self) -> bool {
        self.binding.is_some()
    }

    /// Returns the binding if it has type `B`.
    #[must_use]
    pub fn binding<B: Any>(&self) -> Option<&B> {
        self.binding.as_deref().and_then(|b| b.downcast_ref::<B>())
    }

    /// Path relative to the project root, or the path itself outside of it.
    #[must_use]
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.base_path)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("base_path", &self.base_path)
            .field("has_binding", &self.has_binding())
            .finish()
    }
}
