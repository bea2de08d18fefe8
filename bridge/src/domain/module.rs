//! Module domain model

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Descriptor file inside each module directory
pub const MODULE_PROP: &str = "module.prop";

/// Directory holding a module's web UI
pub const WEBROOT_DIR: &str = "webroot";

/// Marker file of a disabled module
pub const DISABLE_MARKER: &str = "disable";

/// An installed module that ships a web UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Directory name under the modules root
    pub id: String,

    /// Display name (defaults to the id)
    pub name: String,

    pub description: String,

    pub author: String,

    pub version: String,

    /// False when the module carries a disable marker
    pub enabled: bool,
}

impl Module {
    /// Create a module entry with placeholder metadata
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            author: "?".to_string(),
            version: "?".to_string(),
            enabled: true,
        }
    }

    /// Apply `key=value` lines from a `module.prop` file.
    ///
    /// Lines are split at the first `=`; unknown keys and lines without `=` are ignored.
    pub fn apply_props(&mut self, content: &str) {
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "name" => self.name = value.to_string(),
                "description" => self.description = value.to_string(),
                "author" => self.author = value.to_string(),
                "version" => self.version = value.to_string(),
                _ => {}
            }
        }
    }
}

/// Information about the module hosted by a bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    #[serde(rename = "moduleDir")]
    pub module_dir: String,
    pub id: String,
}

impl ModuleInfo {
    /// Derive the info from a module directory; the id is its last path component
    pub fn from_dir(module_dir: impl Into<String>) -> Self {
        let module_dir = module_dir.into();
        let id = Path::new(&module_dir)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { module_dir, id }
    }
}

/// Check that a module id names a single directory entry
pub fn validate_module_id(id: &str) -> crate::Result<()> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !id.contains('\\')
        && !id.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(crate::Error::InvalidModuleId(id.to_string()))
    }
}
