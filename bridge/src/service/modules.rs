//! Installed module discovery

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::module::{validate_module_id, Module, DISABLE_MARKER, MODULE_PROP, WEBROOT_DIR};
use crate::error::{Error, Result};
use crate::infra::module_fs::ModuleFs;

/// Lists modules under a modules root and resolves their web roots
pub struct ModuleService {
    fs: Arc<dyn ModuleFs>,
    root: PathBuf,
    show_disabled: bool,
}

impl ModuleService {
    pub fn new(fs: Arc<dyn ModuleFs>, root: impl Into<PathBuf>, show_disabled: bool) -> Self {
        Self {
            fs,
            root: root.into(),
            show_disabled,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Modules that ship a web UI, sorted by id
    pub async fn list(&self) -> Result<Vec<Module>> {
        list_modules(self.fs.as_ref(), &self.root, self.show_disabled).await
    }

    /// Directory of an installed module with a web UI
    pub async fn module_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = module_dir_path(&self.root, id)?;
        if !self.fs.is_dir(&dir.join(WEBROOT_DIR)).await {
            return Err(Error::ModuleNotFound(id.to_string()));
        }
        if !self.show_disabled && self.fs.exists(&dir.join(DISABLE_MARKER)).await {
            return Err(Error::ModuleNotFound(id.to_string()));
        }
        Ok(dir)
    }

    /// Web root of an installed module
    pub async fn webroot(&self, id: &str) -> Result<PathBuf> {
        Ok(self.module_dir(id).await?.join(WEBROOT_DIR))
    }
}

/// Enumerate the modules under `root` that have a web root.
///
/// Disabled modules are skipped unless `show_disabled` is set. A missing or
/// unreadable `module.prop` leaves the metadata at its defaults.
pub async fn list_modules(
    fs: &dyn ModuleFs,
    root: &Path,
    show_disabled: bool,
) -> Result<Vec<Module>> {
    let mut modules = Vec::new();

    for id in fs.list_dir(root).await? {
        let dir = root.join(&id);
        if !fs.is_dir(&dir).await || !fs.is_dir(&dir.join(WEBROOT_DIR)).await {
            continue;
        }

        let enabled = !fs.exists(&dir.join(DISABLE_MARKER)).await;
        if !enabled && !show_disabled {
            debug!("Skipping disabled module {}", id);
            continue;
        }

        let mut module = Module::new(id);
        module.enabled = enabled;
        match fs.read_to_string(&dir.join(MODULE_PROP)).await {
            Ok(content) => module.apply_props(&content),
            Err(e) => warn!("Using default metadata for {}: {}", module.id, e),
        }
        modules.push(module);
    }

    modules.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(modules)
}

/// Path of the web root for module `id`, without checking it exists
pub fn webroot_path(root: &Path, id: &str) -> Result<PathBuf> {
    Ok(module_dir_path(root, id)?.join(WEBROOT_DIR))
}

fn module_dir_path(root: &Path, id: &str) -> Result<PathBuf> {
    validate_module_id(id)?;
    Ok(root.join(id))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::infra::module_fs::LocalModuleFs;

    fn install(root: &Path, id: &str, prop: Option<&str>, webroot: bool, disabled: bool) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        if webroot {
            fs::create_dir(dir.join(WEBROOT_DIR)).unwrap();
        }
        if let Some(prop) = prop {
            fs::write(dir.join(MODULE_PROP), prop).unwrap();
        }
        if disabled {
            fs::write(dir.join(DISABLE_MARKER), "").unwrap();
        }
    }

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        install(root.path(), "zeta", Some("name=Zeta\nversion=2\n"), true, false);
        install(root.path(), "alpha", None, true, false);
        install(root.path(), "noui", Some("name=No UI\n"), false, false);
        install(root.path(), "off", Some("name=Off\n"), true, true);
        fs::write(root.path().join("stray.txt"), "").unwrap();
        root
    }

    #[tokio::test]
    async fn test_list_modules_filters_and_sorts() {
        let root = fixture();
        let modules = list_modules(&LocalModuleFs, root.path(), false).await.unwrap();

        let ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);

        assert_eq!(modules[0].name, "alpha");
        assert_eq!(modules[0].author, "?");
        assert_eq!(modules[1].name, "Zeta");
        assert_eq!(modules[1].version, "2");
    }

    #[tokio::test]
    async fn test_list_modules_shows_disabled_on_request() {
        let root = fixture();
        let modules = list_modules(&LocalModuleFs, root.path(), true).await.unwrap();

        let off = modules.iter().find(|m| m.id == "off").unwrap();
        assert!(!off.enabled);
        assert_eq!(off.name, "Off");
        assert_eq!(modules.len(), 3);
    }

    #[tokio::test]
    async fn test_list_modules_missing_root() {
        let result = list_modules(&LocalModuleFs, Path::new("/nonexistent/adb/modules"), false).await;
        assert!(matches!(result, Err(Error::FileAccess(_))));
    }

    #[test]
    fn test_webroot_path_rejects_traversal() {
        let root = Path::new("/data/adb/modules");
        assert_eq!(
            webroot_path(root, "demo").unwrap(),
            PathBuf::from("/data/adb/modules/demo/webroot")
        );
        assert!(matches!(
            webroot_path(root, ".."),
            Err(Error::InvalidModuleId(_))
        ));
    }

    #[tokio::test]
    async fn test_service_resolves_webroot() {
        let root = fixture();
        let service = ModuleService::new(Arc::new(LocalModuleFs), root.path(), false);

        assert_eq!(
            service.webroot("zeta").await.unwrap(),
            root.path().join("zeta").join(WEBROOT_DIR)
        );
        assert!(matches!(
            service.webroot("noui").await,
            Err(Error::ModuleNotFound(_))
        ));
        assert!(matches!(
            service.webroot("off").await,
            Err(Error::ModuleNotFound(_))
        ));
        assert!(matches!(
            service.webroot("a/b").await,
            Err(Error::InvalidModuleId(_))
        ));
    }
}
