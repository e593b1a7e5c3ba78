//! Service container for dependency injection
//!
//! Wires the hierarchy services to their file stores.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{
    Folder, FolderCascade, FolderService, NoCascade, Taxonomy, TaxonomyService,
};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::infrastructure::FileStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    pub folders: FolderService<FileStore<Folder>>,

    pub taxonomies: TaxonomyService<FileStore<Taxonomy>>,
}

impl ServiceContainer {
    /// Open both hierarchies below `settings.data_dir`.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(NoCascade))
    }

    /// Create a service container with a custom folder cascade.
    pub fn with_deps(settings: Settings, cascade: Arc<dyn FolderCascade>) -> ApplicationResult<Self> {
        debug!("opening stores in {}", settings.data_dir.display());
        let folders = Self::folder_service(&settings, cascade)?;
        let taxonomies = Self::taxonomy_service(&settings)?;

        Ok(Self {
            settings: Arc::new(settings),
            folders,
            taxonomies,
        })
    }

    /// Open only the folder hierarchy; the taxonomy file is left untouched.
    pub fn folder_service(
        settings: &Settings,
        cascade: Arc<dyn FolderCascade>,
    ) -> ApplicationResult<FolderService<FileStore<Folder>>> {
        FolderService::with_cascade(
            FileStore::open(settings.folders_path())?,
            settings.engine,
            cascade,
        )
    }

    /// Open only the taxonomy hierarchy.
    pub fn taxonomy_service(
        settings: &Settings,
    ) -> ApplicationResult<TaxonomyService<FileStore<Taxonomy>>> {
        TaxonomyService::open(FileStore::open(settings.taxonomies_path())?, settings.engine)
    }
}
