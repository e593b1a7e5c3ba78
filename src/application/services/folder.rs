//! Folder hierarchy service
//!
//! Folders are plain named nodes. Removing a folder removes its whole subtree
//! and tells a [`FolderCascade`] which folders went away, so records filed
//! under them (e.g. media files) can be cleaned up in the same critical
//! section.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::engine::{NodeQuery, Page};
use crate::application::hierarchy::{Hierarchy, HierarchyHooks};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::EngineSettings;
use crate::domain::text::slugify;
use crate::domain::{ConsistencyReport, Forest, Node, NodeId, Payload};
use crate::infrastructure::NodeStore;

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
    /// Slug of `name`, used for sorting and lookups
    pub name_sort: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name_sort: slugify(&name),
            name,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Payload for Folder {
    fn root() -> Self {
        Folder::new("Root")
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// Cleanup of records that live in removed folders.
pub trait FolderCascade: Send + Sync {
    /// Called with every removed folder id; returns the number of dependent
    /// records removed.
    fn folders_removed(&self, ids: &[NodeId]) -> ApplicationResult<usize>;
}

/// Cascade for deployments without dependent records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCascade;

impl FolderCascade for NoCascade {
    fn folders_removed(&self, _ids: &[NodeId]) -> ApplicationResult<usize> {
        Ok(0)
    }
}

pub struct FolderHooks {
    cascade: Arc<dyn FolderCascade>,
}

impl FolderHooks {
    pub fn new(cascade: Arc<dyn FolderCascade>) -> Self {
        Self { cascade }
    }

    fn normalize(mut folder: Folder) -> ApplicationResult<Folder> {
        folder.name = folder.name.trim().to_string();
        let len = folder.name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&len) {
            return Err(ApplicationError::validation(
                "name",
                format!("must be {NAME_MIN} to {NAME_MAX} characters, got {len}"),
            ));
        }
        folder.name_sort = slugify(&folder.name);
        folder.description = folder
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(folder)
    }
}

impl HierarchyHooks<Folder> for FolderHooks {
    fn prepare_create(
        &self,
        _store: &dyn NodeStore<Folder>,
        _parent: &Node<Folder>,
        payload: Folder,
    ) -> ApplicationResult<Folder> {
        Self::normalize(payload)
    }

    fn prepare_update(
        &self,
        _store: &dyn NodeStore<Folder>,
        _current: &Node<Folder>,
        payload: Folder,
    ) -> ApplicationResult<Folder> {
        Self::normalize(payload)
    }

    fn after_remove(&self, removed: &[Node<Folder>]) -> ApplicationResult<()> {
        let ids: Vec<NodeId> = removed.iter().map(|n| n.id).collect();
        let records = self.cascade.folders_removed(&ids)?;
        debug!("after_remove: {} folders, {} dependent records", ids.len(), records);
        Ok(())
    }
}

/// Service for the folder hierarchy.
pub struct FolderService<S> {
    hierarchy: Hierarchy<Folder, S, FolderHooks>,
}

impl<S: NodeStore<Folder>> FolderService<S> {
    pub fn open(store: S, settings: EngineSettings) -> ApplicationResult<Self> {
        Self::with_cascade(store, settings, Arc::new(NoCascade))
    }

    pub fn with_cascade(
        store: S,
        settings: EngineSettings,
        cascade: Arc<dyn FolderCascade>,
    ) -> ApplicationResult<Self> {
        Ok(Self {
            hierarchy: Hierarchy::open("folders", store, settings, FolderHooks::new(cascade))?,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy<Folder, S, FolderHooks> {
        &self.hierarchy
    }

    pub fn create(
        &self,
        parent: Option<NodeId>,
        name: &str,
        description: Option<&str>,
    ) -> ApplicationResult<Node<Folder>> {
        debug!("create: name={name} parent={parent:?}");
        let mut folder = Folder::new(name);
        folder.description = description.map(str::to_string);
        self.hierarchy.create_under_parent(parent, folder)
    }

    /// Rename a folder; `description` replaces the old one when given.
    pub fn rename(
        &self,
        id: NodeId,
        name: &str,
        description: Option<&str>,
    ) -> ApplicationResult<Node<Folder>> {
        debug!("rename: id={id} name={name}");
        self.hierarchy.update_with(id, |current| {
            Ok(Folder {
                name: name.to_string(),
                name_sort: String::new(),
                description: description
                    .map(str::to_string)
                    .or_else(|| current.payload.description.clone()),
            })
        })
    }

    pub fn move_folder(&self, id: NodeId, new_parent: Option<NodeId>) -> ApplicationResult<bool> {
        debug!("move_folder: id={id} new_parent={new_parent:?}");
        self.hierarchy.relocate(id, new_parent)
    }

    /// Remove a folder with all subfolders. Returns the number of folders removed.
    pub fn remove(&self, id: NodeId) -> ApplicationResult<usize> {
        debug!("remove: id={id}");
        self.hierarchy.remove(id)
    }

    pub fn get(&self, id: NodeId) -> ApplicationResult<Node<Folder>> {
        self.hierarchy.get(id)
    }

    pub fn children(&self, parent: Option<NodeId>) -> ApplicationResult<Vec<Node<Folder>>> {
        self.hierarchy.children(parent)
    }

    /// Root-to-folder breadcrumb, excluding the sentinel root.
    pub fn breadcrumb(&self, id: NodeId) -> ApplicationResult<Vec<Node<Folder>>> {
        let mut path = self.hierarchy.path_to_node(id)?;
        path.retain(|n| !n.is_root());
        Ok(path)
    }

    pub fn list(&self, query: &NodeQuery) -> ApplicationResult<Page<Node<Folder>>> {
        self.hierarchy.query(query)
    }

    pub fn tree(&self, from: Option<NodeId>) -> ApplicationResult<Forest<Node<Folder>>> {
        self.hierarchy.as_forest(from)
    }

    pub fn verify(&self) -> ApplicationResult<ConsistencyReport> {
        self.hierarchy.verify()
    }
}
