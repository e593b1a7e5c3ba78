//! Taxonomy hierarchy service
//!
//! Taxonomies are grouped by post type. Every subtree below a top-level
//! taxonomy shares one post type, which never changes after creation; moving
//! a taxonomy under another requires equal post types. Slugs are derived from
//! names and unique within the hierarchy.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::application::engine::{NodeQuery, Page};
use crate::application::hierarchy::{Hierarchy, HierarchyHooks};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::EngineSettings;
use crate::domain::text::{is_slug, is_upper_alpha, slugify};
use crate::domain::{
    build_forest, ConsistencyReport, Filter, Forest, InvalidOperation, Node, NodeId, Payload,
};
use crate::infrastructure::NodeStore;

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 151;
const POST_TYPE_MIN: usize = 3;
const POST_TYPE_MAX: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub post_type: String,
}

impl Taxonomy {
    /// New payload; the slug is derived on creation.
    pub fn new(name: impl Into<String>, post_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: String::new(),
            description: None,
            post_type: post_type.into(),
        }
    }
}

impl Payload for Taxonomy {
    fn root() -> Self {
        Self {
            name: "Root".into(),
            slug: "root".into(),
            description: None,
            post_type: "ROOT".into(),
        }
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn key(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn tag(&self) -> Option<&str> {
        Some(&self.post_type)
    }
}

pub fn validate_post_type(post_type: &str) -> ApplicationResult<()> {
    let len = post_type.len();
    if !(POST_TYPE_MIN..=POST_TYPE_MAX).contains(&len) || !is_upper_alpha(post_type) {
        return Err(ApplicationError::validation(
            "post_type",
            format!("must be {POST_TYPE_MIN} to {POST_TYPE_MAX} uppercase letters A-Z, got {post_type:?}"),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> ApplicationResult<()> {
    let len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(ApplicationError::validation(
            "name",
            format!("must be {NAME_MIN} to {NAME_MAX} characters, got {len}"),
        ));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> ApplicationResult<()> {
    if !is_slug(slug) {
        return Err(ApplicationError::validation(
            "slug",
            format!("{slug:?} must be lowercase letters and digits separated by single dashes"),
        ));
    }
    Ok(())
}

fn slug_in_use(store: &dyn NodeStore<Taxonomy>, slug: &str) -> ApplicationResult<bool> {
    Ok(store.count_where(&Filter::Key(slug.to_string()))? > 0)
}

/// Slug of `name`, suffixed with `-copy-xxxxx` when already taken.
fn unique_slug(store: &dyn NodeStore<Taxonomy>, name: &str) -> ApplicationResult<String> {
    let base = slugify(name);
    if !is_slug(&base) {
        return Err(ApplicationError::validation(
            "name",
            "must contain at least one letter or digit",
        ));
    }
    if !slug_in_use(store, &base)? {
        return Ok(base);
    }
    let suffix = Uuid::new_v4().simple().to_string();
    let slug = format!("{base}-copy-{}", &suffix[5..10]);
    debug!("unique_slug: {base} taken, using {slug}");
    Ok(slug)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyHooks;

impl HierarchyHooks<Taxonomy> for TaxonomyHooks {
    fn prepare_create(
        &self,
        store: &dyn NodeStore<Taxonomy>,
        parent: &Node<Taxonomy>,
        mut payload: Taxonomy,
    ) -> ApplicationResult<Taxonomy> {
        payload.name = payload.name.trim().to_string();
        validate_name(&payload.name)?;
        validate_post_type(&payload.post_type)?;
        if !parent.is_root() && parent.payload.post_type != payload.post_type {
            return Err(InvalidOperation::Incompatible(format!(
                "post type {} must match the parent's post type {}",
                payload.post_type, parent.payload.post_type
            ))
            .into());
        }
        payload.slug = unique_slug(store, &payload.name)?;
        Ok(payload)
    }

    fn prepare_update(
        &self,
        store: &dyn NodeStore<Taxonomy>,
        current: &Node<Taxonomy>,
        mut payload: Taxonomy,
    ) -> ApplicationResult<Taxonomy> {
        payload.name = payload.name.trim().to_string();
        validate_name(&payload.name)?;
        if payload.post_type != current.payload.post_type {
            return Err(InvalidOperation::Incompatible(format!(
                "post type of {} cannot change from {}",
                current.id, current.payload.post_type
            ))
            .into());
        }
        if payload.slug != current.payload.slug {
            validate_slug(&payload.slug)?;
            if slug_in_use(store, &payload.slug)? {
                return Err(ApplicationError::validation(
                    "slug",
                    format!("{} is already in use", payload.slug),
                ));
            }
        }
        Ok(payload)
    }

    fn validate_move(
        &self,
        node: &Node<Taxonomy>,
        new_parent: &Node<Taxonomy>,
    ) -> ApplicationResult<()> {
        if !new_parent.is_root() && new_parent.payload.post_type != node.payload.post_type {
            return Err(InvalidOperation::Incompatible(format!(
                "post type {} does not match target post type {}",
                node.payload.post_type, new_parent.payload.post_type
            ))
            .into());
        }
        Ok(())
    }
}

/// Service for the taxonomy hierarchy.
pub struct TaxonomyService<S> {
    hierarchy: Hierarchy<Taxonomy, S, TaxonomyHooks>,
}

impl<S: NodeStore<Taxonomy>> TaxonomyService<S> {
    pub fn open(store: S, settings: EngineSettings) -> ApplicationResult<Self> {
        Ok(Self {
            hierarchy: Hierarchy::open("taxonomies", store, settings, TaxonomyHooks)?,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy<Taxonomy, S, TaxonomyHooks> {
        &self.hierarchy
    }

    pub fn create(
        &self,
        parent: Option<NodeId>,
        name: &str,
        post_type: &str,
        description: Option<&str>,
    ) -> ApplicationResult<Node<Taxonomy>> {
        debug!("create: name={name} post_type={post_type} parent={parent:?}");
        let mut taxonomy = Taxonomy::new(name, post_type);
        taxonomy.description = description.map(str::to_string);
        self.hierarchy.create_under_parent(parent, taxonomy)
    }

    /// Change name and, when given, description. Slug and post type stay.
    pub fn update(
        &self,
        id: NodeId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ApplicationResult<Node<Taxonomy>> {
        debug!("update: id={id}");
        self.hierarchy.update_with(id, |current| {
            let mut next = current.payload.clone();
            if let Some(name) = name {
                next.name = name.to_string();
            }
            if let Some(description) = description {
                next.description = Some(description.to_string()).filter(|d| !d.is_empty());
            }
            Ok(next)
        })
    }

    pub fn change_slug(&self, id: NodeId, slug: &str) -> ApplicationResult<Node<Taxonomy>> {
        debug!("change_slug: id={id} slug={slug}");
        validate_slug(slug)?;
        self.hierarchy.update_with(id, |current| {
            if current.payload.slug == slug {
                return Err(ApplicationError::validation("slug", "unchanged"));
            }
            Ok(Taxonomy {
                slug: slug.to_string(),
                ..current.payload.clone()
            })
        })
    }

    pub fn find_by_slug(&self, slug: &str) -> ApplicationResult<Option<Node<Taxonomy>>> {
        validate_slug(slug)?;
        Ok(self
            .hierarchy
            .engine()
            .find(Filter::Key(slug.to_string()))?
            .into_iter()
            .next())
    }

    pub fn move_taxonomy(&self, id: NodeId, new_parent: Option<NodeId>) -> ApplicationResult<bool> {
        debug!("move_taxonomy: id={id} new_parent={new_parent:?}");
        self.hierarchy.relocate(id, new_parent)
    }

    pub fn remove(&self, id: NodeId) -> ApplicationResult<usize> {
        debug!("remove: id={id}");
        self.hierarchy.remove(id)
    }

    pub fn get(&self, id: NodeId) -> ApplicationResult<Node<Taxonomy>> {
        self.hierarchy.get(id)
    }

    pub fn path(&self, id: NodeId) -> ApplicationResult<Vec<Node<Taxonomy>>> {
        let mut path = self.hierarchy.path_to_node(id)?;
        path.retain(|n| !n.is_root());
        Ok(path)
    }

    pub fn list(&self, query: &NodeQuery) -> ApplicationResult<Page<Node<Taxonomy>>> {
        if let Some(post_type) = &query.tag {
            validate_post_type(post_type)?;
        }
        self.hierarchy.query(query)
    }

    /// Forest of one post type, optionally restricted to the subtree of `from`.
    pub fn as_forest_for(
        &self,
        post_type: &str,
        from: Option<NodeId>,
    ) -> ApplicationResult<Forest<Node<Taxonomy>>> {
        validate_post_type(post_type)?;
        let engine = self.hierarchy.engine();
        let nodes: Vec<Node<Taxonomy>> = match from {
            Some(id) => engine
                .list_subtree(id)?
                .into_iter()
                .filter(|n| !n.is_root() && n.payload.post_type == post_type)
                .collect(),
            None => engine.find(Filter::Tag(post_type.to_string()))?,
        };
        debug!("as_forest_for: {} {} nodes", nodes.len(), post_type);
        Ok(build_forest(&nodes))
    }

    pub fn tree(&self, from: Option<NodeId>) -> ApplicationResult<Forest<Node<Taxonomy>>> {
        self.hierarchy.as_forest(from)
    }

    pub fn verify(&self) -> ApplicationResult<ConsistencyReport> {
        self.hierarchy.verify()
    }
}
