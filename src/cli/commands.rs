//! Command dispatch

use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{
    Folder, FolderService, NoCascade, Taxonomy, TaxonomyService,
};
use crate::application::NodeQuery;
use crate::cli::args::{
    Cli, Commands, ConfigCommands, FolderCommands, HierarchyKind, ListArgs, TaxonomyCommands,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Node, Payload};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::FileStore;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => config_command(cli, command),
        Some(Commands::Folder { command }) => folder_command(&open_folders(cli)?, command),
        Some(Commands::Taxonomy { command }) => {
            taxonomy_command(&open_taxonomies(cli)?, command)
        }
        Some(Commands::Verify { kind }) => verify(cli, *kind),
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.data_dir.as_deref())?)
}

// Each command opens only the hierarchy it works on, so its file is the only
// one created or locked.
fn open_folders(cli: &Cli) -> CliResult<FolderService<FileStore<Folder>>> {
    let settings = load_settings(cli)?;
    Ok(ServiceContainer::folder_service(&settings, Arc::new(NoCascade))?)
}

fn open_taxonomies(cli: &Cli) -> CliResult<TaxonomyService<FileStore<Taxonomy>>> {
    let settings = load_settings(cli)?;
    Ok(ServiceContainer::taxonomy_service(&settings)?)
}

fn query(list: &ListArgs) -> NodeQuery {
    NodeQuery {
        parent: list.parent,
        genealogy: list.all,
        search: list.search.clone(),
        page: list.page,
        limit: list.limit,
        ..NodeQuery::default()
    }
}

fn print_page<P: Payload>(items: &[Node<P>], total: usize, page: usize, pages: usize) {
    for node in items {
        output::info(&output::node_line(node));
    }
    output::detail(&format!("page {page}/{pages}, {total} total"));
}

#[instrument(skip(folders))]
fn folder_command(
    folders: &FolderService<FileStore<Folder>>,
    command: &FolderCommands,
) -> CliResult<()> {
    match command {
        FolderCommands::Add {
            name,
            parent,
            description,
        } => {
            let node = folders.create(*parent, name, description.as_deref())?;
            output::action("Created", &output::node_line(&node));
        }
        FolderCommands::Rename {
            id,
            name,
            description,
        } => {
            let node = folders.rename(*id, name, description.as_deref())?;
            output::action("Renamed", &output::node_line(&node));
        }
        FolderCommands::Mv { id, to } => {
            folders.move_folder(*id, *to)?;
            output::success(&format!("moved {id}"));
        }
        FolderCommands::Rm { id } => {
            let removed = folders.remove(*id)?;
            output::success(&format!("removed {removed} folder(s)"));
        }
        FolderCommands::Ls(list) => {
            let page = folders.list(&query(list))?;
            print_page(&page.items, page.total, page.page, page.pages());
        }
        FolderCommands::Path { id } => {
            output::info(&output::breadcrumb(&folders.breadcrumb(*id)?));
        }
        FolderCommands::Tree { from } => {
            output::forest(&folders.tree(*from)?);
        }
    }
    Ok(())
}

#[instrument(skip(taxonomies))]
fn taxonomy_command(
    taxonomies: &TaxonomyService<FileStore<Taxonomy>>,
    command: &TaxonomyCommands,
) -> CliResult<()> {
    match command {
        TaxonomyCommands::Add {
            name,
            post_type,
            parent,
            description,
        } => {
            let node = taxonomies.create(*parent, name, post_type, description.as_deref())?;
            output::action("Created", &output::node_line(&node));
            output::detail(&format!("slug: {}", node.payload.slug));
        }
        TaxonomyCommands::Update {
            id,
            name,
            description,
        } => {
            if name.is_none() && description.is_none() {
                return Err(CliError::InvalidArgs(
                    "nothing to update, give --name or --description".to_string(),
                ));
            }
            let node = taxonomies.update(*id, name.as_deref(), description.as_deref())?;
            output::action("Updated", &output::node_line(&node));
        }
        TaxonomyCommands::Slug { id, slug } => {
            let node = taxonomies.change_slug(*id, slug)?;
            output::action("Slug", &node.payload.slug);
        }
        TaxonomyCommands::Mv { id, to } => {
            taxonomies.move_taxonomy(*id, *to)?;
            output::success(&format!("moved {id}"));
        }
        TaxonomyCommands::Rm { id } => {
            let removed = taxonomies.remove(*id)?;
            output::success(&format!("removed {removed} taxonomy node(s)"));
        }
        TaxonomyCommands::Ls { list, post_type } => {
            let mut query = query(list);
            query.tag = post_type.clone();
            let page = taxonomies.list(&query)?;
            print_page(&page.items, page.total, page.page, page.pages());
        }
        TaxonomyCommands::Show { slug } => match taxonomies.find_by_slug(slug)? {
            Some(node) => {
                output::header(&node.payload.name);
                output::detail(&format!("id: {}", node.id));
                output::detail(&format!("slug: {}", node.payload.slug));
                output::detail(&format!("post type: {}", node.payload.post_type));
                if let Some(description) = &node.payload.description {
                    output::detail(&format!("description: {description}"));
                }
                output::detail(&format!(
                    "path: {}",
                    output::breadcrumb(&taxonomies.path(node.id)?)
                ));
            }
            None => output::warning(&format!("no taxonomy with slug {slug}")),
        },
        TaxonomyCommands::Path { id } => {
            output::info(&output::breadcrumb(&taxonomies.path(*id)?));
        }
        TaxonomyCommands::Tree { post_type, from } => {
            let forest = match post_type {
                Some(post_type) => taxonomies.as_forest_for(post_type, *from)?,
                None => taxonomies.tree(*from)?,
            };
            output::forest(&forest);
        }
    }
    Ok(())
}

fn verify(cli: &Cli, kind: Option<HierarchyKind>) -> CliResult<()> {
    debug!("verify: {kind:?}");
    if kind.is_none() || kind == Some(HierarchyKind::Folder) {
        let report = open_folders(cli)?.verify()?;
        output::success(&format!(
            "folders: {} nodes, depth {}",
            report.nodes, report.depth
        ));
    }
    if kind.is_none() || kind == Some(HierarchyKind::Taxonomy) {
        let report = open_taxonomies(cli)?.verify()?;
        output::success(&format!(
            "taxonomies: {} nodes, depth {}",
            report.nodes, report.depth
        ));
    }
    Ok(())
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let settings = load_settings(cli)?;
            output::header(&"Config paths");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: (no config directory)"),
            }
            output::detail(&format!(
                "local:  {}",
                local_config_path(&settings.data_dir).display()
            ));
            output::detail(&format!("folders:    {}", settings.folders_path().display()));
            output::detail(&format!(
                "taxonomies: {}",
                settings.taxonomies_path().display()
            ));
        }
    }
    Ok(())
}
