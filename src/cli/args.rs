//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::NodeId;

/// Nested-set hierarchies of folders and taxonomies
#[derive(Parser, Debug)]
#[command(name = "nestset")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Data directory (default: ~/.nestset)
    #[arg(short = 'D', long, global = true, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the folder hierarchy
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Manage the taxonomy hierarchy
    Taxonomy {
        #[command(subcommand)]
        command: TaxonomyCommands,
    },

    /// Check the structural consistency of the stores
    Verify {
        /// Only this hierarchy (default: all)
        #[arg(value_enum)]
        kind: Option<HierarchyKind>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HierarchyKind {
    Folder,
    Taxonomy,
}

/// Listing options shared by folders and taxonomies
#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// Parent node (default: root)
    #[arg(short, long)]
    pub parent: Option<NodeId>,
    /// Whole subtree instead of direct children
    #[arg(short = 'a', long)]
    pub all: bool,
    /// Case-insensitive name filter
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    Add {
        name: String,
        /// Parent folder (default: root)
        #[arg(short, long)]
        parent: Option<NodeId>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename a folder
    Rename {
        id: NodeId,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Move a folder with its subfolders
    Mv {
        id: NodeId,
        /// New parent (default: root)
        #[arg(short, long)]
        to: Option<NodeId>,
    },
    /// Remove a folder with its subfolders
    Rm { id: NodeId },
    /// List folders
    Ls(ListArgs),
    /// Show the breadcrumb of a folder
    Path { id: NodeId },
    /// Show folders as a tree
    Tree {
        /// Subtree root (default: everything)
        #[arg(short, long)]
        from: Option<NodeId>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaxonomyCommands {
    /// Create a taxonomy
    Add {
        name: String,
        /// Post type, uppercase letters (e.g. POST)
        #[arg(short = 't', long)]
        post_type: String,
        /// Parent taxonomy (default: root)
        #[arg(short, long)]
        parent: Option<NodeId>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change name or description
    Update {
        id: NodeId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change the slug
    Slug { id: NodeId, slug: String },
    /// Move a taxonomy with its subtree
    Mv {
        id: NodeId,
        /// New parent (default: root)
        #[arg(short, long)]
        to: Option<NodeId>,
    },
    /// Remove a taxonomy with its subtree
    Rm { id: NodeId },
    /// List taxonomies
    Ls {
        #[command(flatten)]
        list: ListArgs,
        /// Only this post type
        #[arg(short = 't', long)]
        post_type: Option<String>,
    },
    /// Find a taxonomy by slug
    Show { slug: String },
    /// Show the breadcrumb of a taxonomy
    Path { id: NodeId },
    /// Show taxonomies as a tree
    Tree {
        /// Only this post type
        #[arg(short = 't', long)]
        post_type: Option<String>,
        /// Subtree root (default: everything)
        #[arg(short, long)]
        from: Option<NodeId>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,
    /// Print a config template
    Template,
    /// Show config paths
    Path,
}
