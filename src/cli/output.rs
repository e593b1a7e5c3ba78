//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use itertools::Itertools;

use crate::domain::{ForestNode, Node, Payload};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// One listing line: label, then the id dimmed.
pub fn node_line<P: Payload>(node: &Node<P>) -> String {
    format!("{}  {}", node.payload.label(), node.id.to_string().dimmed())
}

/// `Root / A / B` style breadcrumb.
pub fn breadcrumb<P: Payload>(path: &[Node<P>]) -> String {
    path.iter().map(|n| n.payload.label()).join(" / ")
}

/// Print a forest as text trees.
pub fn forest<P: Payload>(trees: &[ForestNode<Node<P>>]) {
    if trees.is_empty() {
        detail(&"(empty)");
    }
    for tree in trees {
        print!("{}", tree.to_tree_with(&|n: &Node<P>| node_line(n)));
    }
}
