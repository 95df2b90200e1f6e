use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cr",
    about = "Content repository: a tree of typed nodes and properties in a JSON store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON snapshot holding the repository
    #[arg(long, global = true, default_value = "repository.json")]
    pub store: PathBuf,

    /// TOML repository configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository snapshot
    Init(InitArgs),
    /// Add a node below an existing one
    AddNode(AddNodeArgs),
    /// Set, replace or remove a property
    Set(SetArgs),
    /// Remove a node or property
    Rm(RmArgs),
    /// Show a node or property
    Get(GetArgs),
    /// Print the node tree
    Tree(TreeArgs),
    /// Export a subtree as XML
    Export(ExportArgs),
    /// List, register or unregister namespaces
    Namespace(NamespaceArgs),
    /// List properties referencing a node
    Refs(RefsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing snapshot
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddNodeArgs {
    /// Absolute path of the parent node
    pub parent: String,
    /// Name or relative path of the new node
    pub name: String,
    /// Primary node type; defaults to the configured one
    #[arg(long = "type")]
    pub node_type: Option<String>,
    /// Identifier to use instead of a fresh one
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    /// Absolute path of the node
    pub node: String,
    pub name: String,
    /// Values; none removes the property unless --multiple is given
    pub values: Vec<String>,
    /// Property type name, e.g. Long or Date
    #[arg(long = "type", default_value = "undefined")]
    pub property_type: String,
    #[arg(long)]
    pub multiple: bool,
}

#[derive(Args)]
pub struct RmArgs {
    pub path: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub path: String,
}

#[derive(Args)]
pub struct TreeArgs {
    #[arg(default_value = "/")]
    pub path: String,
    /// Also list properties
    #[arg(short, long)]
    pub properties: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    pub path: String,
    /// Document view instead of system view
    #[arg(long)]
    pub document: bool,
    #[arg(long)]
    pub skip_binary: bool,
    #[arg(long)]
    pub no_recurse: bool,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct NamespaceArgs {
    #[command(subcommand)]
    pub action: Option<NamespaceAction>,
}

#[derive(Subcommand)]
pub enum NamespaceAction {
    List,
    Register { prefix: String, uri: String },
    Unregister { prefix: String },
}

#[derive(Args)]
pub struct RefsArgs {
    pub path: String,
    /// Weak references instead of references
    #[arg(long)]
    pub weak: bool,
}
