use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use cr_export::{export_to_string, ExportOptions, ExportView};
use cr_session::{Item, Property, PropertyKey, PropertyValues, Repository, RepositoryConfig, Session};
use cr_store::InMemoryBackend;
use cr_types::{NodeId, PropertyInput, PropertyType, Value};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Init(args) => cmd_init(&cli, args),
        Command::AddNode(args) => cmd_add_node(&cli, args),
        Command::Set(args) => cmd_set(&cli, args),
        Command::Rm(args) => cmd_rm(&cli, args),
        Command::Get(args) => cmd_get(&cli, args),
        Command::Tree(args) => cmd_tree(&cli, args),
        Command::Export(args) => cmd_export(&cli, args),
        Command::Namespace(args) => cmd_namespace(&cli, args),
        Command::Refs(args) => cmd_refs(&cli, args),
    }
}

/// The repository held in the snapshot file.
struct Store {
    backend: Arc<InMemoryBackend>,
    repository: Repository,
    path: PathBuf,
}

impl Store {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli.config.as_deref())?;
        let backend = InMemoryBackend::load_from(&cli.store).with_context(|| {
            format!("cannot open store {} (run `cr init` first)", cli.store.display())
        })?;
        let backend = Arc::new(backend);
        Ok(Self {
            repository: Repository::new(backend.clone(), config),
            backend,
            path: cli.store.clone(),
        })
    }

    fn login(&self) -> anyhow::Result<Session> {
        Ok(self.repository.login(None)?)
    }

    fn config(&self) -> &RepositoryConfig {
        self.repository.config()
    }

    /// Save the session and write the snapshot back.
    fn commit(&self, session: &mut Session) -> anyhow::Result<()> {
        session.save()?;
        self.backend
            .save_to(&self.path)
            .with_context(|| format!("cannot write store {}", self.path.display()))?;
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RepositoryConfig> {
    match path {
        Some(path) => RepositoryConfig::load(path)
            .with_context(|| format!("cannot read config {}", path.display())),
        None => Ok(RepositoryConfig::default()),
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(cli: &Cli, args: &InitArgs) -> anyhow::Result<()> {
    if cli.store.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", cli.store.display());
    }
    let config = load_config(cli.config.as_deref())?;
    let backend = InMemoryBackend::with_root_node_type(&config.root_node_type);
    backend
        .save_to(&cli.store)
        .with_context(|| format!("cannot write store {}", cli.store.display()))?;
    println!(
        "{} Initialized repository in {}",
        "✓".green().bold(),
        cli.store.display().to_string().bold()
    );
    println!("  Workspace: {}", config.default_workspace.yellow());
    println!("  Root type: {}", config.root_node_type.cyan());
    Ok(())
}

fn cmd_add_node(cli: &Cli, args: &AddNodeArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    let parent = session.node(&args.parent)?.identifier();
    let node_type = args
        .node_type
        .clone()
        .unwrap_or_else(|| store.config().default_node_type.clone());
    let id = args
        .id
        .as_deref()
        .map(NodeId::parse)
        .transpose()
        .context("invalid --id")?;

    let id = session.add_node(&parent, &args.name, Some(node_type.as_str()), id)?;
    store.commit(&mut session)?;
    let path = session.path(&id)?;

    match cli.format {
        OutputFormat::Json => print_json(&json!({
            "path": path,
            "identifier": id.to_string(),
            "type": node_type,
        })),
        OutputFormat::Text => {
            println!("{} Added {} [{}]", "✓".green(), path.bold(), node_type.cyan());
            println!("  Identifier: {}", id.to_string().yellow());
            Ok(())
        }
    }
}

fn cmd_set(cli: &Cli, args: &SetArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    let node = session.node(&args.node)?.identifier();
    let ty = PropertyType::from_name(&args.property_type)?;
    let input = if args.multiple {
        PropertyInput::list(args.values.iter().map(String::as_str))
    } else {
        match args.values.as_slice() {
            [] => PropertyInput::Null,
            [value] => PropertyInput::from(value.as_str()),
            _ => bail!("{} values given for {}; pass --multiple", args.values.len(), args.name),
        }
    };
    let removing = input.is_null();

    session.set_property(&node, &args.name, input, ty)?;
    store.commit(&mut session)?;

    if removing {
        println!("{} Removed {}", "✓".green(), args.name.bold());
        return Ok(());
    }
    let key = PropertyKey::new(node, args.name.as_str());
    let summary = PropertySummary::of(session.property_at(&key)?);
    match cli.format {
        OutputFormat::Json => print_json(&summary.to_json()),
        OutputFormat::Text => {
            println!("{} Set {}", "✓".green(), summary.to_line());
            Ok(())
        }
    }
}

fn cmd_rm(cli: &Cli, args: &RmArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    session.remove_item(&args.path)?;
    store.commit(&mut session)?;
    println!("{} Removed {}", "✓".green(), args.path.bold());
    Ok(())
}

fn cmd_get(cli: &Cli, args: &GetArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    match session.item(&args.path)? {
        Item::Node(id) => {
            let summary = NodeSummary::take(&mut session, &id)?;
            let children = summary
                .children
                .iter()
                .map(|child| Ok(NodeSummary::take(&mut session, child)?.name))
                .collect::<anyhow::Result<Vec<_>>>()?;
            match cli.format {
                OutputFormat::Json => {
                    let mut value = summary.to_json();
                    value["path"] = json!(args.path);
                    value["children"] = json!(children);
                    print_json(&value)
                }
                OutputFormat::Text => {
                    println!("{} [{}]", args.path.bold(), summary.node_type.cyan());
                    println!("  Identifier: {}", summary.identifier.to_string().yellow());
                    for property in &summary.properties {
                        println!("  {}", property.to_line());
                    }
                    for child in &children {
                        println!("  + {child}");
                    }
                    Ok(())
                }
            }
        }
        Item::Property(key) => {
            let summary = PropertySummary::of(session.property_at(&key)?);
            match cli.format {
                OutputFormat::Json => print_json(&summary.to_json()),
                OutputFormat::Text => {
                    for value in &summary.values {
                        println!("{value}");
                    }
                    Ok(())
                }
            }
        }
    }
}

fn cmd_tree(cli: &Cli, args: &TreeArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    let start = session.node(&args.path)?.identifier();
    match cli.format {
        OutputFormat::Json => print_json(&tree_json(&mut session, &start, args.properties)?),
        OutputFormat::Text => print_tree(&mut session, &start, 0, args.properties),
    }
}

fn print_tree(
    session: &mut Session,
    id: &NodeId,
    depth: usize,
    with_properties: bool,
) -> anyhow::Result<()> {
    let node = NodeSummary::take(session, id)?;
    let indent = "  ".repeat(depth);
    println!("{indent}{} [{}]", node.name.bold(), node.node_type.cyan());
    if with_properties {
        for property in &node.properties {
            println!("{indent}  - {}", property.to_line());
        }
    }
    for child in &node.children {
        print_tree(session, child, depth + 1, with_properties)?;
    }
    Ok(())
}

fn tree_json(
    session: &mut Session,
    id: &NodeId,
    with_properties: bool,
) -> anyhow::Result<serde_json::Value> {
    let node = NodeSummary::take(session, id)?;
    let mut value = json!({
        "name": node.name,
        "identifier": node.identifier.to_string(),
        "type": node.node_type,
    });
    if with_properties {
        value["properties"] = node.properties.iter().map(PropertySummary::to_json).collect();
    }
    value["children"] = node
        .children
        .iter()
        .map(|child| tree_json(session, child, with_properties))
        .collect::<anyhow::Result<serde_json::Value>>()?;
    Ok(value)
}

fn cmd_export(cli: &Cli, args: &ExportArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    let options = ExportOptions {
        skip_binary: args.skip_binary,
        no_recurse: args.no_recurse,
        ..ExportOptions::default()
    };
    let view = if args.document {
        ExportView::Document
    } else {
        ExportView::System
    };
    let xml = export_to_string(&mut session, &args.path, view, &options)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &xml).with_context(|| format!("cannot write {}", path.display()))?;
            println!("{} Exported {} to {}", "✓".green(), args.path.bold(), path.display());
        }
        None => println!("{xml}"),
    }
    Ok(())
}

fn cmd_namespace(cli: &Cli, args: &NamespaceArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    match &args.action {
        None | Some(NamespaceAction::List) => {
            let entries: Vec<(String, String)> = session
                .namespace_registry()
                .entries()
                .into_iter()
                .filter(|(prefix, _)| !prefix.is_empty())
                .collect();
            match cli.format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = entries
                        .into_iter()
                        .map(|(prefix, uri)| (prefix, json!(uri)))
                        .collect();
                    print_json(&serde_json::Value::Object(map))
                }
                OutputFormat::Text => {
                    for (prefix, uri) in entries {
                        println!("{:<8} {}", prefix.bold(), uri.blue());
                    }
                    Ok(())
                }
            }
        }
        Some(NamespaceAction::Register { prefix, uri }) => {
            session.namespace_registry_mut()?.register_namespace(prefix, uri)?;
            store.commit(&mut session)?;
            println!("{} Registered {} → {}", "✓".green(), prefix.bold(), uri.blue());
            Ok(())
        }
        Some(NamespaceAction::Unregister { prefix }) => {
            session.namespace_registry_mut()?.unregister_namespace(prefix)?;
            store.commit(&mut session)?;
            println!("{} Unregistered {}", "✓".green(), prefix.bold());
            Ok(())
        }
    }
}

fn cmd_refs(cli: &Cli, args: &RefsArgs) -> anyhow::Result<()> {
    let store = Store::open(cli)?;
    let mut session = store.login()?;
    let target = session.node(&args.path)?.identifier();
    let references = if args.weak {
        session.weak_references(&target, None)?
    } else {
        session.references(&target, None)?
    };
    let keys: Vec<PropertyKey> = references.iter().map(|p| p.key()).collect();
    let paths = keys
        .iter()
        .map(|key| Ok(session.property_path(key)?))
        .collect::<anyhow::Result<Vec<_>>>()?;

    match cli.format {
        OutputFormat::Json => print_json(&json!(paths)),
        OutputFormat::Text => {
            if paths.is_empty() {
                println!("No references to {}.", args.path.bold());
            }
            for path in paths {
                println!("{path}");
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Owned view of a node for printing.
struct NodeSummary {
    name: String,
    identifier: NodeId,
    node_type: String,
    /// Without the autocreated properties.
    properties: Vec<PropertySummary>,
    children: Vec<NodeId>,
}

impl NodeSummary {
    fn take(session: &mut Session, id: &NodeId) -> anyhow::Result<Self> {
        let node = session.node_by_identifier(id)?;
        Ok(Self {
            name: if node.is_root() { "/".into() } else { node.name().to_string() },
            identifier: node.identifier(),
            node_type: node.primary_node_type().to_string(),
            properties: node
                .properties()
                .filter(|p| !p.is_autocreated())
                .map(PropertySummary::of)
                .collect(),
            children: node.child_ids().to_vec(),
        })
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "identifier": self.identifier.to_string(),
            "type": self.node_type,
            "properties": self.properties.iter().map(PropertySummary::to_json).collect::<Vec<_>>(),
        })
    }
}

struct PropertySummary {
    name: String,
    property_type: PropertyType,
    multiple: bool,
    values: Vec<String>,
}

impl PropertySummary {
    fn of(property: &Property) -> Self {
        let (multiple, values) = match property.raw_values() {
            PropertyValues::Single(v) => (false, vec![display_value(v)]),
            PropertyValues::Multiple(vs) => (true, vs.iter().map(display_value).collect()),
        };
        Self {
            name: property.name().to_string(),
            property_type: property.property_type(),
            multiple,
            values,
        }
    }

    fn to_line(&self) -> String {
        let values = if self.multiple {
            format!("[{}]", self.values.join(", "))
        } else {
            self.values.concat()
        };
        format!("{} ({}) = {}", self.name.bold(), self.property_type.name().cyan(), values)
    }

    fn to_json(&self) -> serde_json::Value {
        let values = if self.multiple {
            json!(self.values)
        } else {
            json!(self.values.concat())
        };
        json!({
            "name": self.name,
            "type": self.property_type.name(),
            "multiple": self.multiple,
            "value": values,
        })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Binary(bytes) => format!("<{} bytes>", bytes.len()),
        other => other.get_string().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: String,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = dir.path().join("repo.json").display().to_string();
            let fixture = Self { _dir: dir, store };
            fixture.run(&["init"]).unwrap();
            fixture
        }

        fn run(&self, args: &[&str]) -> anyhow::Result<()> {
            let mut argv = vec!["cr", "--store", self.store.as_str()];
            argv.extend_from_slice(args);
            run_command(Cli::try_parse_from(argv)?)
        }

        fn session(&self) -> Session {
            let backend = InMemoryBackend::load_from(Path::new(&self.store)).unwrap();
            Repository::new(Arc::new(backend), RepositoryConfig::default())
                .login(None)
                .unwrap()
        }
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let fixture = Fixture::new();
        assert!(fixture.run(&["init"]).is_err());
        fixture.run(&["init", "--force"]).unwrap();
    }

    #[test]
    fn commands_need_an_initialized_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("missing.json").display().to_string();
        let cli = Cli::try_parse_from(["cr", "--store", store.as_str(), "tree"]).unwrap();
        assert!(run_command(cli).is_err());
    }

    #[test]
    fn add_and_set_are_persisted() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "content"]).unwrap();
        fixture.run(&["add-node", "/content", "page", "--type", "nt:folder"]).unwrap();
        fixture.run(&["set", "/content", "title", "Hello"]).unwrap();
        fixture.run(&["set", "/content", "count", "3", "--type", "Long"]).unwrap();
        fixture.run(&["set", "/content", "tags", "a", "b", "--multiple"]).unwrap();

        let mut session = fixture.session();
        let page = session.node("/content/page").unwrap();
        assert_eq!(page.primary_node_type(), "nt:folder");
        assert_eq!(session.property("/content/title").unwrap().get_string().unwrap(), "Hello");
        assert_eq!(session.property("/content/count").unwrap().get_long().unwrap(), 3);
        assert_eq!(session.property("/content/tags").unwrap().values().unwrap().len(), 2);
        assert_eq!(
            session.node("/content").unwrap().primary_node_type(),
            "nt:unstructured"
        );
    }

    #[test]
    fn add_node_with_identifier() {
        let fixture = Fixture::new();
        let id = NodeId::new();
        let id_text = id.to_string();
        fixture.run(&["add-node", "/", "fixed", "--id", id_text.as_str()]).unwrap();
        assert!(fixture.run(&["add-node", "/", "again", "--id", id_text.as_str()]).is_err());
        assert!(fixture.run(&["add-node", "/", "bad", "--id", "not-a-uuid"]).is_err());

        let mut session = fixture.session();
        assert_eq!(session.node("/fixed").unwrap().identifier(), id);
    }

    #[test]
    fn set_rules() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "a"]).unwrap();
        assert!(fixture.run(&["set", "/a", "x", "1", "2"]).is_err());
        assert!(fixture.run(&["set", "/a", "n", "twelve", "--type", "Long"]).is_err());
        assert!(fixture.run(&["set", "/a", "n", "1", "--type", "Nonsense"]).is_err());

        fixture.run(&["set", "/a", "title", "x"]).unwrap();
        fixture.run(&["set", "/a", "title"]).unwrap();
        assert!(!fixture.session().property_exists("/a/title").unwrap());
    }

    #[test]
    fn rm_removes_nodes_and_properties() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "a"]).unwrap();
        fixture.run(&["add-node", "/a", "b"]).unwrap();
        fixture.run(&["set", "/a", "title", "x"]).unwrap();

        fixture.run(&["rm", "/a/title"]).unwrap();
        assert!(!fixture.session().property_exists("/a/title").unwrap());
        fixture.run(&["rm", "/a"]).unwrap();
        assert!(!fixture.session().node_exists("/a/b").unwrap());
        assert!(fixture.run(&["rm", "/a"]).is_err());
    }

    #[test]
    fn referenced_node_cannot_be_removed() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "target"]).unwrap();
        fixture.run(&["add-node", "/", "holder"]).unwrap();
        let target = fixture.session().node("/target").unwrap().identifier().to_string();
        fixture
            .run(&["set", "/holder", "ref", target.as_str(), "--type", "Reference"])
            .unwrap();
        fixture.run(&["refs", "/target"]).unwrap();
        assert!(fixture.run(&["rm", "/target"]).is_err());
        assert!(fixture.session().node_exists("/target").unwrap());
    }

    #[test]
    fn read_only_commands() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "a"]).unwrap();
        fixture.run(&["set", "/a", "title", "x"]).unwrap();
        fixture.run(&["get", "/a"]).unwrap();
        fixture.run(&["get", "/a/title"]).unwrap();
        fixture.run(&["--format", "json", "get", "/a"]).unwrap();
        fixture.run(&["tree", "--properties"]).unwrap();
        fixture.run(&["--format", "json", "tree"]).unwrap();
        assert!(fixture.run(&["get", "/missing"]).is_err());
    }

    #[test]
    fn namespaces_are_persisted() {
        let fixture = Fixture::new();
        fixture
            .run(&["namespace", "register", "cms", "http://example.org/cms"])
            .unwrap();
        fixture.run(&["namespace", "list"]).unwrap();
        assert_eq!(
            fixture.session().namespace_registry().uri("cms").unwrap(),
            "http://example.org/cms"
        );
        assert!(fixture.run(&["namespace", "register", "jcr", "http://x"]).is_err());

        fixture.run(&["namespace", "unregister", "cms"]).unwrap();
        assert!(!fixture.session().namespace_registry().has_prefix("cms"));
    }

    #[test]
    fn export_to_file() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "content"]).unwrap();
        let out = fixture._dir.path().join("export.xml");
        let out_text = out.display().to_string();
        fixture.run(&["export", "/", "-o", out_text.as_str()]).unwrap();
        let xml = fs::read_to_string(&out).unwrap();
        assert!(xml.contains(r#"sv:name="content""#));

        fixture
            .run(&["export", "/content", "--document", "-o", out_text.as_str()])
            .unwrap();
        let xml = fs::read_to_string(&out).unwrap();
        assert!(xml.contains("<content "));
    }

    #[test]
    fn snapshot_survives_reload() {
        let fixture = Fixture::new();
        fixture.run(&["add-node", "/", "a"]).unwrap();
        let backend = InMemoryBackend::load_from(Path::new(&fixture.store)).unwrap();
        assert_eq!(backend.node_count(), 2);
    }
}
