//! Reference host for the Flux interpreter: runs a JSON command file and
//! prints the rendered scene as an indented text tree.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::future::{self, BoxFuture};
use flux::{
    Clock, Command, Directive, HostConfig, Interpreter, PersistenceBackend, PersistenceError,
    Value,
};
use flux_scene::{NodeId, NodeKind, Scene};

#[derive(Parser)]
#[command(name = "flux")]
#[command(about = "Flux command interpreter CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command file and print the rendered scene
    Run {
        /// Path to a JSON file holding a command list
        file: PathBuf,
        /// Directory for file-backed persistence (enables store/load)
        #[arg(long)]
        state: Option<PathBuf>,
        /// User id for persistence (defaults to "local" when --state is set)
        #[arg(long)]
        user: Option<String>,
        /// Print hidden nodes too
        #[arg(long)]
        show_hidden: bool,
        /// Print the final state store as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Check that a command file parses correctly
    Check {
        file: PathBuf,
    },
    /// Evaluate an inline JSON command list
    Eval {
        json: String,
        #[arg(long)]
        show_hidden: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, state, user, show_hidden, dump_state } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let commands: Vec<Command> = serde_json::from_str(&source)
                .with_context(|| format!("parsing {}", file.display()))?;
            run_commands(commands, state, user, show_hidden, dump_state).await
        }
        Commands::Check { file } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let commands: Vec<Command> = serde_json::from_str(&source)
                .with_context(|| format!("parsing {}", file.display()))?;
            check_commands(&commands)
        }
        Commands::Eval { json, show_hidden } => {
            let commands: Vec<Command> =
                serde_json::from_str(&json).context("parsing inline command list")?;
            run_commands(commands, None, None, show_hidden, false).await
        }
    }
}

async fn run_commands(
    commands: Vec<Command>,
    state_dir: Option<PathBuf>,
    user: Option<String>,
    show_hidden: bool,
    dump_state: bool,
) -> anyhow::Result<()> {
    let backend = state_dir
        .map(|dir| Arc::new(FileStorage::new(dir)) as Arc<dyn PersistenceBackend>);
    let user_id = user.or_else(|| backend.as_ref().map(|_| "local".to_string()));

    let mut interpreter = Interpreter::new(HostConfig {
        user_id,
        backend,
        clock: Arc::new(TokioClock),
        ..HostConfig::default()
    });
    log::debug!("executing {} top-level commands", commands.len());
    interpreter.run(commands).await;

    print!("{}", render_scene(interpreter.scene(), interpreter.root(), show_hidden));
    if dump_state {
        println!("{}", serde_json::to_string_pretty(&interpreter.state().to_json())?);
    }
    Ok(())
}

fn check_commands(commands: &[Command]) -> anyhow::Result<()> {
    let mut total = 0;
    let mut unknown = Vec::new();
    scan_commands(commands, &mut total, &mut unknown);

    println!("{total} commands");
    if unknown.is_empty() {
        println!("all command types recognized");
    } else {
        for kind in &unknown {
            println!("unknown command type: {kind}");
        }
    }
    Ok(())
}

fn scan_commands(commands: &[Command], total: &mut usize, unknown: &mut Vec<String>) {
    for command in commands {
        *total += 1;
        if let Directive::Unrecognized { kind } = Directive::parse(command) {
            unknown.push(kind);
        }
        scan_commands(&command.commands, total, unknown);
        scan_commands(&command.commands_prop("onClick"), total, unknown);
    }
}

/// Wall-clock timer for `wait` commands.
struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// File-backed persistence: one JSON document per user under
/// `<base>/flux-data/`.
struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn document_path(&self, user_id: &str) -> PathBuf {
        self.base_path
            .join(flux::COLLECTION)
            .join(format!("{user_id}.json"))
    }

    fn read_document(&self, user_id: &str) -> Result<serde_json::Map<String, serde_json::Value>, PersistenceError> {
        let path = self.document_path(user_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(error) => return Err(error.into()),
        };
        match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(PersistenceError::Corrupt {
                user: user_id.to_string(),
                reason: "document is not a JSON object".to_string(),
            }),
            Err(error) => Err(PersistenceError::Corrupt {
                user: user_id.to_string(),
                reason: error.to_string(),
            }),
        }
    }
}

impl PersistenceBackend for FileStorage {
    fn store_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<(), PersistenceError>> {
        let result = (|| {
            let mut fields = self.read_document(user_id)?;
            fields.insert(field.to_string(), serde_json::Value::from(value));
            let path = self.document_path(user_id);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let text = serde_json::to_string_pretty(&serde_json::Value::Object(fields))
                .map_err(|error| PersistenceError::Corrupt {
                    user: user_id.to_string(),
                    reason: error.to_string(),
                })?;
            fs::write(&path, text)?;
            Ok(())
        })();
        Box::pin(future::ready(result))
    }

    fn load_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, PersistenceError>> {
        let result = self
            .read_document(user_id)
            .map(|fields| fields.get(field).cloned().map(Value::from));
        Box::pin(future::ready(result))
    }
}

fn render_scene(scene: &Scene, root: NodeId, show_hidden: bool) -> String {
    let mut out = String::new();
    render_node(scene, root, 0, show_hidden, &mut out);
    out
}

fn render_node(scene: &Scene, id: NodeId, depth: usize, show_hidden: bool, out: &mut String) {
    let node = scene.node(id);
    if node.hidden && !show_hidden {
        return;
    }

    let mut line = format!("{}{}", "  ".repeat(depth), describe(&node.kind));
    if let Some(element_id) = &node.element_id {
        line.push_str(&format!(" #{element_id}"));
    }
    if node.hidden {
        line.push_str(" [hidden]");
    }
    out.push_str(&line);
    out.push('\n');

    if let NodeKind::List { items, ordered, .. } = &node.kind {
        for (index, item) in items.iter().enumerate() {
            let marker = if *ordered {
                format!("{}.", index + 1)
            } else {
                "-".to_string()
            };
            out.push_str(&format!("{}{marker} {item}\n", "  ".repeat(depth + 1)));
        }
    }
    if let NodeKind::Table { headers, rows } = &node.kind {
        out.push_str(&format!("{}| {} |\n", "  ".repeat(depth + 1), headers.join(" | ")));
        for row in rows {
            out.push_str(&format!("{}| {} |\n", "  ".repeat(depth + 1), row.join(" | ")));
        }
    }

    for child in &node.children {
        render_node(scene, *child, depth + 1, show_hidden, out);
    }
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Region { name } => format!("[{name}]"),
        NodeKind::Heading { text, level } => format!("h{level} \"{text}\""),
        NodeKind::Paragraph { text } => format!("paragraph \"{text}\""),
        NodeKind::Badge { text, color } => format!("badge({color}) \"{text}\""),
        NodeKind::Divider => "----".to_string(),
        NodeKind::Alert { severity, text } => format!("alert({}) \"{text}\"", severity.class()),
        NodeKind::Card { title, text } => format!("card \"{title}\" \"{text}\""),
        NodeKind::List { title, ordered, items } => format!(
            "list \"{title}\" ({}, {} items)",
            if *ordered { "numbered" } else { "bulleted" },
            items.len()
        ),
        NodeKind::Table { headers, rows } => {
            format!("table ({} columns, {} rows)", headers.len(), rows.len())
        }
        NodeKind::Button { label, busy, disabled } => {
            let mut text = format!("button \"{label}\"");
            if *busy {
                text.push_str(" [busy]");
            }
            if *disabled {
                text.push_str(" [disabled]");
            }
            text
        }
        NodeKind::Link { label, url } => match url {
            Some(url) => format!("link \"{label}\" -> {url}"),
            None => format!("link \"{label}\""),
        },
        NodeKind::Frame { url } => format!("frame {url}"),
        NodeKind::Progress { percent } => format!("progress {percent}%"),
        NodeKind::CircularProgress { percent, .. } => format!("circular-progress {percent}%"),
        NodeKind::Input { placeholder, value } => {
            format!("input \"{placeholder}\" = \"{value}\"")
        }
        NodeKind::Textarea { placeholder, value, .. } => {
            format!("textarea \"{placeholder}\" = \"{value}\"")
        }
        NodeKind::Toggle { label, on } => {
            format!("toggle \"{label}\" {}", if *on { "on" } else { "off" })
        }
        NodeKind::RadioGroup { name, options, selected } => format!(
            "radio-group \"{name}\" ({} options, selected: {})",
            options.len(),
            selected.as_deref().unwrap_or("none")
        ),
        NodeKind::CheckboxGroup { name, options, checked } => format!(
            "checkbox-group \"{name}\" ({} options, {} checked)",
            options.len(),
            checked.len()
        ),
        NodeKind::Dropdown { name, options, selected } => format!(
            "dropdown \"{name}\" ({} options, selected: {})",
            options.len(),
            selected.as_deref().unwrap_or("none")
        ),
        NodeKind::Overlay { title, text } => format!("overlay \"{title}\" \"{text}\""),
        NodeKind::Carousel { images, active } => {
            format!("carousel (slide {}/{})", active + 1, images.len().max(1))
        }
        NodeKind::Chart(spec) => {
            format!("chart {} ({} points)", spec.kind, spec.values.len())
        }
    }
}
