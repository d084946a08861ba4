use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mindbloom::config::Config;
use mindbloom::mindmap::{LayoutEngine, MindMap, Node, NodeId, Outcome, RenderStyle, export, render_svg};
use mindbloom::session::Session;
use mindbloom::store::MapStore;
use mindbloom::suggest::SuggestClient;
use mindbloom::theme::Theme;
use mindbloom::{logging, output};

/// Mind maps from the command line
#[derive(Parser, Debug)]
#[command(name = "mindbloom")]
#[command(version)]
#[command(about = "Create, edit, lay out and render mind maps", long_about = None)]
struct Cli {
    /// Config file (TOML or YAML); defaults to $MINDBLOOM_HOME/config.toml
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Act on this map instead of the active one
    #[arg(short, long, global = true, value_name = "MAP_ID")]
    map: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a map and make it active
    New {
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List stored maps, most recent first
    List,
    /// Make a stored map the active one
    Open { map_id: String },
    /// Print the active map as an outline with node ids
    Show {
        /// Print the stored JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Add a child node
    Add {
        /// Parent node id; defaults to the selected node
        #[arg(short, long)]
        parent: Option<String>,
        /// Node text
        #[arg(default_value = mindbloom::session::NEW_IDEA_TEXT)]
        text: String,
    },
    /// Change a node's text
    Rename { node_id: String, text: String },
    /// Delete a node and everything below it
    Delete { node_id: String },
    /// Move a node by a delta, pinning it at its new position
    Move {
        node_id: String,
        #[arg(allow_hyphen_values = true, value_parser = parse_delta)]
        dx: f32,
        #[arg(allow_hyphen_values = true, value_parser = parse_delta)]
        dy: f32,
    },
    /// Drop a node's manual position
    Reset { node_id: String },
    /// Set the map title
    Title { title: String },
    /// Export the map as a Markdown outline
    Export {
        /// Output path ("-" for stdout); defaults to a name derived from the title
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render the map to SVG, PNG or PDF
    Render {
        /// Output file path (extension determines format: .svg, .png or .pdf)
        #[arg(short, long)]
        output: PathBuf,
        /// Built-in theme name or theme file (TOML or YAML)
        #[arg(short, long)]
        theme: Option<String>,
        /// Raster scale multiplier for PNG output
        #[arg(long, default_value_t = 1.0)]
        png_scale: f32,
        /// Padding around the map in pixels
        #[arg(long, default_value_t = 20.0)]
        padding: f32,
    },
    /// Ask the suggestion service for child ideas
    Suggest {
        /// Node to expand; defaults to the selected node
        node_id: Option<String>,
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Add the suggestions to the map
        #[arg(long)]
        accept: bool,
    },
    /// Delete a stored map
    Remove { map_id: String },
    /// Print shell completions
    Completions { shell: Shell },
}

/// A finite offset in layout units. NaN and infinities would be stored as
/// `null` and lost on the next load.
fn parse_delta(value: &str) -> Result<f32, String> {
    let delta: f32 = value
        .parse()
        .map_err(|e| format!("invalid number '{}': {}", value, e))?;
    if delta.is_finite() {
        Ok(delta)
    } else {
        Err(format!("offset must be a finite number, got '{}'", value))
    }
}

struct App {
    config: Config,
    store: MapStore,
    engine: LayoutEngine,
    map_id: Option<String>,
}

impl App {
    fn load_session(&self) -> Result<Session, String> {
        let map = match &self.map_id {
            Some(id) => self
                .store
                .find_map(id)
                .ok_or_else(|| format!("No mind map with id '{}'", id))?,
            None => self
                .store
                .load_active()
                .ok_or("No mind maps yet; create one with `mindbloom new`")?,
        };
        Ok(Session::new(map, self.engine.clone()))
    }

    fn save(&self, session: &Session) -> Result<(), String> {
        self.store.save_map(session.map())?;
        Ok(())
    }

    /// Loads the map, applies `edit`, and saves the map if it changed.
    fn edit(&self, edit: impl FnOnce(&mut Session) -> Result<(), String>) -> Result<Session, String> {
        let mut session = self.load_session()?;
        edit(&mut session)?;
        self.save(&session)?;
        Ok(session)
    }
}

fn check(outcome: Outcome, node_id: &NodeId) -> Result<(), String> {
    match outcome {
        Outcome::Applied => Ok(()),
        Outcome::NotFound => Err(format!("No node with id '{}'", node_id)),
        Outcome::RootProtected => Err("The root node cannot be deleted".to_string()),
    }
}

fn target_or_selected(session: &Session, id: Option<String>) -> NodeId {
    id.map(NodeId::new)
        .or_else(|| session.selected().cloned())
        .unwrap_or_else(|| session.map().root.id.clone())
}

fn print_outline(out: &mut impl std::io::Write, node: &Node, depth: usize, selected: Option<&NodeId>) -> std::io::Result<()> {
    let marker = if selected == Some(&node.id) { "*" } else { " " };
    write!(out, "{}{}{} [{}]", marker, "  ".repeat(depth), node.text, node.id)?;
    if let Some((x, y)) = node.manual_position() {
        write!(out, " @ ({:.0}, {:.0})", x, y)?;
    }
    writeln!(out)?;
    for child in &node.children {
        print_outline(out, child, depth + 1, selected)?;
    }
    Ok(())
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "mindbloom", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::resolve(cli.config.as_deref())?;
    let app = App {
        store: MapStore::new(config.store_dir()),
        engine: LayoutEngine::new(config.geometry.clone())?,
        config,
        map_id: cli.map,
    };

    match cli.command {
        Command::New { title } => {
            let mut map = MindMap::new();
            if let Some(title) = title {
                map.title = title;
            }
            app.store.save_map(&map)?;
            app.store.set_active_id(Some(map.id.as_str()))?;
            println!("{}", map.id);
            eprintln!("Created \"{}\"", map.title);
        }
        Command::List => {
            let active = app.store.active_id();
            let mut stdout = std::io::stdout().lock();
            for map in app.store.load_collection() {
                let marker = if active.as_deref() == Some(map.id.as_str()) { "*" } else { " " };
                writeln!(stdout, "{} {}  {} ({} nodes)", marker, map.id, map.title, map.root.node_count())
                    .map_err(|e| format!("Failed to write to stdout: {}", e))?;
            }
        }
        Command::Open { map_id } => {
            let map = app
                .store
                .find_map(&map_id)
                .ok_or_else(|| format!("No mind map with id '{}'", map_id))?;
            app.store.set_active_id(Some(map.id.as_str()))?;
            eprintln!("Active map: \"{}\"", map.title);
        }
        Command::Show { json } => {
            let session = app.load_session()?;
            if json {
                let text = serde_json::to_string_pretty(session.map())
                    .map_err(|e| format!("Failed to serialize map: {}", e))?;
                println!("{}", text);
            } else {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", session.map().title)
                    .and_then(|_| print_outline(&mut stdout, &session.map().root, 0, session.selected()))
                    .map_err(|e| format!("Failed to write to stdout: {}", e))?;
            }
        }
        Command::Add { parent, text } => {
            let session = app.edit(|session| {
                let parent = target_or_selected(session, parent);
                check(session.add_child(&parent), &parent)?;
                let id = session.selected().cloned().ok_or("New node was not selected")?;
                if text != mindbloom::session::NEW_IDEA_TEXT {
                    check(session.finish_editing(&id, &text), &id)?;
                }
                Ok(())
            })?;
            if let Some(id) = session.selected() {
                println!("{}", id);
            }
        }
        Command::Rename { node_id, text } => {
            let id = NodeId::new(node_id);
            app.edit(|session| check(session.finish_editing(&id, &text), &id))?;
        }
        Command::Delete { node_id } => {
            let id = NodeId::new(node_id);
            app.edit(|session| check(session.delete_node(&id), &id))?;
        }
        Command::Move { node_id, dx, dy } => {
            let id = NodeId::new(node_id);
            let session = app.edit(|session| check(session.drag_node(&id, dx, dy), &id))?;
            if let Some((x, y)) = session.display().effective_position(&id) {
                eprintln!("Moved to ({:.0}, {:.0})", x, y);
            }
        }
        Command::Reset { node_id } => {
            let id = NodeId::new(node_id);
            app.edit(|session| check(session.reset_position(&id), &id))?;
        }
        Command::Title { title } => {
            app.edit(|session| {
                session.set_title(title);
                Ok(())
            })?;
        }
        Command::Export { output } => {
            let session = app.load_session()?;
            let markdown = export::to_markdown(session.map());
            let path = output.unwrap_or_else(|| PathBuf::from(export::file_name(&session.map().title)));
            if path == Path::new("-") {
                print!("{}", markdown);
            } else {
                std::fs::write(&path, markdown)
                    .map_err(|e| format!("Failed to write Markdown: {}", e))?;
                eprintln!("Markdown saved to: {}", path.display());
            }
        }
        Command::Render {
            output,
            theme,
            png_scale,
            padding,
        } => {
            let session = app.load_session()?;
            let theme = match theme {
                Some(name_or_path) => Theme::load(&name_or_path)?,
                None => app.config.theme.clone(),
            };
            let style = RenderStyle::new(&theme, app.engine.geometry());
            let layout = session.display();
            let (inner, width, height) = render_svg(&layout, &style, session.selected());
            let svg = output::wrap_document(&inner, width, height, padding, &style.background);
            let format = output::write(&output, &svg, png_scale)?;
            eprintln!("{} saved to: {}", format.name(), output.display());
        }
        Command::Suggest {
            node_id,
            count,
            accept,
        } => {
            let mut session = app.load_session()?;
            let target = target_or_selected(&session, node_id);
            let count = count.unwrap_or(app.config.suggest.suggestions);
            let request = session
                .suggest_request(&target, count)
                .ok_or_else(|| format!("No node with id '{}'", target))?;
            let client = SuggestClient::from_env(app.config.suggest.clone())?;
            let suggestions = client.suggest(&request)?;
            if suggestions.is_empty() {
                eprintln!("No suggestions returned");
                return Ok(());
            }
            for suggestion in &suggestions {
                println!("{}", suggestion);
            }
            if accept {
                for suggestion in &suggestions {
                    check(session.accept_suggestion(&target, suggestion), &target)?;
                }
                app.save(&session)?;
                eprintln!("Added {} nodes under \"{}\"", suggestions.len(), request.parent_node_text);
            }
        }
        Command::Remove { map_id } => {
            if app.store.find_map(&map_id).is_none() {
                return Err(format!("No mind map with id '{}'", map_id));
            }
            app.store.delete_map(&map_id)?;
            eprintln!("Removed {}", map_id);
        }
        Command::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_offsets_must_be_finite() {
        assert_eq!(parse_delta("-20"), Ok(-20.0));
        assert_eq!(parse_delta("12.5"), Ok(12.5));
        assert!(parse_delta("NaN").is_err());
        assert!(parse_delta("inf").is_err());
        assert!(parse_delta("-infinity").is_err());
        assert!(parse_delta("abc").is_err());

        assert!(Cli::try_parse_from(["mindbloom", "move", "b", "NaN", "1"]).is_err());
        let cli = Cli::try_parse_from(["mindbloom", "move", "b", "40", "-20"]).unwrap();
        assert!(matches!(cli.command, Command::Move { dx, dy, .. } if dx == 40.0 && dy == -20.0));
    }
}
