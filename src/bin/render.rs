use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mindbloom::config::Config;
use mindbloom::mindmap::{LayoutEngine, MindMap, Node, RenderStyle, layout_for_display, render_svg};
use mindbloom::store::from_json_str;
use mindbloom::theme::Theme;
use mindbloom::{logging, output};

/// Standalone mind map renderer (SVG/PNG/PDF)
#[derive(Parser, Debug)]
#[command(name = "mindbloom-render")]
#[command(version)]
#[command(about = "Render a mind map JSON file to SVG, PNG or PDF", long_about = None)]
struct Args {
    /// Input map or node tree as JSON (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .svg, .png or .pdf)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Built-in theme name or theme file (TOML or YAML)
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Config file providing geometry and the default theme
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Raster scale multiplier for PNG output
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// Padding around the map in pixels
    #[arg(long, default_value_t = 20.0)]
    padding: f32,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Accepts a stored map or just its root node.
fn parse_tree(source: &str) -> Result<(Arc<Node>, Option<mindbloom::mindmap::NodeId>), String> {
    if let Ok(map) = from_json_str::<MindMap>(source) {
        return Ok((map.root, map.selected_node_id));
    }
    let root: Node =
        from_json_str(source).map_err(|e| format!("Failed to parse mind map JSON: {}", e))?;
    Ok((Arc::new(root), None))
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let theme = match &args.theme {
        Some(name_or_path) => Theme::load(name_or_path)?,
        None => config.theme.clone(),
    };

    let source = if args.input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .map_err(|e| format!("Failed to read input file: {}", e))?
    };

    let (root, selected) = parse_tree(&source)?;
    let duplicates = root.duplicate_ids();
    if !duplicates.is_empty() {
        tracing::warn!(count = duplicates.len(), "tree has duplicate node ids; lookups use the first match");
    }

    let engine = LayoutEngine::new(config.geometry.clone())?;
    let layout = layout_for_display(&engine, &root);
    let style = RenderStyle::new(&theme, engine.geometry());
    let (inner_svg, width, height) = render_svg(&layout, &style, selected.as_ref());
    let svg = output::wrap_document(&inner_svg, width, height, args.padding, &style.background);

    let format = output::write(&args.output, &svg, args.png_scale)?;
    eprintln!("{} saved to: {}", format.name(), args.output.display());
    Ok(())
}
