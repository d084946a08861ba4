use super::geometry::Geometry;
use super::types::{Connection, LaidOutNode, LayoutResult, NodeId};
use crate::theme::Theme;

/// Resolved colors and text metrics for drawing a laid-out map.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub background: String,
    pub node_fill: String,
    pub node_stroke: String,
    pub node_text: String,
    pub accent_fill: String,
    pub accent_text: String,
    pub connector: String,
    pub selection: String,
    pub font_family: String,
    pub font_size: f32,
    pub corner_radius: f32,
    pub chars_per_line: usize,
    pub line_height: f32,
    pub text_inset: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::new(&Theme::default(), &Geometry::default())
    }
}

impl RenderStyle {
    pub fn new(theme: &Theme, geometry: &Geometry) -> Self {
        let node_text = readable_on(
            &theme.node_fill_color,
            &theme.text_color,
            &theme.background_color,
        );
        let accent_text = readable_on(
            &theme.accent_color,
            &theme.text_color,
            &theme.background_color,
        );

        Self {
            background: theme.background_color.clone(),
            node_fill: theme.node_fill_color.clone(),
            node_stroke: theme.node_stroke_color.clone(),
            node_text,
            accent_fill: theme.accent_color.clone(),
            accent_text,
            connector: theme.connector_color.clone(),
            selection: theme.selection_color.clone(),
            font_family: theme.font_family.clone(),
            font_size: theme.font_size,
            corner_radius: theme.corner_radius,
            chars_per_line: geometry.chars_per_line,
            line_height: geometry.line_height,
            text_inset: geometry.node_vertical_padding / 2.0,
        }
    }
}

/// An sRGB color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb([f32; 3]);

impl Rgb {
    /// Parses `#rrggbb`. Other CSS color syntaxes yield `None`.
    fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').filter(|h| h.len() == 6)?;
        let mut channels = [0.0; 3];
        for (i, channel) in channels.iter_mut().enumerate() {
            let byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
            *channel = f32::from(byte) / 255.0;
        }
        Some(Self(channels))
    }

    /// WCAG relative luminance.
    fn luminance(self) -> f32 {
        let [r, g, b] = self.0.map(|c| {
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        });
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    fn contrast(self, other: Rgb) -> f32 {
        let (a, b) = (self.luminance(), other.luminance());
        (a.max(b) + 0.05) / (a.min(b) + 0.05)
    }
}

/// Whichever of `preferred` and `alternative` reads better on `background`.
/// Ties and unparseable colors keep `preferred`.
fn readable_on(background: &str, preferred: &str, alternative: &str) -> String {
    let ratio = |fg: &str| {
        Rgb::from_hex(background)
            .zip(Rgb::from_hex(fg))
            .map_or(0.0, |(bg, fg)| bg.contrast(fg))
    };
    if ratio(alternative) > ratio(preferred) {
        alternative.to_string()
    } else {
        preferred.to_string()
    }
}

/// Escapes text for SVG, dropping characters XML 1.0 cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(' '),
            c if (c as u32) < 0x20 || matches!(c as u32, 0xFFFE | 0xFFFF) => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Breaks text into lines of at most `width` characters, preferring word
/// boundaries. Words longer than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_len = 0;
        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                lines.push(chars.drain(..width).collect());
            }
            let word_len = chars.len();
            if word_len == 0 {
                continue;
            }
            let needed = if line_len == 0 { word_len } else { line_len + 1 + word_len };
            if needed > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(chars);
            line_len += word_len;
        }
        if line_len > 0 {
            lines.push(line);
        }
    }
    lines
}

/// Renders a layout (normally a reconciled one) to SVG elements.
///
/// Returns the inner markup together with the canvas width and height; the
/// caller wraps it in an `<svg>` element.
pub fn render_svg(
    layout: &LayoutResult,
    style: &RenderStyle,
    selected: Option<&NodeId>,
) -> (String, f32, f32) {
    let mut svg = String::new();

    // Draw connectors first (behind nodes)
    svg.push_str(r#"<g class="connectors">"#);
    for connection in &layout.connections {
        svg.push_str(&render_connection(connection, style));
    }
    svg.push_str("</g>");

    svg.push_str(r#"<g class="nodes">"#);
    for node in &layout.nodes {
        let is_selected = selected == Some(&node.id);
        svg.push_str(&render_node(node, style, is_selected));
    }
    svg.push_str("</g>");

    (svg, layout.canvas_width, layout.canvas_height)
}

fn render_connection(connection: &Connection, style: &RenderStyle) -> String {
    let (from, to) = (connection.from, connection.to);
    let control = (to.x - from.x).abs() * 0.5;
    format!(
        r#"<path d="M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}" fill="none" stroke="{}" stroke-width="2" />"#,
        from.x, from.y,
        from.x + control, from.y,
        to.x - control, to.y,
        to.x, to.y,
        style.connector
    )
}

fn render_node(node: &LaidOutNode, style: &RenderStyle, selected: bool) -> String {
    let mut svg = String::new();

    let (fill, text_color) = match node.color.as_deref() {
        Some(color) if Rgb::from_hex(color).is_some() => (
            color.to_string(),
            readable_on(color, &style.node_text, &style.background),
        ),
        Some(_) => (style.accent_fill.clone(), style.accent_text.clone()),
        None => (style.node_fill.clone(), style.node_text.clone()),
    };
    let (stroke, stroke_width) = if selected {
        (style.selection.as_str(), 3.0)
    } else {
        (style.node_stroke.as_str(), 1.5)
    };
    let dash = if node.is_new {
        r#" stroke-dasharray="6,3""#
    } else {
        ""
    };

    svg.push_str(&format!(r#"<g id="node-{}">"#, escape_xml(node.id.as_str())));
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" stroke="{}" stroke-width="{:.1}"{} />"#,
        node.x, node.y, node.width, node.height, style.corner_radius,
        fill, stroke, stroke_width, dash
    ));

    let text_x = node.x + style.corner_radius + 4.0;
    let mut baseline = node.y + style.text_inset + style.line_height;
    for line in wrap_text(&node.text, style.chars_per_line) {
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}">{}</text>"#,
            text_x,
            baseline,
            escape_xml(&style.font_family),
            style.font_size,
            text_color,
            escape_xml(&line)
        ));
        baseline += style.line_height;
    }

    svg.push_str("</g>");
    svg
}
