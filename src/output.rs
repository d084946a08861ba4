//! Turning rendered SVG into files: standalone SVG documents, PNG through
//! resvg, PDF through svg2pdf.

use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

const LOCAL_FONTS_DIR: &str = "fonts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Svg,
    Png,
    Pdf,
}

impl Format {
    /// Picks the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or("Output file has no extension")?
            .to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            _ => Err(format!(
                "Unsupported output format: .{} (use .svg, .png or .pdf)",
                ext
            )),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Svg => "SVG",
            Self::Png => "PNG",
            Self::Pdf => "PDF",
        }
    }
}

/// Wraps inner SVG markup in a document of the given content size, with
/// `padding` on every side and a solid background.
pub fn wrap_document(inner: &str, width: f32, height: f32, padding: f32, background: &str) -> String {
    let total_w = width + padding * 2.0;
    let total_h = height + padding * 2.0;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{total_w}" height="{total_h}" viewBox="0 0 {total_w} {total_h}">
<rect width="{total_w}" height="{total_h}" fill="{background}"/>
<g transform="translate({padding},{padding})">
{inner}
</g>
</svg>"#
    )
}

/// Encodes `svg` in the format implied by `path` and writes it there.
pub fn write(path: &Path, svg: &str, png_scale: f32) -> Result<Format, String> {
    let format = Format::from_path(path)?;
    let bytes = match format {
        Format::Svg => svg.as_bytes().to_vec(),
        Format::Png => svg_to_png(svg, png_scale)?,
        Format::Pdf => svg_to_pdf(svg)?,
    };
    std::fs::write(path, bytes).map_err(|e| format!("Failed to write {}: {}", format.name(), e))?;
    tracing::info!(path = %path.display(), format = format.name(), "wrote output");
    Ok(format)
}

pub fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, String> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("Invalid --png-scale value: {}", scale));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();
        let local_fonts = Path::new(LOCAL_FONTS_DIR);
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        let fallbacks = FontFallbacks::pick(
            fontdb.faces().flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
        );
        if let Some(family) = &fallbacks.sans {
            fontdb.set_sans_serif_family(family);
        }
        if let Some(family) = &fallbacks.serif {
            fontdb.set_serif_family(family);
        }
        if let Some(family) = &fallbacks.mono {
            fontdb.set_monospace_family(family);
        }
    }

    let tree =
        usvg::Tree::from_str(svg, &opts).map_err(|e| format!("Failed to parse SVG: {}", e))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or("Failed to create pixmap")?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| format!("Failed to encode PNG: {}", e))
}

pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, String> {
    use svg2pdf::usvg::fontdb;

    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();
    let local_fonts = Path::new(LOCAL_FONTS_DIR);
    if local_fonts.is_dir() {
        fontdb.load_fonts_dir(local_fonts);
    }

    // svg2pdf carries its own usvg, so its font database is a distinct type.
    let fallbacks = FontFallbacks::pick(
        fontdb.faces().flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = &fallbacks.sans {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = &fallbacks.serif {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = &fallbacks.mono {
        fontdb.set_monospace_family(family);
    }

    let opts = svg2pdf::usvg::Options {
        fontdb: std::sync::Arc::new(fontdb),
        ..Default::default()
    };
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| format!("Failed to parse SVG: {}", e))?;

    // Text as paths; viewers without the font still show node labels.
    let options = svg2pdf::ConversionOptions {
        embed_text: false,
        ..Default::default()
    };
    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default())
        .map_err(|e| format!("Failed to convert SVG to PDF: {}", e))
}

/// Installed families to use for the generic `sans-serif`, `serif` and
/// `monospace` names.
#[derive(Debug, Default, PartialEq)]
struct FontFallbacks {
    sans: Option<String>,
    serif: Option<String>,
    mono: Option<String>,
}

impl FontFallbacks {
    fn pick<'a>(families: impl IntoIterator<Item = &'a str>) -> Self {
        let mut first: Option<&str> = None;
        let mut sans: Option<&str> = None;
        let mut serif: Option<&str> = None;
        let mut mono: Option<&str> = None;

        for family in families {
            if first.is_none() {
                first = Some(family);
            }
            let lower = family.to_ascii_lowercase();
            if sans.is_none() && lower.contains("sans") {
                sans = Some(family);
            }
            if serif.is_none() && lower.contains("serif") && !lower.contains("sans") {
                serif = Some(family);
            }
            if mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
                mono = Some(family);
            }
        }

        Self {
            sans: sans.or(first).map(str::to_string),
            serif: serif.or(sans).or(first).map(str::to_string),
            mono: mono.or(sans).or(first).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="8" viewBox="0 0 10 8"><rect width="10" height="8" fill="#ff0000"/></svg>"##;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("map.SVG")).unwrap(), Format::Svg);
        assert_eq!(Format::from_path(Path::new("a/b.png")).unwrap(), Format::Png);
        assert_eq!(Format::from_path(Path::new("x.pdf")).unwrap(), Format::Pdf);
        assert!(Format::from_path(Path::new("noext")).is_err());
        assert!(Format::from_path(Path::new("x.gif")).unwrap_err().contains(".gif"));
    }

    #[test]
    fn document_is_padded() {
        let doc = wrap_document("<g/>", 100.0, 50.0, 20.0, "#fff");
        assert!(doc.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="140" height="90""#));
        assert!(doc.contains(r#"<g transform="translate(20,20)">"#));
        assert!(doc.contains(r##"fill="#fff""##));
    }

    #[test]
    fn png_is_scaled() {
        let png = svg_to_png(SQUARE, 2.0).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        // IHDR width and height, big-endian.
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 20);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 16);
        assert!(svg_to_png(SQUARE, 0.0).is_err());
    }

    #[test]
    fn pdf_has_header() {
        let pdf = svg_to_pdf(SQUARE).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn write_picks_encoder_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.svg");
        assert_eq!(write(&path, SQUARE, 1.0).unwrap(), Format::Svg);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SQUARE);
        assert!(write(&dir.path().join("map.txt"), SQUARE, 1.0).is_err());
    }

    #[test]
    fn fallbacks_prefer_named_families() {
        let picked = FontFallbacks::pick(["Noto Color Emoji", "DejaVu Sans", "DejaVu Serif", "Fira Code"]);
        assert_eq!(
            picked,
            FontFallbacks {
                sans: Some("DejaVu Sans".to_string()),
                serif: Some("DejaVu Serif".to_string()),
                mono: Some("Fira Code".to_string()),
            }
        );

        let only = FontFallbacks::pick(["Lato"]);
        assert_eq!(only.sans.as_deref(), Some("Lato"));
        assert_eq!(only.mono.as_deref(), Some("Lato"));
        assert_eq!(FontFallbacks::pick([]), FontFallbacks::default());
    }
}
