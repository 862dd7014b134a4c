use ::image::codecs::jpeg::JpegEncoder;
use catalog::AssetLocation;
use printpdf::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::layout::{EndpointBand, ExportLayout, Geometry};
use crate::{ExportConfig, ExportError};

const TITLE_PT: f32 = 16.0;
const LABEL_PT: f32 = 9.0;
const ARROW_PT: f32 = 18.0;
/// Icons are downsampled to this many pixels on their longest side.
const MAX_ICON_PX: u32 = 480;

/// Characters Windows-1252 adds in 0x80..=0x9F. Builtin PDF fonts encode
/// text as WinAnsi, so these plus Latin-1 are all they can show.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// Characters in `text` that WinAnsi cannot encode, in order of appearance.
fn unencodable(text: &str) -> Vec<char> {
    text.chars()
        .filter(|&c| {
            let code = c as u32;
            let latin1 = matches!(code, 0x20..=0x7E | 0xA0..=0xFF) || c == '\t';
            !latin1 && !WIN_ANSI_EXTRAS.contains(c)
        })
        .collect()
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    builtin: bool,
}

impl Fonts {
    /// Embeds the configured TrueType font for both weights, or falls back
    /// to builtin Helvetica when none is set.
    fn load(doc: &PdfDocumentReference, font_path: Option<&Path>) -> Result<Self, ExportError> {
        if let Some(path) = font_path {
            let file = File::open(path)?;
            let font = doc
                .add_external_font(BufReader::new(file))
                .map_err(|e| ExportError::Pdf(format!("{}: {e}", path.display())))?;
            debug!(path = %path.display(), "embedded label font");
            return Ok(Self {
                regular: font.clone(),
                bold: font,
                builtin: false,
            });
        }
        Ok(Self {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| ExportError::Pdf(e.to_string()))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| ExportError::Pdf(e.to_string()))?,
            builtin: true,
        })
    }

    fn text(&self, layer: &PdfLayerReference, text: &str, pt: f32, x: f32, y: f32, bold: bool) {
        if self.builtin {
            let lost = unencodable(text);
            if !lost.is_empty() {
                let lost: String = lost.into_iter().collect();
                warn!(label = text, %lost, "builtin font drops these characters, set export font_path");
            }
        }
        let font = if bold { &self.bold } else { &self.regular };
        layer.use_text(text, pt, Mm(x), Mm(y), font);
    }
}

/// Renders the layout onto a single page and writes the PDF to `out`.
pub fn write_pdf<W: Write>(
    layout: &ExportLayout,
    config: &ExportConfig,
    out: W,
) -> Result<(), ExportError> {
    let geometry = layout.geometry(config.page_size);
    let (doc, page, layer) = PdfDocument::new(
        layout.title.as_str(),
        Mm(geometry.page_w),
        Mm(geometry.page_h),
        "Layer 1",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let fonts = Fonts::load(&doc, config.font_path.as_deref())?;

    let (hx, hy) = geometry.header_origin();
    fonts.text(&layer, &layout.title, TITLE_PT, hx, geometry.page_h - hx, true);
    if let Some(band) = &layout.header {
        draw_band(&layer, &fonts, &geometry, band, (hx, hy), config.jpeg_quality);
    }

    for (column, rows) in layout.columns.iter().enumerate() {
        for (row, entries) in rows.iter().enumerate() {
            for (pos, entry) in entries.entries.iter().enumerate() {
                let second = pos > 0;
                let (x, y) = geometry.cell(column, row, second);
                draw_image(&layer, &entry.image, x, y, geometry.icon_size(), config.jpeg_quality);
                let (cx, cy) = geometry.caption(column, row, second);
                fonts.text(&layer, &entry.label, LABEL_PT * geometry.scale, cx, cy, false);
                fonts.text(
                    &layer,
                    entry.file_key.as_str(),
                    LABEL_PT * 0.8 * geometry.scale,
                    cx,
                    cy - 0.45 * LABEL_PT * geometry.scale,
                    false,
                );
            }
            if entries.entries.len() > 1 {
                let (ax, ay) = geometry.arrow(column, row);
                fonts.text(&layer, "->", ARROW_PT * geometry.scale, ax, ay, true);
            }
        }
    }

    if let Some(band) = &layout.footer {
        draw_band(&layer, &fonts, &geometry, band, geometry.footer_origin(), config.jpeg_quality);
    }

    let mut writer = BufWriter::new(out);
    doc.save(&mut writer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(())
}

fn draw_band(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    geometry: &Geometry,
    band: &EndpointBand,
    (x, y): (f32, f32),
    quality: u8,
) {
    let size = geometry.band_icon_size();
    let text_x = match &band.image {
        Some(location) => {
            draw_image(layer, location, x, y, size, quality);
            x + size + 4.0
        }
        None => x,
    };
    fonts.text(layer, &band.text, LABEL_PT * 1.2, text_x, y + size / 2.0, false);
}

/// Embeds the icon scaled into a `size` mm square. A missing or unreadable
/// image leaves an empty frame in its place.
fn draw_image(layer: &PdfLayerReference, location: &AssetLocation, x: f32, y: f32, size: f32, quality: u8) {
    let loaded = match location.as_path() {
        Some(path) => load_icon(path, quality),
        None => {
            warn!(%location, "remote image not embedded");
            None
        }
    };
    let Some((width, height, jpeg)) = loaded else {
        draw_frame(layer, x, y, size);
        return;
    };

    let longest = width.max(height) as f32;
    let dpi = longest / (size / 25.4);
    let image = Image::from(ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: jpeg,
        image_filter: Some(ImageFilter::DCT),
        clipping_bbox: None,
        smask: None,
    });
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

/// Decodes an icon, downsamples it and re-encodes it as JPEG.
fn load_icon(path: &Path, quality: u8) -> Option<(u32, u32, Vec<u8>)> {
    let decoded = match ::image::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image missing, drawing empty frame");
            return None;
        }
    };
    let img = if decoded.width().max(decoded.height()) > MAX_ICON_PX {
        decoded.thumbnail(MAX_ICON_PX, MAX_ICON_PX)
    } else {
        decoded
    };
    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    if let Err(e) = JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&rgb) {
        warn!(path = %path.display(), error = %e, "jpeg encoding failed");
        return None;
    }
    debug!(path = %path.display(), bytes = jpeg.len(), "icon embedded");
    Some((rgb.width(), rgb.height(), jpeg))
}

fn draw_frame(layer: &PdfLayerReference, x: f32, y: f32, size: f32) {
    layer.set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
    layer.set_outline_thickness(0.5);
    let points = vec![
        (Point::new(Mm(x), Mm(y)), false),
        (Point::new(Mm(x + size), Mm(y)), false),
        (Point::new(Mm(x + size), Mm(y + size)), false),
        (Point::new(Mm(x), Mm(y + size)), false),
    ];
    layer.add_line(Line {
        points,
        is_closed: true,
    });
}
