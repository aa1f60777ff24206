use std::io::Cursor;
use std::path::{Path, PathBuf};

use kurbo::Size;

use crate::{
    error::{ChartError, ChartResult},
    scene::Scene,
    svg,
    viewport::{self, Viewport},
};

/// Filename used when the caller does not supply one.
pub const DEFAULT_FILENAME: &str = "fan-chart.png";

const MAX_DIM: u32 = 16_384;

#[derive(Clone, Debug)]
pub struct ExportedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Rasterize the scene into a PNG framed exactly like the live view.
///
/// The viewport is recomputed from the current content bounds with the same
/// calculator the on-screen path uses, so the exported image and the screen
/// agree pixel for pixel on framing. The raster gets a white background; the
/// scene itself is drawn with whatever opacities it currently holds.
pub fn export(scene: &Scene, container: Size) -> ChartResult<ExportedImage> {
    let content = scene.content_bounds().unwrap_or(kurbo::Rect::ZERO);
    let vp = viewport::compute_viewport(
        content,
        container,
        viewport::MIN_HEIGHT,
        viewport::MIN_PADDING,
    )?;
    export_with_viewport(scene, &vp)
}

pub fn export_with_viewport(scene: &Scene, vp: &Viewport) -> ChartResult<ExportedImage> {
    let width = raster_dim("width", vp.width)?;
    let height = raster_dim("height", vp.height)?;

    let svg_text = svg::document(scene, vp);
    let tree = usvg::Tree::from_data(svg_text.as_bytes(), &usvg::Options::default())
        .map_err(|e| ChartError::export(format!("parse scene svg: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ChartError::export("failed to allocate export pixmap"))?;
    pixmap.fill(resvg::tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );

    let mut rgba = pixmap.data().to_vec();
    unpremultiply_rgba8_in_place(&mut rgba);

    let rgba_image = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| ChartError::export("export pixel buffer length mismatch"))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(rgba_image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ChartError::export(format!("encode png: {e}")))?;

    Ok(ExportedImage { width, height, png })
}

/// Export and save under `dir`, with the default filename unless one is given.
pub fn export_to_file(
    scene: &Scene,
    container: Size,
    dir: &Path,
    filename: Option<&str>,
) -> ChartResult<PathBuf> {
    let image = export(scene, container)?;
    let path = dir.join(filename.unwrap_or(DEFAULT_FILENAME));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ChartError::export(format!("create '{}': {e}", parent.display())))?;
    }
    std::fs::write(&path, &image.png)
        .map_err(|e| ChartError::export(format!("write '{}': {e}", path.display())))?;
    Ok(path)
}

fn raster_dim(name: &str, v: f64) -> ChartResult<u32> {
    if !v.is_finite() || v < 1.0 {
        return Err(ChartError::export(format!("viewport {name} {v} is not rasterizable")));
    }
    let dim = v.ceil() as u32;
    if dim > MAX_DIM {
        return Err(ChartError::export(format!(
            "raster {name} {dim} exceeds maximum {MAX_DIM}"
        )));
    }
    Ok(dim)
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Configuration, person::{PersonId, PersonNode}, scene::build_scene};

    fn root_scene() -> Scene {
        build_scene(
            &Configuration::default(),
            &[PersonNode {
                id: PersonId(1),
                xref: "I1".to_string(),
                depth: 0,
                url: String::new(),
                update_url: String::new(),
                name: "Root".to_string(),
                timespan: "1900".to_string(),
            }],
        )
    }

    #[test]
    fn export_dimensions_match_the_computed_viewport() {
        let scene = root_scene();
        let image = export(&scene, Size::ZERO).unwrap();
        // The 170-wide disc plus padding; height is held at the 500 minimum.
        assert_eq!(image.width, 190);
        assert_eq!(image.height, 520);
        assert!(!image.png.is_empty());
    }

    #[test]
    fn exported_png_decodes_with_white_background() {
        let image = export(&root_scene(), Size::ZERO).unwrap();
        let decoded = image::load_from_memory(&image.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (190, 520));
        // Top-left corner is outside the fan, so it is pure background.
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn empty_scene_exports_the_minimum_square() {
        let image = export(&Scene::default(), Size::ZERO).unwrap();
        assert_eq!((image.width, image.height), (520, 520));
    }

    #[test]
    fn export_to_file_uses_default_filename() {
        let dir = std::path::PathBuf::from("target").join("export_test");
        let path = export_to_file(&root_scene(), Size::ZERO, &dir, None).unwrap();
        assert!(path.ends_with(DEFAULT_FILENAME));
        assert!(path.exists());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        let mut px = vec![64u8, 32, 16, 128];
        unpremultiply_rgba8_in_place(&mut px);
        assert_eq!(px[3], 128);
        assert!((px[0] as i32 - 128).abs() <= 1);
    }
}
