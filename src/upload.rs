// Upload widget: the four-phase flow from drop/browse through the
// interactive crop viewport to the published avatar.

use std::path::Path;

use image::DynamicImage;

use crate::crop::{self, CropError, CropRect};
use crate::file_select;
use crate::store::ResultStore;

/// On-screen side of the square crop viewport, in points.
const VIEWPORT_SIDE: f32 = 240.0;
/// Zoom bounds: 1 = short edge fits the viewport, 5 = maximum magnification.
const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 5.0;
/// Zoom change per scroll point while hovering the viewport.
const SCROLL_ZOOM_STEP: f32 = 0.01;

/// The four mutually exclusive phases of the upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Cropping,
    Error,
    Saved,
}

/// A selected source file, decoded and held for one upload attempt.
pub struct SourceImage {
    pub name: String,
    pub readable_size: String,
    pub image: DynamicImage,
}

pub struct UploadWidget {
    phase: UploadPhase,
    source: Option<SourceImage>,
    /// Preview texture for the crop viewport; dropped on every exit
    /// path out of `Cropping` and whenever a new file supersedes it.
    preview: Option<egui::TextureHandle>,
    /// Texture for the saved avatar; rebuilt from the store on demand.
    result_texture: Option<egui::TextureHandle>,
    /// Offset of the displayed image center relative to the viewport
    /// center, in display points.
    pan: egui::Vec2,
    zoom: f32,
    error: Option<String>,
}

impl Default for UploadWidget {
    fn default() -> Self {
        Self {
            phase: UploadPhase::Idle,
            source: None,
            preview: None,
            result_texture: None,
            pan: egui::Vec2::ZERO,
            zoom: MIN_ZOOM,
            error: None,
        }
    }
}

impl UploadWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> egui::Vec2 {
        self.pan
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// Accept a selected file: decode it, reset crop and zoom to their
    /// defaults and enter `Cropping`. A file that cannot be decoded
    /// enters `Error` instead.
    pub fn accept_file(&mut self, name: &str, bytes: &[u8]) {
        self.preview = None;
        match decode_bytes(name, bytes) {
            Ok(image) => {
                log::info!("accepted {name} ({}x{})", image.width(), image.height());
                self.source = Some(SourceImage {
                    name: name.to_owned(),
                    readable_size: file_select::readable_size(bytes.len() as u64),
                    image,
                });
                self.pan = egui::Vec2::ZERO;
                self.zoom = MIN_ZOOM;
                self.error = None;
                self.phase = UploadPhase::Cropping;
            }
            Err(err) => {
                log::error!("failed to decode {name}: {err}");
                self.source = None;
                self.error = Some(err.to_string());
                self.phase = UploadPhase::Error;
            }
        }
    }

    /// Reset all local state back to `Idle`. Safe to call from any
    /// phase; always yields the same idle rendering.
    pub fn reset(&mut self) {
        self.preview = None;
        self.result_texture = None;
        self.source = None;
        self.pan = egui::Vec2::ZERO;
        self.zoom = MIN_ZOOM;
        self.error = None;
        self.phase = UploadPhase::Idle;
    }

    /// Apply a zoom value, clamped into `[1, 5]`; out-of-range input is
    /// never applied verbatim. Pan is re-clamped since the reachable
    /// area depends on zoom.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.clamp_pan();
    }

    /// Pan the image under the viewport, clamped so the viewport never
    /// leaves the image.
    pub fn pan_by(&mut self, delta: egui::Vec2) {
        self.pan += delta;
        self.clamp_pan();
    }

    /// Extract the currently selected region, publish it through the
    /// store and enter `Saved`. An extraction failure surfaces as the
    /// `Error` phase.
    pub fn save(&mut self, store: &ResultStore) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let Some(region) = self.current_crop_rect() else {
            return;
        };
        match crop::extract(&source.image, region, 0.0) {
            Ok(result) => {
                let (w, h) = result.dimensions();
                log::info!("saved {w}x{h} avatar from {}", source.name);
                store.set(result);
                self.preview = None;
                self.result_texture = None;
                self.source = None;
                self.phase = UploadPhase::Saved;
            }
            Err(err) => {
                log::error!("crop extraction failed: {err}");
                self.preview = None;
                self.source = None;
                self.error = Some(err.to_string());
                self.phase = UploadPhase::Error;
            }
        }
    }

    /// The crop region currently selected by zoom and pan, in
    /// source-pixel coordinates. Pure function of widget state, so it
    /// is recomputed on every interaction rather than only on save.
    pub fn current_crop_rect(&self) -> Option<CropRect> {
        let source = self.source.as_ref()?;
        let (w, h) = (source.image.width(), source.image.height());
        let scale = self.display_scale(w, h);

        // The viewport rect expressed relative to the displayed image's
        // top-left corner, in display points.
        let image_min_x = VIEWPORT_SIDE / 2.0 + self.pan.x - w as f32 * scale / 2.0;
        let image_min_y = VIEWPORT_SIDE / 2.0 + self.pan.y - h as f32 * scale / 2.0;
        let display = egui::Rect::from_min_size(
            egui::pos2(-image_min_x, -image_min_y),
            egui::vec2(VIEWPORT_SIDE, VIEWPORT_SIDE),
        );

        Some(crop::display_rect_to_source_rect(display, scale, w, h))
    }

    /// Display points per source pixel: at zoom 1 the short edge of the
    /// source exactly covers the viewport.
    fn display_scale(&self, w: u32, h: u32) -> f32 {
        VIEWPORT_SIDE / w.min(h).max(1) as f32 * self.zoom
    }

    fn clamp_pan(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let (w, h) = (source.image.width(), source.image.height());
        let scale = self.display_scale(w, h);
        let max_x = (w as f32 * scale - VIEWPORT_SIDE).max(0.0) / 2.0;
        let max_y = (h as f32 * scale - VIEWPORT_SIDE).max(0.0) / 2.0;
        self.pan.x = self.pan.x.clamp(-max_x, max_x);
        self.pan.y = self.pan.y.clamp(-max_y, max_y);
    }
}

// =============================================================================
// Rendering
// =============================================================================

impl UploadWidget {
    /// Render the widget for the current phase.
    pub fn ui(&mut self, ui: &mut egui::Ui, store: &ResultStore) {
        self.collect_dropped_files(ui.ctx());
        match self.phase {
            UploadPhase::Idle => self.drop_target_ui(ui),
            UploadPhase::Cropping => self.cropping_ui(ui, store),
            UploadPhase::Error => self.error_ui(ui),
            UploadPhase::Saved => self.saved_ui(ui, store),
        }
    }

    /// The drop target only exists in `Idle` and `Saved`; drops during
    /// `Cropping` and `Error` are ignored. Only the first file of a
    /// batch is used.
    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        if !matches!(self.phase, UploadPhase::Idle | UploadPhase::Saved) {
            return;
        }
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.first() else {
            return;
        };
        let Some(path) = file.path.clone() else {
            return;
        };
        if !file_select::is_accepted(&path) {
            // Rejected at the boundary; no state change.
            log::warn!("rejected unsupported file {}", path.display());
            return;
        }
        self.load_path(&path);
    }

    fn load_path(&mut self, path: &Path) {
        match std::fs::read(path) {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("image")
                    .to_owned();
                self.accept_file(&name, &bytes);
            }
            Err(err) => {
                log::error!("failed to read {}: {err}", path.display());
                self.error = Some(format!("Could not read {}", path.display()));
                self.phase = UploadPhase::Error;
            }
        }
    }

    /// Drop/browse target shared by `Idle` and `Saved`.
    fn drop_target_ui(&mut self, ui: &mut egui::Ui) {
        let hovered = ui.ctx().input(|i| i.raw.hovered_files.clone());
        let response = egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(24))
            .show(ui, |ui| {
                ui.set_min_size(egui::vec2(320.0, 100.0));
                ui.vertical_centered(|ui| {
                    if let Some(file) = hovered.first() {
                        let accepted = file
                            .path
                            .as_deref()
                            .map(file_select::is_accepted)
                            .unwrap_or(true);
                        if accepted {
                            ui.label("Drop your file here");
                        } else {
                            ui.colored_label(ui.visuals().error_fg_color, "Unsupported file type");
                        }
                    } else {
                        ui.strong("Organization Logo");
                        ui.label("Drop the image here or click to browse.");
                    }
                });
            })
            .response;

        if response.interact(egui::Sense::click()).clicked()
            && let Some(path) = file_select::browse()
        {
            self.load_path(&path);
        }
    }

    fn cropping_ui(&mut self, ui: &mut egui::Ui, store: &ResultStore) {
        self.ensure_preview(ui.ctx());
        let Some(source) = self.source.as_ref() else {
            self.reset();
            return;
        };
        let (w, h) = (source.image.width(), source.image.height());
        let name_line = format!("{} ({})", source.name, source.readable_size);

        ui.vertical_centered(|ui| {
            ui.label(name_line);
            ui.add_space(8.0);

            let desired = egui::vec2(VIEWPORT_SIDE, VIEWPORT_SIDE);
            let (rect, response) = ui.allocate_exact_size(desired, egui::Sense::drag());

            if response.dragged() {
                self.pan_by(response.drag_delta());
            }
            if response.hovered() {
                let scroll = ui.ctx().input(|i| i.smooth_scroll_delta.y);
                if scroll != 0.0 {
                    self.set_zoom(self.zoom + scroll * SCROLL_ZOOM_STEP);
                }
            }

            self.paint_viewport(ui, rect, w, h);

            ui.add_space(8.0);
            ui.label("Crop");
            let mut zoom = self.zoom;
            if ui
                .add(egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM).show_value(false))
                .changed()
            {
                self.set_zoom(zoom);
            }

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    self.save(store);
                }
                if ui.button("✕ Cancel").clicked() {
                    self.reset();
                }
            });
        });
    }

    fn paint_viewport(&self, ui: &egui::Ui, rect: egui::Rect, w: u32, h: u32) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, egui::CornerRadius::ZERO, ui.visuals().extreme_bg_color);

        if let Some(texture) = &self.preview {
            let scale = self.display_scale(w, h);
            let size = egui::vec2(w as f32 * scale, h as f32 * scale);
            let image_rect = egui::Rect::from_center_size(rect.center() + self.pan, size);
            painter.image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        // Round mask marking the avatar boundary.
        painter.circle_stroke(
            rect.center(),
            VIEWPORT_SIDE / 2.0 - 1.0,
            egui::Stroke::new(2.0, egui::Color32::WHITE),
        );
        painter.rect_stroke(
            rect,
            egui::CornerRadius::ZERO,
            egui::Stroke::new(1.0, ui.visuals().weak_text_color()),
            egui::StrokeKind::Inside,
        );
    }

    fn error_ui(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.colored_label(ui.visuals().error_fg_color, "Sorry, the upload failed.");
            if let Some(detail) = &self.error {
                ui.weak(detail);
            }
            ui.add_space(8.0);
            if ui.button("Try again").clicked() {
                self.reset();
            }
        });
    }

    fn saved_ui(&mut self, ui: &mut egui::Ui, store: &ResultStore) {
        self.ensure_result_texture(ui.ctx(), store);
        ui.vertical_centered(|ui| {
            if let Some(texture) = &self.result_texture {
                let side = texture.size_vec2().x.min(VIEWPORT_SIDE);
                let radius = egui::CornerRadius::same((side / 2.0).min(255.0) as u8);
                ui.add(
                    egui::Image::new((texture.id(), egui::vec2(side, side))).corner_radius(radius),
                );
            }
            ui.add_space(12.0);
            self.drop_target_ui(ui);
        });
    }

    fn ensure_preview(&mut self, ctx: &egui::Context) {
        if self.preview.is_some() {
            return;
        }
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let size = [source.image.width() as usize, source.image.height() as usize];
        let rgba = source.image.to_rgba8();
        let color_image =
            egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());
        self.preview = Some(ctx.load_texture(
            "upload_preview",
            color_image,
            egui::TextureOptions::LINEAR,
        ));
    }

    fn ensure_result_texture(&mut self, ctx: &egui::Context, store: &ResultStore) {
        if self.result_texture.is_some() {
            return;
        }
        let Some(result) = store.get() else {
            return;
        };
        let size = [result.image.width() as usize, result.image.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            size,
            result.image.as_flat_samples().as_slice(),
        );
        self.result_texture = Some(ctx.load_texture(
            "cropped_avatar",
            color_image,
            egui::TextureOptions::LINEAR,
        ));
    }
}

fn decode_bytes(name: &str, bytes: &[u8]) -> Result<DynamicImage, CropError> {
    #[cfg(feature = "svg")]
    if Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    {
        return crate::svg::rasterize(bytes);
    }
    #[cfg(not(feature = "svg"))]
    let _ = name;
    crop::load_source(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn dropping_a_png_enters_cropping_with_defaults() {
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(400, 400));
        assert_eq!(widget.phase(), UploadPhase::Cropping);
        assert_eq!(widget.zoom(), 1.0);
        assert_eq!(widget.pan(), egui::Vec2::ZERO);
        // Default selection: the centered short-edge square.
        assert_eq!(
            widget.current_crop_rect(),
            Some(CropRect::new(0, 0, 400, 400))
        );
    }

    #[test]
    fn landscape_source_defaults_to_centered_square() {
        let mut widget = UploadWidget::new();
        widget.accept_file("wide.png", &png_bytes(400, 200));
        assert_eq!(
            widget.current_crop_rect(),
            Some(CropRect::new(100, 0, 200, 200))
        );
    }

    #[test]
    fn zoom_and_pan_select_the_expected_region() {
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(400, 400));
        // Crop side 150 requires zoom 400/150; pan the image so the
        // viewport lands at (50, 50).
        widget.set_zoom(400.0 / 150.0);
        widget.pan_by(egui::vec2(120.0, 120.0));
        assert_eq!(
            widget.current_crop_rect(),
            Some(CropRect::new(50, 50, 150, 150))
        );
    }

    #[test]
    fn save_publishes_square_result_and_enters_saved() {
        let store = ResultStore::new();
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(400, 400));
        widget.set_zoom(400.0 / 150.0);
        widget.pan_by(egui::vec2(120.0, 120.0));
        widget.save(&store);

        assert_eq!(widget.phase(), UploadPhase::Saved);
        assert!(widget.source().is_none());
        let result = store.get().unwrap();
        assert_eq!(result.dimensions(), (150, 150));
        assert!(result.data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn new_drop_from_saved_reenters_cropping() {
        let store = ResultStore::new();
        let mut widget = UploadWidget::new();
        widget.accept_file("first.png", &png_bytes(64, 64));
        widget.save(&store);
        assert_eq!(widget.phase(), UploadPhase::Saved);

        widget.accept_file("second.png", &png_bytes(128, 96));
        assert_eq!(widget.phase(), UploadPhase::Cropping);
        assert_eq!(widget.zoom(), 1.0);
        assert_eq!(widget.pan(), egui::Vec2::ZERO);
        // The previous result stays in the store until the next save.
        assert_eq!(store.get().unwrap().dimensions(), (64, 64));
    }

    #[test]
    fn zoom_is_clamped_to_bounds() {
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(50, 50));
        widget.set_zoom(9.0);
        assert_eq!(widget.zoom(), 5.0);
        widget.set_zoom(0.25);
        assert_eq!(widget.zoom(), 1.0);
    }

    #[test]
    fn pan_is_clamped_to_reachable_area() {
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(300, 300));
        // At zoom 1 a square source exactly covers the viewport, so no
        // panning is possible.
        widget.pan_by(egui::vec2(500.0, -500.0));
        assert_eq!(widget.pan(), egui::Vec2::ZERO);

        widget.set_zoom(2.0);
        widget.pan_by(egui::vec2(est_max_pan(), est_max_pan()));
        let pan = widget.pan();
        assert!(pan.x <= est_max_pan() && pan.y <= est_max_pan());
        // The selection still satisfies the bounds invariant.
        let rect = widget.current_crop_rect().unwrap();
        assert!(rect.fits_within(300, 300));
    }

    // Max pan at zoom 2 for a 300x300 source: (300 * 1.6 - 240) / 2.
    fn est_max_pan() -> f32 {
        120.0
    }

    #[test]
    fn reset_clears_everything() {
        let mut widget = UploadWidget::new();
        widget.accept_file("avatar.png", &png_bytes(80, 80));
        widget.set_zoom(3.5);
        widget.pan_by(egui::vec2(10.0, 10.0));

        widget.reset();
        assert_eq!(widget.phase(), UploadPhase::Idle);
        assert!(widget.source().is_none());
        assert_eq!(widget.zoom(), 1.0);
        assert_eq!(widget.pan(), egui::Vec2::ZERO);

        // Reset is idempotent.
        widget.reset();
        assert_eq!(widget.phase(), UploadPhase::Idle);
    }

    #[test]
    fn corrupt_source_enters_error_and_leaves_store_untouched() {
        let store = ResultStore::new();
        let mut widget = UploadWidget::new();
        widget.accept_file("broken.png", b"not an image at all");
        assert_eq!(widget.phase(), UploadPhase::Error);
        assert!(widget.source().is_none());
        assert!(store.is_empty());

        // The only recovery path is an explicit reset.
        widget.reset();
        assert_eq!(widget.phase(), UploadPhase::Idle);
    }

    #[cfg(feature = "svg")]
    #[test]
    fn svg_sources_are_rasterized() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20"><circle cx="10" cy="10" r="8" fill="#00ff00"/></svg>"##;
        let mut widget = UploadWidget::new();
        widget.accept_file("logo.svg", svg.as_bytes());
        assert_eq!(widget.phase(), UploadPhase::Cropping);
        let source = widget.source().unwrap();
        assert_eq!((source.image.width(), source.image.height()), (20, 20));
    }
}
