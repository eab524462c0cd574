// Host view: constructs the shared result store, owns the upload
// widget and reads the store back as an independent consumer.

use crate::store::ResultStore;
use crate::upload::UploadWidget;

pub struct AvatarApp {
    store: ResultStore,
    upload: UploadWidget,
}

impl AvatarApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Self {
            store: ResultStore::new(),
            upload: UploadWidget::new(),
        }
    }
}

impl eframe::App for AvatarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Clear avatar").clicked() {
                        self.store.clear();
                        self.upload.reset();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);

                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.heading("Upload your avatar");
                ui.label("PNG, JPG and SVG are allowed");
                ui.add_space(16.0);

                self.upload.ui(ui, &self.store);

                // Any view holding a store handle can observe the most
                // recent result; this one just reports its shape.
                if let Some(avatar) = self.store.get() {
                    let (w, h) = avatar.dimensions();
                    ui.add_space(16.0);
                    ui.weak(format!(
                        "Current avatar: {w}\u{d7}{h} ({} byte data URL)",
                        avatar.data_url.len()
                    ));
                }
            });

            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                egui::warn_if_debug_build(ui);
            });
        });
    }
}
