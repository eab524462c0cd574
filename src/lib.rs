//! Avatar upload and crop: drop or browse for an image, pan/zoom it
//! inside a round viewport and publish the cropped square through a
//! process-wide result store.

#![warn(clippy::all, rust_2018_idioms)]

mod app;
mod crop;
mod file_select;
mod store;
#[cfg(feature = "svg")]
mod svg;
mod upload;

pub use app::AvatarApp;
pub use crop::{CropError, CropRect, CroppedImage, display_rect_to_source_rect, extract};
pub use store::ResultStore;
pub use upload::{UploadPhase, UploadWidget};

use eframe::NativeOptions;

impl AvatarApp {
    /// Run the app with the provided NativeOptions.
    pub fn run(options: NativeOptions) -> Result<(), eframe::Error> {
        eframe::run_native(
            "Avatar Upload",
            options,
            Box::new(|cc| Ok(Box::new(AvatarApp::new(cc)))),
        )
    }
}
