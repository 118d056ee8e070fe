use emolens_img::analyzer::{Analysis, Analyzer};
use emolens_img::annotate::Annotator;
use image::RgbImage;
use tracing::{error, warn};

use crate::video::InputVideoStream;

enum Mode {
    Menu,
    Camera(InputVideoStream),
    Still,
}

enum Action {
    OpenCamera,
    UploadImage,
}

pub struct EmotionApp {
    analyzer: Analyzer,
    annotator: Annotator,
    camera_index: u32,
    fps: u32,
    mode: Mode,
    frame_texture: Option<egui::TextureHandle>,
}

impl EmotionApp {
    pub fn new(analyzer: Analyzer, annotator: Annotator, camera_index: u32, fps: u32) -> EmotionApp {
        EmotionApp {
            analyzer,
            annotator,
            camera_index,
            fps,
            mode: Mode::Menu,
            frame_texture: None,
        }
    }

    fn open_camera(&mut self) {
        match InputVideoStream::open(self.camera_index, self.fps) {
            Ok(stream) => {
                self.frame_texture = None;
                self.mode = Mode::Camera(stream);
            }
            Err(e) => error_dialog(&format!("Could not open camera: {e}")),
        }
    }

    fn upload_image(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
            .pick_file()
        else {
            return;
        };

        let mut img = match image::open(&path) {
            Ok(img) => img.into_rgb8(),
            Err(e) => {
                error_dialog(&format!("Could not read the image file: {e}"));
                return;
            }
        };

        self.annotate_frame(&mut img);
        self.frame_texture = Some(load_frame_texture(ctx, &img));
        self.mode = Mode::Still;
    }

    /// Overlay emotion labels in place. A failed analysis leaves the frame
    /// undecorated.
    fn annotate_frame(&mut self, img: &mut RgbImage) {
        match self.analyzer.analyze(img) {
            Analysis::Detected(faces) => self.annotator.annotate(img, &faces),
            Analysis::Failed(reason) => warn!("frame analysis failed: {reason}"),
        }
    }

    /// Pull, analyze and display exactly one camera frame; the next read
    /// waits until this one is fully processed.
    fn camera_view(&mut self, ctx: &egui::Context) {
        let frame = match &mut self.mode {
            Mode::Camera(stream) => stream.frame(),
            _ => return,
        };

        match frame {
            Ok(mut img) => {
                self.annotate_frame(&mut img);
                self.frame_texture = Some(load_frame_texture(ctx, &img));
            }
            Err(e) => {
                error!("failed to pull frame from camera: {e:?}");
                self.close_view();
                return;
            }
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            self.close_view();
            return;
        }

        ctx.request_repaint();
    }

    fn still_view(&mut self, ctx: &egui::Context) {
        let any_key = ctx.input(|i| {
            i.events
                .iter()
                .any(|e| matches!(e, egui::Event::Key { pressed: true, .. }))
        });

        if any_key {
            self.close_view();
        }
    }

    // dropping the camera stream releases the device
    fn close_view(&mut self) {
        self.mode = Mode::Menu;
        self.frame_texture = None;
    }

    fn show_frame(&self, ui: &mut egui::Ui) {
        let Some(texture) = &self.frame_texture else {
            return;
        };

        let available = ui.available_size();
        let tex_size = texture.size_vec2();
        let scale = (available.x / tex_size.x)
            .min(available.y / tex_size.y)
            .min(1.0);

        ui.centered_and_justified(|ui| {
            ui.image((texture.id(), tex_size * scale));
        });
    }
}

impl eframe::App for EmotionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.mode {
            Mode::Camera(_) => self.camera_view(ctx),
            Mode::Still => self.still_view(ctx),
            Mode::Menu => {}
        }

        let mut action = None;

        egui::CentralPanel::default().show(ctx, |ui| match self.mode {
            Mode::Menu => {
                ui.vertical_centered(|ui| {
                    ui.add_space(24.0);
                    ui.heading("Emotion Detector");
                    ui.add_space(24.0);

                    ui.horizontal(|ui| {
                        ui.add_space(80.0);
                        if ui.button("Open Camera").clicked() {
                            action = Some(Action::OpenCamera);
                        }
                        ui.add_space(16.0);
                        if ui.button("Upload Image").clicked() {
                            action = Some(Action::UploadImage);
                        }
                    });
                });
            }
            _ => self.show_frame(ui),
        });

        match action {
            Some(Action::OpenCamera) => self.open_camera(),
            Some(Action::UploadImage) => self.upload_image(ctx),
            None => {}
        }
    }
}

fn load_frame_texture(ctx: &egui::Context, img: &RgbImage) -> egui::TextureHandle {
    let size = [img.width() as usize, img.height() as usize];
    let color_image = egui::ColorImage::from_rgb(size, img.as_raw());

    ctx.load_texture("frame", color_image, Default::default())
}

fn error_dialog(message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Error")
        .set_description(message)
        .show();
}
