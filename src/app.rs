use std::path::PathBuf;

use eframe::egui;
use image::DynamicImage;

use crate::config::Config;
use crate::derive::{derive_points, point_name, PointOfInterest, Review};
use crate::export;
use crate::geometry::{ImageInfo, Point};
use crate::persist;
use crate::session::{Command, Session};
use crate::shortcuts;
use crate::store::{AnnotationId, AnnotationKind};

/// Side of the review preview, in screen points (one image pixel each).
const PREVIEW_SIZE: f32 = 400.0;
const STROKE_WIDTH: f32 = 3.0;

const LINE_COLOR: egui::Color32 = egui::Color32::RED;
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 120, 255);
const POINT_COLOR: egui::Color32 = egui::Color32::BLUE;

// ── App ─────────────────────────────────────────────────────────────────────

pub struct CropperApp {
    image_path: PathBuf,
    raw_image: DynamicImage,
    texture: Option<egui::TextureHandle>,
    config: Config,

    session: Session,

    // sidebar rename field, bound to `rename_target`
    rename_target: Option<(AnnotationKind, AnnotationId)>,
    rename_buf: String,
    status: Option<String>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl CropperApp {
    pub fn new(image_path: PathBuf, raw_image: DynamicImage, config: Config) -> Self {
        let image = ImageInfo::new(raw_image.width(), raw_image.height());
        let store = persist::load_annotations(&image_path);
        let session = Session::with_store(image, store, config.default_crop_size);

        Self {
            image_path,
            raw_image,
            texture: None,
            config,
            session,
            rename_target: None,
            rename_buf: String::new(),
            status: None,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    fn image_size(&self) -> egui::Vec2 {
        let image = self.session.image();
        egui::vec2(image.width as f32, image.height as f32)
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        center + self.pan + (img_pos.to_vec2() - self.image_size() * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Point {
        let center = canvas_rect.center();
        let rel = screen_pos - center - self.pan;
        let size = self.image_size();
        Point::round(
            (rel.x / self.zoom + size.x * 0.5) as f64,
            (rel.y / self.zoom + size.y * 0.5) as f64,
        )
    }

    fn point_to_screen(&self, canvas_rect: egui::Rect, p: Point) -> egui::Pos2 {
        self.image_to_screen(canvas_rect, egui::pos2(p.x as f32, p.y as f32))
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right = self.image_to_screen(canvas_rect, self.image_size().to_pos2());
        egui::Rect::from_min_max(top_left, bot_right)
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let rgba = self.raw_image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
    }

    /// Invariant violations are bugs in how the session is driven; make them loud.
    fn report(&mut self, result: crate::error::Result<()>) {
        if let Err(e) = result {
            log::error!("{e}");
            self.status = Some(format!("Internal error: {e}"));
        }
    }

    fn auto_save(&mut self) {
        if !self.session.take_dirty() {
            return;
        }
        if let Err(e) = persist::save_annotations(&self.image_path, self.session.store()) {
            log::warn!("could not save annotations: {e:#}");
        }
    }

    fn run(&mut self, command: Command) {
        self.session.apply(command);
        if command == Command::BackToDraw || command == Command::Proceed {
            self.status = None;
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let step = self.config.size_step;
        let commands: Vec<Command> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => shortcuts::handle_key_event(self.session.phase(), *key, *modifiers, step),
                    _ => None,
                })
                .collect()
        });
        for command in commands {
            self.run(command);
        }
    }

    fn hit_test(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Option<(AnnotationKind, AnnotationId)> {
        let tolerance = STROKE_WIDTH + 8.0;
        for ann in self.session.store().by_creation().into_iter().rev() {
            let Some((a, b)) = ann.endpoints() else {
                continue;
            };
            let s = self.point_to_screen(canvas_rect, a);
            let e = self.point_to_screen(canvas_rect, b);
            let hit = match ann.kind {
                AnnotationKind::Line => point_to_segment_dist(screen_pos, s, e) < tolerance,
                AnnotationKind::Rect => {
                    let rect = egui::Rect::from_two_pos(s, e);
                    rect.expand(tolerance).contains(screen_pos)
                        && !rect.shrink(tolerance).contains(screen_pos)
                }
            };
            if hit {
                return Some((ann.kind, ann.id));
            }
        }
        None
    }

    fn draw_annotations(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let selected = self.session.selected();
        for ann in self.session.store().by_creation() {
            let Some((a, b)) = ann.endpoints() else {
                continue;
            };
            let color = if selected == Some((ann.kind, ann.id)) {
                SELECTED_COLOR
            } else {
                LINE_COLOR
            };
            let stroke = egui::Stroke::new(STROKE_WIDTH, color);
            let s = self.point_to_screen(canvas_rect, a);
            let e = self.point_to_screen(canvas_rect, b);
            match ann.kind {
                AnnotationKind::Line => {
                    painter.line_segment([s, e], stroke);
                }
                AnnotationKind::Rect => {
                    painter.rect_stroke(
                        egui::Rect::from_two_pos(s, e),
                        0.0,
                        stroke,
                        egui::StrokeKind::Middle,
                    );
                }
            }
            if ann.finished {
                painter.text(
                    s.min(e) + egui::vec2(4.0, 4.0),
                    egui::Align2::LEFT_TOP,
                    ann.display_name(),
                    egui::FontId::proportional(14.0),
                    color,
                );
            }
        }
    }

    fn draw_points(&self, painter: &egui::Painter, canvas_rect: egui::Rect, points: &[PointOfInterest]) {
        for point in points {
            let center = self.point_to_screen(canvas_rect, point.location);
            painter.rect_filled(
                egui::Rect::from_center_size(center, egui::vec2(5.0, 5.0)),
                0.0,
                POINT_COLOR,
            );
        }
    }

    // ── Draw phase ──────────────────────────────────────────────────────────

    fn draw_phase_ui(&mut self, ctx: &egui::Context) {
        let preview = derive_points(self.session.store(), self.session.image());

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let idle = self.session.drawing().is_none();
                let armed = self.session.armed();
                if armed == Some(AnnotationKind::Line) {
                    ui.add_enabled(false, egui::Button::new("Click image to draw line"));
                } else if ui.add_enabled(idle, egui::Button::new("New line (N)")).clicked() {
                    self.run(Command::ArmDrawLine);
                }
                if armed == Some(AnnotationKind::Rect) {
                    ui.add_enabled(false, egui::Button::new("Click image to draw rect"));
                } else if ui.add_enabled(idle, egui::Button::new("New rect (R)")).clicked() {
                    self.run(Command::ArmDrawRect);
                }
                if ui.button("Remove last").clicked() {
                    self.run(Command::DeleteLastAnnotation);
                }
                ui.separator();
                if ui.button("Review points").clicked() {
                    self.run(Command::Proceed);
                }
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

        egui::SidePanel::left("annotations")
            .default_width(220.0)
            .show(ctx, |ui| {
                if self.session.drawing().is_some() {
                    ui.label("Drawing...");
                } else if let Some((kind, id)) = self.session.selected() {
                    self.rename_ui(ui, kind, id);
                } else {
                    self.annotation_list_ui(ui, &preview);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));
            if let Some(ref tex) = self.texture {
                painter.image(
                    tex.id(),
                    self.image_rect_on_screen(canvas_rect),
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            self.draw_annotations(&painter, canvas_rect);
            self.draw_points(&painter, canvas_rect, &preview);

            // Handle pan (middle mouse button)
            if ctx.input(|i| i.pointer.middle_down()) {
                self.pan += ctx.input(|i| i.pointer.delta());
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let cursor_rel = cursor - canvas_rect.center() - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            if self.panning {
                return;
            }
            if let Some(pos) = response.hover_pos() {
                let p = self.screen_to_image(canvas_rect, pos);
                let result = self.session.pointer_moved(p);
                self.report(result);
            }
            if response.clicked_by(egui::PointerButton::Primary) {
                let Some(pos) = response.interact_pointer_pos() else {
                    return;
                };
                if self.session.drawing().is_some() || self.session.armed().is_some() {
                    let p = self.screen_to_image(canvas_rect, pos);
                    let result = self.session.pointer_clicked(p);
                    self.report(result);
                } else if let Some((kind, id)) = self.hit_test(canvas_rect, pos) {
                    self.session.select(kind, id);
                } else {
                    self.session.close_selection();
                }
            }
        });
    }

    fn rename_ui(&mut self, ui: &mut egui::Ui, kind: AnnotationKind, id: AnnotationId) {
        let opened = self.rename_target != Some((kind, id));
        if opened {
            self.rename_target = Some((kind, id));
            self.rename_buf = self
                .session
                .store()
                .get(kind, id)
                .map(|a| a.name.clone())
                .unwrap_or_default();
        }

        if ui.link("Back").clicked() {
            self.session.close_selection();
        }
        ui.heading(format!("Name this {kind}..."));
        let field = ui.text_edit_singleline(&mut self.rename_buf);
        if opened {
            field.request_focus();
        }
        if field.changed() {
            let result = self.session.rename(kind, id, &self.rename_buf);
            self.report(result);
        }
        let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() || submitted {
                self.session.close_selection();
            }
            if ui.button("Delete").clicked() {
                self.session.remove(kind, id);
            }
        });
    }

    fn annotation_list_ui(&mut self, ui: &mut egui::Ui, points: &[PointOfInterest]) {
        let mut clicked = None;
        if self.session.store().is_empty() {
            ui.label("Press N to draw a line or R to draw a rect.");
        }
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (title, kind, empty) in [
                ("Lines", AnnotationKind::Line, "Unnamed line"),
                ("Rects", AnnotationKind::Rect, "Unnamed rect"),
            ] {
                ui.heading(title);
                for ann in self.session.store().by_creation() {
                    if ann.kind != kind || !ann.finished {
                        continue;
                    }
                    let label = if ann.name.is_empty() { empty } else { ann.name.as_str() };
                    if ui.link(label).clicked() {
                        clicked = Some((ann.kind, ann.id));
                    }
                }
            }

            ui.heading("Points");
            for point in points {
                ui.label(format!(
                    "[{}, {}]: {}",
                    point.location.x, point.location.y, point.name
                ));
            }
        });
        if let Some((kind, id)) = clicked {
            self.session.select(kind, id);
        }
    }

    // ── Review phase ────────────────────────────────────────────────────────

    fn review_phase_ui(&mut self, ctx: &egui::Context) {
        let Some(walker) = self.session.walker() else {
            return;
        };
        let cursor = walker.cursor();
        let total = walker.len();
        let point = walker.current().clone();
        let live_name = point_name(self.session.store(), point.origin);
        let mut size = walker.current_size();

        let mut commands = Vec::new();
        let mut size_changed = false;
        let mut finish = false;

        egui::SidePanel::left("review")
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.link("Prev").clicked() {
                        commands.push(Command::ReviewPrev);
                    }
                    if ui.link("Next").clicked() {
                        commands.push(Command::ReviewNext);
                    }
                });
                ui.label(format!("Reviewing {} of {}", cursor + 1, total));

                ui.horizontal(|ui| {
                    if ui.button("Hold (H)").clicked() {
                        commands.push(Command::DecideKeep);
                    }
                    if ui.button("Not hold (N)").clicked() {
                        commands.push(Command::DecideDiscard);
                    }
                });
                ui.label("Size");
                size_changed = ui
                    .add(egui::Slider::new(&mut size, 0..=self.config.max_crop_size))
                    .changed();

                ui.separator();
                ui.label(format!("Location: [{},{}]", point.location.x, point.location.y));
                ui.label(format!("Name: {}", point.name));
                if let Some(live) = live_name.as_deref().filter(|n| *n != point.name) {
                    ui.label(format!("Renamed since: {live}"));
                }
                ui.label(format!(
                    "Set as: {}",
                    match point.review {
                        Review::Keep => "Hold",
                        Review::Discard => "Not hold",
                        Review::Undecided => "Undecided",
                    }
                ));
                ui.label(format!("Size: {size}"));
                if let Some(extent) = point.extent {
                    ui.label(format!("Rect extent: {extent}"));
                }

                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    if ui.button("Back").clicked() {
                        commands.push(Command::BackToDraw);
                    }
                    if ui.button("Finish").clicked() {
                        finish = true;
                    }
                });
                if let Some(status) = &self.status {
                    ui.label(status);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.preview_ui(ui, &point, size);
        });

        if size_changed {
            if let Some(walker) = self.session.walker_mut() {
                walker.change_size(cursor, size);
            }
        }
        for command in commands {
            self.run(command);
        }
        if finish {
            self.export();
        }
    }

    /// The neighbourhood of `point` at 1:1 with the crop square on top.
    fn preview_ui(&self, ui: &mut egui::Ui, point: &PointOfInterest, size: i32) {
        let (response, painter) =
            ui.allocate_painter(egui::Vec2::splat(PREVIEW_SIZE), egui::Sense::hover());
        let frame = response.rect;
        let painter = painter.with_clip_rect(frame);
        painter.rect_filled(frame, 0.0, egui::Color32::from_gray(40));

        let location = egui::pos2(point.location.x as f32, point.location.y as f32);
        let view = egui::Rect::from_center_size(location, egui::Vec2::splat(PREVIEW_SIZE));
        let image_size = self.image_size();
        let visible = view.intersect(egui::Rect::from_min_size(egui::Pos2::ZERO, image_size));
        if let Some(ref tex) = self.texture {
            if visible.is_positive() {
                let uv = egui::Rect::from_min_max(
                    (visible.min.to_vec2() / image_size).to_pos2(),
                    (visible.max.to_vec2() / image_size).to_pos2(),
                );
                painter.image(
                    tex.id(),
                    visible.translate(frame.min - view.min),
                    uv,
                    egui::Color32::WHITE,
                );
            }
        }

        let side = size.max(0) as f32;
        painter.rect_filled(
            egui::Rect::from_center_size(frame.center(), egui::Vec2::splat(side)),
            0.0,
            egui::Color32::from_rgba_unmultiplied(255, 0, 0, 51),
        );
        painter.rect_filled(
            egui::Rect::from_center_size(frame.center(), egui::Vec2::splat(6.0)),
            0.0,
            POINT_COLOR,
        );
    }

    fn export(&mut self) {
        let entries = self.session.export_entries();
        if entries.is_empty() {
            self.status = Some("No points marked hold".to_string());
            return;
        }
        let mut dialog = rfd::FileDialog::new();
        if let Some(dir) = self.image_path.parent() {
            dialog = dialog.set_directory(dir);
        }
        let Some(dir) = dialog.pick_folder() else {
            return;
        };
        self.status = Some(
            match export::write_crops(&self.raw_image, &entries, &dir, &self.config.export_dir_name) {
                Ok(out) => format!("Exported {} crop(s) to {}", entries.len(), out.display()),
                Err(e) => {
                    log::error!("export failed: {e:#}");
                    format!("Export failed: {e}")
                }
            },
        );
    }

    fn empty_review_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("No points of interest");
            ui.label("None of the lines cross inside the image and there are no rects.");
            if ui.button("Back").clicked() {
                self.run(Command::BackToDraw);
            }
        });
    }
}

fn point_to_segment_dist(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let t = (ap.dot(ab) / ab.dot(ab)).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for CropperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);
        self.handle_shortcuts(ctx);

        if self.session.is_drawing_phase() {
            self.draw_phase_ui(ctx);
        } else if self.session.walker().is_some() {
            self.review_phase_ui(ctx);
        } else {
            self.empty_review_ui(ctx);
        }

        self.auto_save();
    }
}
