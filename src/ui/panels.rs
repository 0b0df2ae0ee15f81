use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rowsieve::Format;

use crate::state::{AppState, Status};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.engine.original().is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ui.label("Enter filter criteria (e.g., column > value):");
    let response = ui.add(
        egui::TextEdit::singleline(&mut state.filter_input)
            .hint_text("age >= 18 and name != 'B'")
            .desired_width(f32::INFINITY),
    );
    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Add Filter").clicked() || submitted {
            state.add_filter();
            response.request_focus();
        }
        if ui.button("Apply Filters").clicked() {
            state.apply_filters();
        }
    });

    ui.separator();

    // Clone what we need so we can mutate state inside the loop.
    let staged: Vec<String> = state
        .engine
        .filters()
        .iter()
        .map(|f| f.to_string())
        .collect();

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!("Current Filters ({})", staged.len()));
        if !staged.is_empty() && ui.small_button("Clear").clicked() {
            state.clear_filters();
        }
    });

    if state.engine.is_stale() {
        ui.label(RichText::new("Filters changed – apply to refresh").color(Color32::YELLOW));
    }

    let mut remove = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (i, text) in staged.iter().enumerate() {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("✖").on_hover_text("Remove filter").clicked() {
                        remove = Some(i);
                    }
                    ui.monospace(text);
                });
            }
        });

    if let Some(i) = remove {
        state.remove_filter(i);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_save = state.engine.filtered().is_some();
            if ui
                .add_enabled(can_save, egui::Button::new("Save Filtered Data…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label("Format:");
        egui::ComboBox::from_id_salt("load_format")
            .selected_text(state.load_format.label())
            .show_ui(ui, |ui: &mut Ui| {
                for format in Format::ALL {
                    ui.selectable_value(&mut state.load_format, format, format.label());
                }
            });
        if ui.button("Choose File").clicked() {
            open_file_dialog(state);
        }

        ui.separator();

        if let Some(ds) = state.engine.original() {
            let shown = state.engine.current_table().map_or(0, |t| t.len());
            ui.label(format!(
                "{} rows × {} columns loaded, {shown} shown",
                ds.len(),
                ds.width()
            ));
        }
    });
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        if let Some(path) = &state.source {
            ui.label(path.display().to_string());
            ui.separator();
        }
        match &state.status {
            Some(Status::Info(msg)) => {
                ui.label(msg);
            }
            Some(Status::Error(msg)) => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let format = state.load_format;
    let file = rfd::FileDialog::new()
        .set_title("Choose File")
        .add_filter(format!("{} Files", format.label()), format.extensions())
        .add_filter("All Files", &["*"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let mut dialog = rfd::FileDialog::new().set_title("Save File");
    for format in Format::ALL {
        dialog = dialog.add_filter(format!("{} Files", format.label()), format.extensions());
    }
    let stem = state
        .source
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| format!("{}_filtered.csv", s.to_string_lossy()))
        .unwrap_or_else(|| "filtered.csv".to_string());

    if let Some(path) = dialog.set_file_name(stem).save_file() {
        state.save_file(&path);
    }
}
