use eframe::egui::{Align, Layout, Ui};
use egui_extras::{Column, TableBuilder};

use rowsieve::{TabularDataset, Value};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Table preview (central panel)
// ---------------------------------------------------------------------------

const ROW_HEIGHT: f32 = 18.0;

/// Render the current table: the filtered result if there is one, else the original.
pub fn data_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = state.engine.current_table() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view data  (File → Open…)");
        });
        return;
    };

    if dataset.columns().is_empty() {
        ui.label("The dataset has no columns.");
        return;
    }

    // Column widths are remembered per id; a new column count gets a fresh table.
    ui.push_id(("data_table", dataset.width()), |ui: &mut Ui| {
        render(ui, dataset);
    });
}

fn render(ui: &mut Ui, dataset: &TabularDataset) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), dataset.width())
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for name in dataset.columns() {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, dataset.len(), |mut row| {
                let Some(cells) = dataset.row(row.index()) else {
                    return;
                };
                for value in cells {
                    row.col(|ui: &mut Ui| {
                        cell(ui, value);
                    });
                }
            });
        });
}

fn cell(ui: &mut Ui, value: &Value) {
    match value {
        Value::Null => {
            ui.weak("null");
        }
        Value::Integer(_) | Value::Float(_) => {
            ui.monospace(value.to_string());
        }
        _ => {
            ui.label(value.to_string());
        }
    }
}
