use adcpnc_core::dataset::Variable;
use adcpnc_core::output::storage_name;
use adcpnc_core::{ConversionReport, Dataset};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn number_cell(value: Option<f64>) -> Cell {
    match value {
        Some(value) if value.is_finite() => Cell::new(format!("{value:.3}")).set_alignment(CellAlignment::Right),
        _ => Cell::new("-").fg(Color::DarkGrey),
    }
}

fn dims_label(var: &Variable) -> String {
    let dims: Vec<String> = var
        .dims()
        .iter()
        .zip(var.shape())
        .map(|(dim, len)| format!("{dim}={len}"))
        .collect();
    format!("({})", dims.join(", "))
}

pub fn print_summary(ds: &Dataset, report: &ConversionReport) {
    println!("Instrument: {} ({:?})", report.serial_number, report.coordinate_system);
    println!(
        "Orientation: {}  Water depth: {:.3} m  Nominal instrument depth: {:.3} m",
        report.orientation, report.depth.water_depth, report.depth.nominal_instrument_depth
    );
    println!("Samples kept: {}", report.clip.samples());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell("Variable"),
            header_cell("Dimensions"),
            header_cell("Type"),
            header_cell("Units"),
            header_cell("Minimum"),
            header_cell("Maximum"),
        ]);

    for (name, var) in ds.variables() {
        let units = var.attrs.get("units").map(|value| value.to_string()).unwrap_or_default();
        table.add_row(vec![
            Cell::new(name),
            Cell::new(dims_label(var)),
            Cell::new(storage_name(var.encoding.storage)),
            Cell::new(units),
            number_cell(var.attrs.get_f64("minimum")),
            number_cell(var.attrs.get_f64("maximum")),
        ]);
    }
    println!("{table}");

    if !report.warnings.is_empty() {
        eprintln!("Warnings:");
        for warning in &report.warnings {
            eprintln!("- {warning}");
        }
    }
}
