//! Sheet row layout shared by the master log and per-report tabs.
//!
//! Columns:
//!   A report_id, B date, C part_id, D part_name, E damage_description,
//!   F severity, G estimated_material_cost, H estimated_paint_cost,
//!   I estimated_structural_cost, J estimated_total_part_cost,
//!   K part_number, L part_url, M part_cost (K-M are left for the user)

use serde_json::{json, Value};

use crate::report::{PartDamage, ReportRecord};

const COLUMNS: [&str; 13] = [
    "report_id",
    "date",
    "part_id",
    "part_name",
    "damage_description",
    "severity",
    "estimated_material_cost",
    "estimated_paint_cost",
    "estimated_structural_cost",
    "estimated_total_part_cost",
    "part_number",
    "part_url",
    "part_cost",
];

/// First data row on a report tab (row 1 is the header).
const FIRST_DATA_ROW: usize = 2;

pub fn header_row() -> Vec<Value> {
    COLUMNS.iter().map(|c| json!(c)).collect()
}

fn part_row(record: &ReportRecord, date: &str, part: &PartDamage) -> Vec<Value> {
    vec![
        json!(record.report_id),
        json!(date),
        json!(part.part_id),
        json!(part.part_name),
        json!(part.damage_description),
        part.severity.map_or_else(|| json!(""), |s| json!(s)),
        json!(part.estimated_material_cost),
        json!(part.estimated_paint_cost),
        json!(part.estimated_structural_cost),
        json!(part.estimated_total_part_cost),
        json!(""),
        json!(""),
        json!(""),
    ]
}

pub fn master_rows(record: &ReportRecord, parts: &[PartDamage]) -> Vec<Vec<Value>> {
    let date = record.date_string();
    parts.iter().map(|p| part_row(record, &date, p)).collect()
}

/// Part rows followed by a summary row whose total is a live `SUM` formula.
pub fn report_tab_rows(record: &ReportRecord, parts: &[PartDamage]) -> Vec<Vec<Value>> {
    let mut rows = master_rows(record, parts);
    if parts.is_empty() {
        return rows;
    }

    let last_part_row = FIRST_DATA_ROW + parts.len() - 1;
    let mut summary = vec![json!(""); COLUMNS.len()];
    summary[0] = json!(record.report_id);
    summary[1] = json!(record.date_string());
    summary[2] = json!("TOTAL");
    summary[3] = json!("Total Estimated Repair Cost");
    summary[9] = json!(format!("=SUM(J{}:J{})", FIRST_DATA_ROW, last_part_row));
    rows.push(summary);
    rows
}

pub fn report_tab_title(record: &ReportRecord) -> String {
    format!("Report_{}", record.short_id())
}
