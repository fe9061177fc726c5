use super::model::DamageReport;

/// Recomputes every part total and the overall total from the three cost
/// fields. Model-supplied totals are always overwritten and negative costs are
/// clamped to zero.
///
/// Rounding is `f64::round` (half away from zero). The overall total is the
/// rounded sum of the unrounded part totals.
pub fn normalize(mut report: DamageReport) -> DamageReport {
    let mut overall = 0.0;

    for part in &mut report.parts {
        part.estimated_material_cost = non_negative(part.estimated_material_cost);
        part.estimated_paint_cost = non_negative(part.estimated_paint_cost);
        part.estimated_structural_cost = non_negative(part.estimated_structural_cost);

        let part_total = part.estimated_material_cost
            + part.estimated_paint_cost
            + part.estimated_structural_cost;
        part.estimated_total_part_cost = part_total.round();
        overall += part_total;
    }

    report.overall_estimated_repair_cost = overall.round();
    report
}

/// Costs are never negative; anything below zero or not finite counts as zero.
fn non_negative(cost: f64) -> f64 {
    if cost.is_finite() && cost > 0.0 {
        cost
    } else {
        0.0
    }
}
