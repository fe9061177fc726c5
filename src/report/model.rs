use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_car: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
    #[serde(default, deserialize_with = "lenient_cost")]
    pub overall_estimated_repair_cost: f64,
    #[serde(default, deserialize_with = "lenient_parts")]
    pub parts: Vec<PartDamage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDamage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub part_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub part_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub damage_description: String,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_cost")]
    pub estimated_material_cost: f64,
    #[serde(default, deserialize_with = "lenient_cost")]
    pub estimated_paint_cost: f64,
    #[serde(default, deserialize_with = "lenient_cost")]
    pub estimated_structural_cost: f64,
    #[serde(default, deserialize_with = "lenient_cost")]
    pub estimated_total_part_cost: f64,
}

/// Identity of one persisted report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub report_id: String,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn date_string(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// First hyphen-delimited segment of the report id.
    pub fn short_id(&self) -> &str {
        self.report_id.split('-').next().unwrap_or(&self.report_id)
    }
}

/// Coerces a model-supplied cost to a number. Anything that is not a finite,
/// non-negative number or numeric string counts as zero.
pub fn coerce_cost(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() && n >= 0.0 {
        n
    } else {
        0.0
    }
}

fn lenient_cost<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(coerce_cost(&value))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_severity<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    })
}

fn lenient_parts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<PartDamage>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            continue;
        }
        parts.push(PartDamage::deserialize(item).map_err(serde::de::Error::custom)?);
    }
    Ok(parts)
}
