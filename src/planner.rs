use serde::Serialize;

use crate::schema::FieldGroups;

/// Which views the schema can structurally support. Derived from schema shape
/// only; no data is inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationFlags {
    pub time_series: bool,
    pub ranking: bool,
    pub kpi_summary: bool,
    pub period_selector: bool,
}

impl VisualizationFlags {
    pub fn any(&self) -> bool {
        self.time_series || self.ranking || self.kpi_summary || self.period_selector
    }
}

pub fn plan_visualizations(groups: &FieldGroups) -> VisualizationFlags {
    let has_numbers = !groups.number_fields.is_empty();
    VisualizationFlags {
        time_series: !groups.date_fields.is_empty() && has_numbers,
        ranking: !groups.text_fields.is_empty() && has_numbers,
        kpi_summary: has_numbers,
        period_selector: groups.period_field.is_some(),
    }
}
