//! YAML report profiles.
//!
//! A profile pins down how a particular pair of sheets should be read and
//! summarized, so the same settings need not be repeated on every
//! invocation. Every key is optional:
//!
//! ```yaml
//! config_layout: headers    # or fixed
//! alignment: index          # or header
//! date_order: day_first     # or month_first
//! absent_values: none       # or zero
//! top_n: 5
//! date_field: fecha
//! period_field: ciclo
//! ranking:
//!   group_field: region
//!   number_fields: [ventas]
//! series:
//!   number_fields: [ventas, unidades]
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    dates::DateOrder,
    ranking::DEFAULT_TOP_N,
    records::Alignment,
    report::ReportOptions,
    schema::ConfigLayout,
    stats::AbsencePolicy,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingProfile {
    pub group_field: Option<String>,
    pub number_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeriesProfile {
    pub number_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub config_layout: ConfigLayout,
    pub alignment: Alignment,
    pub date_order: DateOrder,
    pub absent_values: AbsencePolicy,
    pub top_n: Option<usize>,
    pub date_field: Option<String>,
    pub period_field: Option<String>,
    pub ranking: RankingProfile,
    pub series: SeriesProfile,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening profile {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).with_context(|| format!("Parsing profile YAML {path:?}"))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Parsing profile YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing profile YAML")
    }

    pub fn to_options(&self) -> ReportOptions {
        ReportOptions {
            layout: self.config_layout,
            alignment: self.alignment,
            date_order: self.date_order,
            absence: self.absent_values,
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
            date_field: self.date_field.clone(),
            period_field: self.period_field.clone(),
            ranking_group: self.ranking.group_field.clone(),
            ranking_fields: self.ranking.number_fields.clone(),
            series_fields: self.series.number_fields.clone(),
            ..ReportOptions::default()
        }
    }
}
