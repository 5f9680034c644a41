//! Declarative mapping from logical weather fields to the raw column names
//! the various station exports use for them.

use crate::types::columns::{COL_DATE, COL_RN, COL_STATION_ID, COL_TA, COL_TMN, COL_TMX};
use crate::weather_data::error::WeatherDataError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherField {
    StationId,
    ObsDate,
    MeanTemperature,
    MinTemperature,
    MaxTemperature,
    Precipitation,
}

impl WeatherField {
    pub const ALL: [WeatherField; 6] = [
        WeatherField::StationId,
        WeatherField::ObsDate,
        WeatherField::MeanTemperature,
        WeatherField::MinTemperature,
        WeatherField::MaxTemperature,
        WeatherField::Precipitation,
    ];

    /// Column name of this field in the daily table.
    pub fn output_column(&self) -> &'static str {
        match self {
            WeatherField::StationId => COL_STATION_ID,
            WeatherField::ObsDate => COL_DATE,
            WeatherField::MeanTemperature => COL_TA,
            WeatherField::MinTemperature => COL_TMN,
            WeatherField::MaxTemperature => COL_TMX,
            WeatherField::Precipitation => COL_RN,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, WeatherField::StationId | WeatherField::ObsDate)
    }
}

impl fmt::Display for WeatherField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeatherField::StationId => "station id",
            WeatherField::ObsDate => "observation date",
            WeatherField::MeanTemperature => "mean temperature",
            WeatherField::MinTemperature => "minimum temperature",
            WeatherField::MaxTemperature => "maximum temperature",
            WeatherField::Precipitation => "precipitation",
        };
        f.write_str(name)
    }
}

/// Ordered alias lists per field. Matching is case-insensitive and earlier
/// aliases win when a file carries several candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMapping {
    pub station_id: Vec<String>,
    pub obs_date: Vec<String>,
    pub mean_temperature: Vec<String>,
    pub min_temperature: Vec<String>,
    pub max_temperature: Vec<String>,
    pub precipitation: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for SchemaMapping {
    /// Column names found in KMA ASOS daily exports (English codes and Korean headers).
    fn default() -> Self {
        Self {
            station_id: aliases(&["STN", "stn", "stnid", "지점", "지점번호"]),
            obs_date: aliases(&["TM", "날짜", "date", "YYYYMMDD", "일시"]),
            mean_temperature: aliases(&["TA", "TAVG", "평균기온", "avgTa", "평균기온(°C)"]),
            min_temperature: aliases(&["TMN", "최저기온", "최저기온(°C)"]),
            max_temperature: aliases(&["TMX", "최고기온", "최고기온(°C)"]),
            precipitation: aliases(&["RN", "PRCP", "강수량", "일강수량(mm)"]),
        }
    }
}

impl SchemaMapping {
    pub fn aliases(&self, field: WeatherField) -> &[String] {
        match field {
            WeatherField::StationId => &self.station_id,
            WeatherField::ObsDate => &self.obs_date,
            WeatherField::MeanTemperature => &self.mean_temperature,
            WeatherField::MinTemperature => &self.min_temperature,
            WeatherField::MaxTemperature => &self.max_temperature,
            WeatherField::Precipitation => &self.precipitation,
        }
    }

    /// Resolves each field against the raw column names.
    ///
    /// Every raw column matching an alias is kept, in alias order, so files that
    /// disagree on naming can be coalesced after a union concat. A raw column is
    /// claimed by at most one field. Fails when station id or date has no match.
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> Result<ResolvedColumns, WeatherDataError> {
        let mut claimed: Vec<&str> = Vec::new();
        let mut fields = Vec::with_capacity(WeatherField::ALL.len());

        for field in WeatherField::ALL {
            let mut matched = Vec::new();
            for alias in self.aliases(field) {
                let alias = alias.trim().to_lowercase();
                for column in columns.iter().map(|c| c.as_ref()) {
                    if column.trim().to_lowercase() == alias && !claimed.contains(&column) {
                        claimed.push(column);
                        matched.push(column.to_string());
                    }
                }
            }

            if matched.is_empty() && field.is_required() {
                return Err(WeatherDataError::MissingRequiredColumn {
                    field,
                    aliases: self.aliases(field).join(", "),
                });
            }
            fields.push((field, matched));
        }

        Ok(ResolvedColumns { fields })
    }
}

/// The raw columns found for each field, in coalescing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumns {
    fields: Vec<(WeatherField, Vec<String>)>,
}

impl ResolvedColumns {
    pub fn columns(&self, field: WeatherField) -> &[String] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, columns)| columns.as_slice())
            .unwrap_or_default()
    }

    pub fn is_present(&self, field: WeatherField) -> bool {
        !self.columns(field).is_empty()
    }
}

impl fmt::Display for ResolvedColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, columns)| {
                if columns.is_empty() {
                    format!("{}=<absent>", field.output_column())
                } else {
                    format!("{}={}", field.output_column(), columns.join("|"))
                }
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_english_codes_case_insensitively() {
        let resolved = SchemaMapping::default()
            .resolve(&["stn", "tm", "ta", "rn", "__source_file"])
            .unwrap();
        assert_eq!(resolved.columns(WeatherField::StationId), ["stn"]);
        assert_eq!(resolved.columns(WeatherField::ObsDate), ["tm"]);
        assert_eq!(resolved.columns(WeatherField::MeanTemperature), ["ta"]);
        assert!(!resolved.is_present(WeatherField::MinTemperature));
        assert_eq!(resolved.columns(WeatherField::Precipitation), ["rn"]);
    }

    #[test]
    fn resolves_korean_headers() {
        let resolved = SchemaMapping::default()
            .resolve(&["지점", "지점명", "일시", "평균기온(°C)", "최저기온(°C)", "최고기온(°C)", "일강수량(mm)"])
            .unwrap();
        assert_eq!(resolved.columns(WeatherField::StationId), ["지점"]);
        assert_eq!(resolved.columns(WeatherField::ObsDate), ["일시"]);
        assert_eq!(resolved.columns(WeatherField::MinTemperature), ["최저기온(°C)"]);
        assert_eq!(resolved.columns(WeatherField::Precipitation), ["일강수량(mm)"]);
    }

    #[test]
    fn union_of_files_keeps_every_alias_in_order() {
        let resolved = SchemaMapping::default()
            .resolve(&["지점", "STN", "일시", "TM"])
            .unwrap();
        assert_eq!(resolved.columns(WeatherField::StationId), ["STN", "지점"]);
        assert_eq!(resolved.columns(WeatherField::ObsDate), ["TM", "일시"]);
    }

    #[test]
    fn missing_station_or_date_is_fatal() {
        let err = SchemaMapping::default().resolve(&["TM", "TA"]).unwrap_err();
        assert!(matches!(
            err,
            WeatherDataError::MissingRequiredColumn {
                field: WeatherField::StationId,
                ..
            }
        ));
        let err = SchemaMapping::default().resolve(&["STN", "TA"]).unwrap_err();
        assert!(matches!(
            err,
            WeatherDataError::MissingRequiredColumn {
                field: WeatherField::ObsDate,
                ..
            }
        ));
    }

    #[test]
    fn custom_mapping_from_json() {
        let mapping: SchemaMapping =
            serde_json::from_str(r#"{ "station_id": ["station"], "obs_date": ["day"] }"#).unwrap();
        let resolved = mapping.resolve(&["Station", "Day", "TA"]).unwrap();
        assert_eq!(resolved.columns(WeatherField::StationId), ["Station"]);
        // Unspecified fields keep their defaults.
        assert_eq!(resolved.columns(WeatherField::MeanTemperature), ["TA"]);
    }
}
