use crate::types::station::WeatherStation;
use serde::{Deserialize, Serialize};

/// The curated set of weather stations fires are matched against.
///
/// The registry is plain reference data: it is supplied through configuration
/// (or [`StationRegistry::default_kma_gangneung`]) and never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationRegistry {
    stations: Vec<WeatherStation>,
}

impl StationRegistry {
    pub fn new(stations: Vec<WeatherStation>) -> Self {
        Self { stations }
    }

    /// The two KMA ASOS stations covering the Gangneung area.
    pub fn default_kma_gangneung() -> Self {
        Self::new(vec![
            WeatherStation {
                station_id: 104,
                name_kr: "북강릉".to_string(),
                name_en: "Bukgangneung".to_string(),
                lat: 37.80456,
                lon: 128.85535,
            },
            WeatherStation {
                station_id: 105,
                name_kr: "강릉".to_string(),
                name_en: "Gangneung".to_string(),
                lat: 37.75146,
                lon: 128.89098,
            },
        ])
    }

    pub fn stations(&self) -> &[WeatherStation] {
        &self.stations
    }

    /// Station ids in registry order.
    pub fn ids(&self) -> Vec<i64> {
        self.stations.iter().map(|s| s.station_id).collect()
    }

    pub fn get(&self, station_id: i64) -> Option<&WeatherStation> {
        self.stations.iter().find(|s| s.station_id == station_id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::default_kma_gangneung()
    }
}
