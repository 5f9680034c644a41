//! Column names shared between the derived tables.

pub const COL_STATION_ID: &str = "station_id";
pub const COL_DATE: &str = "date";
pub const COL_STATION_NAME_KR: &str = "name_kr";
pub const COL_STATION_NAME_EN: &str = "name_en";
pub const COL_DIST_M: &str = "dist_m";

pub const COL_FIRE_ID: &str = "fire_id";
pub const COL_FIRE_DATETIME: &str = "fire_datetime";
pub const COL_FIRE_DATE: &str = "fire_date";
pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_PROVINCE: &str = "province";
pub const COL_COUNTY: &str = "county";
pub const COL_LON: &str = "lon";
pub const COL_LAT: &str = "lat";
pub const COL_GEOMETRY: &str = "geometry";

pub const COL_FIRE_LABEL: &str = "fire_label";
pub const COL_SOURCE_FILE: &str = "__source_file";

/// Daily mean temperature.
pub const COL_TA: &str = "TA";
/// Daily minimum temperature.
pub const COL_TMN: &str = "TMN";
/// Daily maximum temperature.
pub const COL_TMX: &str = "TMX";
/// Daily precipitation.
pub const COL_RN: &str = "RN";

/// The measurement columns of the daily weather table, in output order.
pub const WEATHER_FEATURES: [&str; 4] = [COL_TA, COL_TMN, COL_TMX, COL_RN];

/// Suffix applied to weather columns that collide with fire columns in the merged table.
pub const WEATHER_SUFFIX: &str = "_w";
