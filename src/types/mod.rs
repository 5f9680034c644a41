pub mod columns;
pub mod station;
pub mod weather_daily_frame;
