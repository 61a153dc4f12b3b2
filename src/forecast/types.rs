use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown units: {0}")]
pub struct UnknownUnits(pub String);

/// Temperature unit system chosen by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Units {
    #[default]
    C,
    F,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::C => "C",
            Units::F => "F",
        }
    }

    /// Value of the forecast API's `temperature_unit` parameter.
    pub fn temperature_unit(&self) -> &'static str {
        match self {
            Units::C => "celsius",
            Units::F => "fahrenheit",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = UnknownUnits;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" | "c" => Ok(Units::C),
            "F" | "f" => Ok(Units::F),
            other => Err(UnknownUnits(other.to_string())),
        }
    }
}

impl TryFrom<String> for Units {
    type Error = UnknownUnits;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// Geocoding API

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodingResponse {
    /// Missing and `null` both mean no match.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<Location>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub admin1: Option<String>,
    pub country: Option<String>,
}

impl Location {
    /// "Name, Region, Country", skipping the parts upstream left out.
    pub fn display_name(&self) -> String {
        let mut full = self.name.clone();
        for part in [&self.admin1, &self.country].into_iter().flatten() {
            if !part.is_empty() {
                full.push_str(", ");
                full.push_str(part);
            }
        }
        full
    }
}

// Forecast API

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub daily: DailyBlock,
}

/// Parallel per-day arrays as returned upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBlock {
    pub time: Vec<NaiveDate>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
    pub weathercode: Vec<Option<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub weather_code: Option<u8>,
    pub conditions: Option<String>,
}

/// Normalized forecast payload; this is what the cache holds.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub days: Vec<DailyForecast>,
    pub units: Units,
}

impl Forecast {
    /// Zips the daily arrays index by index. Arrays of unequal length are
    /// truncated to the shortest one.
    pub fn from_response(response: ForecastResponse, units: Units) -> Self {
        let DailyBlock {
            time,
            temperature_2m_max,
            temperature_2m_min,
            precipitation_sum,
            weathercode,
        } = response.daily;

        let days = time
            .into_iter()
            .zip(temperature_2m_max)
            .zip(temperature_2m_min)
            .zip(precipitation_sum)
            .zip(weathercode)
            .map(|((((date, temp_max), temp_min), precipitation_sum), weather_code)| {
                DailyForecast {
                    date,
                    temp_max,
                    temp_min,
                    precipitation_sum,
                    weather_code,
                    conditions: weather_code.map(|code| describe_weather_code(code).to_string()),
                }
            })
            .collect();

        Self {
            latitude: response.latitude,
            longitude: response.longitude,
            timezone: response.timezone,
            days,
            units,
        }
    }
}

/// Russian description of a WMO weather interpretation code.
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "Ясно",
        1 => "Преимущественно ясно",
        2 => "Переменная облачность",
        3 => "Пасмурно",
        45 | 48 => "Туман",
        51 | 53 | 55 => "Морось",
        56 | 57 => "Ледяная морось",
        61 | 63 | 65 => "Дождь",
        66 | 67 => "Ледяной дождь",
        71 | 73 | 75 => "Снегопад",
        77 => "Снежные зёрна",
        80..=82 => "Ливень",
        85 | 86 => "Снежный ливень",
        95 => "Гроза",
        96 | 99 => "Гроза с градом",
        _ => "Неизвестно",
    }
}

// Place search API

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceSearchResult {
    pub display_name: String,
}
