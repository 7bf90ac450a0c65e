//! Handles settings for the admin binary. Configuration is written in
//! `settings.toml` next to the binary; every section is optional.

use chrono::{NaiveDate, Weekday};
use config::{Config, ConfigError, File};
use engine::{BusinessCalendar, ChainConcepts};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Calendar {
    /// Weekly rest days, e.g. `["Sat", "Sun"]`.
    #[serde(default)]
    pub rest_days: Vec<String>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub calendar: Option<Calendar>,
    pub chain: Option<ChainConcepts>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .build()?;

        settings.try_deserialize()
    }

    /// Builds the calendar from settings, default weekend when absent.
    pub fn calendar(&self) -> Result<BusinessCalendar, String> {
        let Some(calendar) = &self.calendar else {
            return Ok(BusinessCalendar::default());
        };

        let mut rest_days = Vec::with_capacity(calendar.rest_days.len());
        for raw in &calendar.rest_days {
            let day: Weekday = raw
                .parse()
                .map_err(|_| format!("invalid rest day: {raw}"))?;
            rest_days.push(day);
        }
        if rest_days.is_empty() {
            rest_days = vec![Weekday::Sat, Weekday::Sun];
        }

        Ok(BusinessCalendar::new(
            rest_days,
            calendar.holidays.iter().copied(),
        ))
    }
}
