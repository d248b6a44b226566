//! Controlled-vocabulary normalization of participant attributes.
//!
//! Nothing here fails: every raw value maps to a canonical term or to
//! [`MISSING`](crate::domain::MISSING).

use std::fmt;

use serde::Serialize;

use crate::domain::MISSING;

pub const MAX_AGE: i64 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Race {
    Asian,
    AfricanAmerican,
    Multiracial,
    NativeHawaiianOrOtherPacificIslander,
    White,
    Missing,
}

impl Race {
    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Asian => "Asian",
            Race::AfricanAmerican => "African American",
            Race::Multiracial => "Multiracial",
            Race::NativeHawaiianOrOtherPacificIslander => {
                "Native Hawaiian or Other Pacific Islander"
            }
            Race::White => "White",
            Race::Missing => MISSING,
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match synonym table. Spellings follow the sample sheets seen so far,
/// including the "Hawiian" typo.
fn race_synonym(raw: &str) -> Option<Race> {
    let race = match raw {
        "Asian" | "asian" => Race::Asian,
        "Black or African American" => Race::AfricanAmerican,
        "mixed/asian & white" | "mixed/Asian &Black" | "mixed/black, white, asian" => {
            Race::Multiracial
        }
        "Native Hawiian or other Pacific Islander" | "Pacific Islander" => {
            Race::NativeHawaiianOrOtherPacificIslander
        }
        "White" | "white" => Race::White,
        MISSING => Race::Missing,
        _ => return None,
    };
    Some(race)
}

pub fn is_known_race(raw: &str) -> bool {
    race_synonym(raw).is_some()
}

/// Unlisted values, including malformed ones, deliberately become
/// `Multiracial`.
pub fn normalize_race(raw: Option<&str>) -> Race {
    match raw.map(str::trim) {
        None | Some("") => Race::Missing,
        Some(value) => race_synonym(value).unwrap_or(Race::Multiracial),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Known(String),
    Missing,
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Known(value) => value,
            Gender::Missing => MISSING,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalize_gender(raw: Option<&str>) -> Gender {
    match raw.map(str::trim) {
        None | Some("") | Some(MISSING) => Gender::Missing,
        Some(value) => Gender::Known(capitalize(value)),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Age {
    Years(u8),
    Missing,
}

impl Age {
    /// Rendered form for the donor `- Age` property.
    pub fn render(&self) -> String {
        match self {
            Age::Years(years) => format!("{years} years"),
            Age::Missing => MISSING.to_string(),
        }
    }
}

pub fn normalize_age(raw: Option<&str>) -> Age {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Age::Missing;
    };
    let parsed = value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|float| float.fract() == 0.0 && float.abs() < 1e12)
            .map(|float| float as i64)
    });
    match parsed {
        Some(years) if (0..=MAX_AGE).contains(&years) => Age::Years(years as u8),
        _ => Age::Missing,
    }
}
