//! Location risk query and the plain-text report the risk page saves.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub enum RiskQuery {
    Coordinates { lat: f64, lon: f64 },
    Address(String),
}

impl RiskQuery {
    /// `"lat, lon"` becomes coordinates; any other non-blank text is an address.
    pub fn parse(text: &str) -> AppResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("risk query is empty".to_string()));
        }
        if let Some((lat, lon)) = text.split_once(',') {
            if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
                if lat.is_finite() && lon.is_finite() {
                    return Ok(RiskQuery::Coordinates { lat, lon });
                }
            }
        }
        Ok(RiskQuery::Address(text.to_string()))
    }
}

impl fmt::Display for RiskQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskQuery::Coordinates { lat, lon } => write!(f, "{lat:.5}, {lon:.5}"),
            RiskQuery::Address(address) => f.write_str(address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        })
    }
}

/// One rated hazard with an optional explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardRating {
    pub hazard: &'static str,
    pub level: RiskLevel,
    pub note: Option<&'static str>,
}

impl fmt::Display for HazardRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.note {
            Some(note) => write!(f, "{}: {} ({note})", self.hazard, self.level),
            None => write!(f, "{}: {}", self.hazard, self.level),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub query: RiskQuery,
    pub generated_at: DateTime<Local>,
    pub hazards: Vec<HazardRating>,
    pub overall: RiskLevel,
}

impl RiskReport {
    pub fn assess(query: RiskQuery) -> Self {
        Self::assess_at(query, Local::now())
    }

    /// Ratings are fixed; no hazard model is consulted.
    pub fn assess_at(query: RiskQuery, generated_at: DateTime<Local>) -> Self {
        Self {
            query,
            generated_at,
            hazards: vec![
                HazardRating {
                    hazard: "Flood Risk (100-year return)",
                    level: RiskLevel::Medium,
                    note: Some("Projected inundation depth 0.5m"),
                },
                HazardRating {
                    hazard: "Typhoon Risk",
                    level: RiskLevel::High,
                    note: Some("Located on historical typhoon path"),
                },
                HazardRating {
                    hazard: "Geological Risk",
                    level: RiskLevel::Low,
                    note: None,
                },
            ],
            overall: RiskLevel::High,
        }
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![
            "Risk Analysis Report".to_string(),
            String::new(),
            format!("Queried Location: {}", self.query),
            format!(
                "Report Generation Time: {}",
                self.generated_at.format("%Y-%m-%d %H:%M:%S")
            ),
            String::new(),
        ];
        lines.extend(self.hazards.iter().map(ToString::to_string));
        lines.push(String::new());
        lines.push(format!("Overall Risk Rating: {}", self.overall));
        lines.join("\n")
    }

    /// `Risk_Report_<unix millis>.txt`
    pub fn file_name(&self) -> String {
        format!("Risk_Report_{}.txt", self.generated_at.timestamp_millis())
    }

    pub fn save(&self, dir: &Path) -> AppResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render_text())?;
        info!(path = %path.display(), "saved risk report");
        Ok(path)
    }
}
