//! Discrepancies: one visual difference between a design and a website.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{ComparisonId, DiscrepancyId};

/// Kind of visual difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyType {
    Color,
    Size,
    Typography,
    Position,
    Layout,
    Other,
}

impl DiscrepancyType {
    pub const ALL: [DiscrepancyType; 6] = [
        DiscrepancyType::Color,
        DiscrepancyType::Size,
        DiscrepancyType::Typography,
        DiscrepancyType::Position,
        DiscrepancyType::Layout,
        DiscrepancyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyType::Color => "color",
            DiscrepancyType::Size => "size",
            DiscrepancyType::Typography => "typography",
            DiscrepancyType::Position => "position",
            DiscrepancyType::Layout => "layout",
            DiscrepancyType::Other => "other",
        }
    }
}

impl FromStr for DiscrepancyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| {
                DomainError::validation(
                    "type must be one of: color, size, typography, position, layout, other",
                )
            })
    }
}

/// How urgent a discrepancy is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyPriority {
    High,
    Medium,
    Low,
}

impl DiscrepancyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyPriority::High => "high",
            DiscrepancyPriority::Medium => "medium",
            DiscrepancyPriority::Low => "low",
        }
    }
}

impl FromStr for DiscrepancyPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(DiscrepancyPriority::High),
            "medium" => Ok(DiscrepancyPriority::Medium),
            "low" => Ok(DiscrepancyPriority::Low),
            _ => Err(DomainError::validation(
                "priority must be one of: high, medium, low",
            )),
        }
    }
}

/// Review status of a discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscrepancyStatus {
    Open,
    InProgress,
    Resolved,
}

impl DiscrepancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyStatus::Open => "open",
            DiscrepancyStatus::InProgress => "in-progress",
            DiscrepancyStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for DiscrepancyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(DiscrepancyStatus::Open),
            "in-progress" | "in_progress" => Ok(DiscrepancyStatus::InProgress),
            "resolved" => Ok(DiscrepancyStatus::Resolved),
            _ => Err(DomainError::validation(
                "status must be one of: open, in-progress, resolved",
            )),
        }
    }
}

/// Marker shape drawn over the screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Rectangle,
    Circle,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Rectangle => "rectangle",
            Shape::Circle => "circle",
        }
    }
}

impl FromStr for Shape {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangle" => Ok(Shape::Rectangle),
            "circle" => Ok(Shape::Circle),
            _ => Err(DomainError::validation("shape must be one of: rectangle, circle")),
        }
    }
}

/// Marker position in a 0–100 relative coordinate space.
///
/// Values are stored as given; nothing clamps them to the 0–100 range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub shape: Shape,
}

impl Coordinates {
    pub const DEFAULT_X: f64 = 0.0;
    pub const DEFAULT_Y: f64 = 0.0;
    pub const DEFAULT_WIDTH: f64 = 10.0;
    pub const DEFAULT_HEIGHT: f64 = 10.0;

    pub fn new(x: f64, y: f64, width: f64, height: f64, shape: Shape) -> Self {
        Self {
            x,
            y,
            width,
            height,
            shape,
        }
    }
}

/// Placeholder marker used when a finding carries no usable position.
impl Default for Coordinates {
    fn default() -> Self {
        Self {
            x: Self::DEFAULT_X,
            y: Self::DEFAULT_Y,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            shape: Shape::Rectangle,
        }
    }
}

/// A persisted discrepancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub id: DiscrepancyId,
    pub comparison_id: ComparisonId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DiscrepancyType,
    pub priority: DiscrepancyPriority,
    pub status: DiscrepancyStatus,
    pub coordinates: Coordinates,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discrepancy {
    /// Build a new discrepancy. Every discrepancy starts `open`.
    pub fn new(
        comparison_id: ComparisonId,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: DiscrepancyType,
        priority: DiscrepancyPriority,
        coordinates: Coordinates,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DiscrepancyId::new(),
            comparison_id,
            title: title.into(),
            description: description.into(),
            kind,
            priority,
            status: DiscrepancyStatus::Open,
            coordinates,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update from a reviewer.
    ///
    /// Titles may not be blanked out; everything else is a plain overwrite.
    pub fn apply_update(
        &mut self,
        update: &DiscrepancyUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(DomainError::validation("title must not be empty"));
            }
        }

        if let Some(title) = &update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Discrepancy {
    type Id = DiscrepancyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial update of the reviewer-managed fields of a discrepancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<DiscrepancyPriority>,
    pub status: Option<DiscrepancyStatus>,
}

impl DiscrepancyUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    pub fn status(status: DiscrepancyStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: DiscrepancyPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Discrepancy {
        Discrepancy::new(
            ComparisonId::new(),
            "Button color",
            "Primary button is darker than the mockup",
            DiscrepancyType::Color,
            DiscrepancyPriority::High,
            Coordinates::new(10.0, 10.0, 50.0, 20.0, Shape::Rectangle),
            Utc::now(),
        )
    }

    #[test]
    fn new_discrepancy_is_open() {
        assert_eq!(sample().status, DiscrepancyStatus::Open);
    }

    #[test]
    fn default_coordinates_are_placeholder_box() {
        let c = Coordinates::default();
        assert_eq!((c.x, c.y, c.width, c.height), (0.0, 0.0, 10.0, 10.0));
        assert_eq!(c.shape, Shape::Rectangle);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Color".parse::<DiscrepancyType>().unwrap(), DiscrepancyType::Color);
        assert_eq!(" HIGH ".parse::<DiscrepancyPriority>().unwrap(), DiscrepancyPriority::High);
        assert_eq!("in_progress".parse::<DiscrepancyStatus>().unwrap(), DiscrepancyStatus::InProgress);
        assert_eq!("Circle".parse::<Shape>().unwrap(), Shape::Circle);
        assert!("spacing".parse::<DiscrepancyType>().is_err());
        assert!("urgent".parse::<DiscrepancyPriority>().is_err());
    }

    #[test]
    fn serializes_with_wire_names() {
        let mut d = sample();
        d.status = DiscrepancyStatus::InProgress;
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "color");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["coordinates"]["shape"], "rectangle");
        assert!(json.get("comparisonId").is_some());
    }

    #[test]
    fn apply_update_overwrites_given_fields_only() {
        let mut d = sample();
        let before = d.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);

        d.apply_update(&DiscrepancyUpdate::status(DiscrepancyStatus::Resolved), later)
            .unwrap();

        assert_eq!(d.status, DiscrepancyStatus::Resolved);
        assert_eq!(d.priority, before.priority);
        assert_eq!(d.title, before.title);
        assert_eq!(d.updated_at, later);
    }

    #[test]
    fn apply_update_rejects_blank_title() {
        let mut d = sample();
        let update = DiscrepancyUpdate {
            title: Some("   ".to_string()),
            priority: Some(DiscrepancyPriority::Low),
            ..DiscrepancyUpdate::default()
        };

        assert!(d.apply_update(&update, Utc::now()).is_err());
        // Rejected updates leave the record untouched.
        assert_eq!(d.priority, DiscrepancyPriority::High);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(DiscrepancyUpdate::default().is_empty());
        assert!(!DiscrepancyUpdate::priority(DiscrepancyPriority::Low).is_empty());
    }
}
