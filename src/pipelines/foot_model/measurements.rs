// SPDX-License-Identifier: GPL-3.0-only

//! Foot measurements and their conversion from stored scan records

use crate::app::state::Side;
use crate::constants::geometry::{DEFAULT_ARCH_HEIGHT_MM, DEFAULT_LENGTH_MM, DEFAULT_WIDTH_MM};
use crate::errors::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arch classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchType {
    #[default]
    Normal,
    Flat,
    High,
}

impl FromStr for ArchType {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(ArchType::Normal),
            "Flat" => Ok(ArchType::Flat),
            "High" => Ok(ArchType::High),
            other => Err(GeometryError::UnknownCategory {
                field: "archType",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchType::Normal => write!(f, "Normal"),
            ArchType::Flat => write!(f, "Flat"),
            ArchType::High => write!(f, "High"),
        }
    }
}

/// Rearfoot roll classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pronation {
    #[default]
    Neutral,
    Overpronation,
    Supination,
}

impl FromStr for Pronation {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Neutral" => Ok(Pronation::Neutral),
            "Overpronation" => Ok(Pronation::Overpronation),
            "Supination" => Ok(Pronation::Supination),
            other => Err(GeometryError::UnknownCategory {
                field: "pronation",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Pronation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pronation::Neutral => write!(f, "Neutral"),
            Pronation::Overpronation => write!(f, "Overpronation"),
            Pronation::Supination => write!(f, "Supination"),
        }
    }
}

/// Per-side dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideMeasurements {
    pub length_mm: f32,
    pub width_mm: f32,
    pub arch_height_mm: f32,
}

impl Default for SideMeasurements {
    fn default() -> Self {
        Self {
            length_mm: DEFAULT_LENGTH_MM,
            width_mm: DEFAULT_WIDTH_MM,
            arch_height_mm: DEFAULT_ARCH_HEIGHT_MM,
        }
    }
}

/// Everything the geometry generator needs for a pair of feet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FootMeasurements {
    pub left: SideMeasurements,
    pub right: SideMeasurements,
    pub arch_type: ArchType,
    pub pronation: Pronation,
    /// Rearfoot angle in degrees; sign selects the tilt direction
    pub calcaneal_alignment_deg: f32,
    pub hallux_valgus_deg: f32,
    /// Carried through from the record; the surface model does not use it
    pub navicular_height_mm: Option<f32>,
}

impl FootMeasurements {
    /// Dimensions of one side
    pub fn side(&self, side: Side) -> SideMeasurements {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Reject values the surface model cannot represent
    ///
    /// Lengths must be finite and positive. Angles must be finite, and the
    /// hallux valgus angle cannot be negative.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let dimensions = [
            ("left.length_mm", self.left.length_mm),
            ("left.width_mm", self.left.width_mm),
            ("left.arch_height_mm", self.left.arch_height_mm),
            ("right.length_mm", self.right.length_mm),
            ("right.width_mm", self.right.width_mm),
            ("right.arch_height_mm", self.right.arch_height_mm),
        ];
        if let Some(&(field, value)) = dimensions
            .iter()
            .find(|(_, value)| !value.is_finite() || *value <= 0.0)
        {
            return Err(GeometryError::InvalidMeasurement { field, value });
        }

        if !self.calcaneal_alignment_deg.is_finite() {
            return Err(GeometryError::InvalidMeasurement {
                field: "calcaneal_alignment_deg",
                value: self.calcaneal_alignment_deg,
            });
        }
        if !self.hallux_valgus_deg.is_finite() || self.hallux_valgus_deg < 0.0 {
            return Err(GeometryError::InvalidMeasurement {
                field: "hallux_valgus_deg",
                value: self.hallux_valgus_deg,
            });
        }
        if let Some(navicular) = self.navicular_height_mm
            && (!navicular.is_finite() || navicular < 0.0)
        {
            return Err(GeometryError::InvalidMeasurement {
                field: "navicular_height_mm",
                value: navicular,
            });
        }
        Ok(())
    }
}

/// Measurement row as stored by the clinical data layer
///
/// Every field is optional. A missing or zero dimension falls back to the
/// adult defaults (260 × 100 mm, 25 mm arch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanRecord {
    pub left_foot_length: Option<f32>,
    pub right_foot_length: Option<f32>,
    pub left_foot_width: Option<f32>,
    pub right_foot_width: Option<f32>,
    pub left_arch_height: Option<f32>,
    pub right_arch_height: Option<f32>,
    pub arch_type: Option<String>,
    pub pronation: Option<String>,
    pub calcaneal_alignment: Option<f32>,
    pub hallux_valgus_angle: Option<f32>,
    pub navicular_height: Option<f32>,
}

impl ScanRecord {
    /// Parse a record from its JSON form
    pub fn from_json(json: &str) -> Result<Self, GeometryError> {
        serde_json::from_str(json).map_err(|e| GeometryError::InvalidRecord(e.to_string()))
    }

    /// Fill defaults, parse categories and validate
    pub fn to_measurements(&self) -> Result<FootMeasurements, GeometryError> {
        let arch_type = match self.arch_type.as_deref() {
            Some(s) => s.parse()?,
            None => ArchType::default(),
        };
        let pronation = match self.pronation.as_deref() {
            Some(s) => s.parse()?,
            None => Pronation::default(),
        };

        let measurements = FootMeasurements {
            left: SideMeasurements {
                length_mm: or_default(self.left_foot_length, DEFAULT_LENGTH_MM),
                width_mm: or_default(self.left_foot_width, DEFAULT_WIDTH_MM),
                arch_height_mm: or_default(self.left_arch_height, DEFAULT_ARCH_HEIGHT_MM),
            },
            right: SideMeasurements {
                length_mm: or_default(self.right_foot_length, DEFAULT_LENGTH_MM),
                width_mm: or_default(self.right_foot_width, DEFAULT_WIDTH_MM),
                arch_height_mm: or_default(self.right_arch_height, DEFAULT_ARCH_HEIGHT_MM),
            },
            arch_type,
            pronation,
            calcaneal_alignment_deg: self.calcaneal_alignment.unwrap_or(0.0),
            hallux_valgus_deg: self.hallux_valgus_angle.unwrap_or(0.0),
            navicular_height_mm: self.navicular_height,
        };
        measurements.validate()?;
        Ok(measurements)
    }
}

impl TryFrom<&ScanRecord> for FootMeasurements {
    type Error = GeometryError;

    fn try_from(record: &ScanRecord) -> Result<Self, Self::Error> {
        record.to_measurements()
    }
}

/// Zero counts as missing, matching how records leave unmeasured columns
fn or_default(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_parse_case_sensitively() {
        assert_eq!("Flat".parse::<ArchType>().unwrap(), ArchType::Flat);
        assert_eq!("High".parse::<ArchType>().unwrap(), ArchType::High);
        assert!(matches!(
            "flat".parse::<ArchType>(),
            Err(GeometryError::UnknownCategory { field: "archType", .. })
        ));
        assert_eq!("Supination".parse::<Pronation>().unwrap(), Pronation::Supination);
        assert!("overpronation".parse::<Pronation>().is_err());
    }

    #[test]
    fn test_empty_record_uses_defaults() {
        let m = ScanRecord::default().to_measurements().unwrap();
        assert_eq!(m.left, SideMeasurements::default());
        assert_eq!(m.right.length_mm, 260.0);
        assert_eq!(m.right.width_mm, 100.0);
        assert_eq!(m.right.arch_height_mm, 25.0);
        assert_eq!(m.arch_type, ArchType::Normal);
        assert_eq!(m.pronation, Pronation::Neutral);
        assert_eq!(m.hallux_valgus_deg, 0.0);
    }

    #[test]
    fn test_record_from_json() {
        let record = ScanRecord::from_json(
            r#"{"leftFootLength": 245, "rightFootLength": 0, "archType": "High",
                "pronation": "Overpronation", "halluxValgusAngle": 22.5}"#,
        )
        .unwrap();
        let m = record.to_measurements().unwrap();
        assert_eq!(m.left.length_mm, 245.0);
        assert_eq!(m.right.length_mm, 260.0);
        assert_eq!(m.arch_type, ArchType::High);
        assert_eq!(m.pronation, Pronation::Overpronation);
        assert_eq!(m.hallux_valgus_deg, 22.5);
    }

    #[test]
    fn test_unknown_category_in_record() {
        let record = ScanRecord {
            arch_type: Some("Cavus".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            record.to_measurements(),
            Err(GeometryError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut m = FootMeasurements::default();
        assert!(m.validate().is_ok());

        m.right.width_mm = -4.0;
        assert!(matches!(
            m.validate(),
            Err(GeometryError::InvalidMeasurement { field: "right.width_mm", .. })
        ));

        let mut m = FootMeasurements::default();
        m.left.arch_height_mm = f32::NAN;
        assert!(m.validate().is_err());

        let mut m = FootMeasurements::default();
        m.hallux_valgus_deg = -1.0;
        assert!(matches!(
            m.validate(),
            Err(GeometryError::InvalidMeasurement { field: "hallux_valgus_deg", .. })
        ));
    }

    #[test]
    fn test_negative_record_value_is_rejected_not_defaulted() {
        let record = ScanRecord {
            left_foot_length: Some(-250.0),
            ..Default::default()
        };
        assert!(record.to_measurements().is_err());
    }
}
