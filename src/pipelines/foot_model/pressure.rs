// SPDX-License-Identifier: GPL-3.0-only

//! Plantar pressure heuristic and heat-map colours
//!
//! Pressure is a modelled estimate per surface node, not a measurement. The
//! coefficients live in [`PressureParams`] so a site can tune them from the
//! config file.

use super::measurements::{ArchType, Pronation};
use crate::constants::pressure::{FIRST_STOP, HIGH, LOW, MID_HIGH, MID_LOW, SECOND_STOP};
use serde::{Deserialize, Serialize};

/// Regional base loads and condition adjustments
///
/// Empirical values pending clinical review; override them through the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureParams {
    pub heel: f32,
    /// Extra heel load on the inside (overpronation) or outside (supination)
    pub heel_roll: f32,
    pub ball: f32,
    /// Extra medial forefoot load under overpronation
    pub ball_medial: f32,
    pub toes: f32,
    pub hallux_boost: f32,
    /// Hallux valgus angle above which the toe region gains `hallux_boost`
    pub hallux_boost_min_deg: f32,
    pub midfoot_flat: f32,
    pub midfoot_normal: f32,
    pub midfoot_high: f32,
    /// Weight of the `sin(π tz)` arch curve in the midfoot
    pub midfoot_curve: f32,
    /// Load added towards the medial and lateral borders
    pub edge_boost: f32,
}

impl Default for PressureParams {
    fn default() -> Self {
        Self {
            heel: 0.75,
            heel_roll: 0.15,
            ball: 0.65,
            ball_medial: 0.2,
            toes: 0.45,
            hallux_boost: 0.1,
            hallux_boost_min_deg: 15.0,
            midfoot_flat: 0.45,
            midfoot_normal: 0.2,
            midfoot_high: 0.1,
            midfoot_curve: 0.1,
            edge_boost: 0.08,
        }
    }
}

/// Foot-wide inputs to the pressure model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureInputs {
    pub arch_type: ArchType,
    pub pronation: Pronation,
    pub hallux_valgus_deg: f32,
}

impl PressureParams {
    /// Modelled pressure in `[0, 1]` at grid position `(tx, tz)`
    ///
    /// `tx` runs from the medial border (0) to the lateral border (1), `tz`
    /// from the heel (0) to the toe tips (1).
    pub fn pressure_at(&self, inputs: &PressureInputs, tx: f32, tz: f32) -> f32 {
        let medial = 1.0 - tx;
        let lateral = tx;
        let edge = 1.0 - 2.0 * (tx - 0.5).abs();

        let regional = if tz < 0.15 {
            let roll = match inputs.pronation {
                Pronation::Overpronation => self.heel_roll * medial,
                Pronation::Supination => self.heel_roll * lateral,
                Pronation::Neutral => 0.0,
            };
            self.heel + roll
        } else if tz > 0.58 && tz < 0.78 {
            let roll = match inputs.pronation {
                Pronation::Overpronation => self.ball_medial * medial,
                _ => 0.0,
            };
            self.ball + roll
        } else if tz > 0.85 {
            if inputs.hallux_valgus_deg > self.hallux_boost_min_deg {
                self.toes + self.hallux_boost
            } else {
                self.toes
            }
        } else {
            let base = match inputs.arch_type {
                ArchType::Flat => self.midfoot_flat,
                ArchType::High => self.midfoot_high,
                ArchType::Normal => self.midfoot_normal,
            };
            base + self.midfoot_curve * (std::f32::consts::PI * tz).sin()
        };

        (regional + self.edge_boost * (1.0 - edge)).clamp(0.0, 1.0)
    }
}

/// Split a `0xRRGGBB` value into sRGB components in `[0, 1]`
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

fn lerp_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Heat-map colour for a pressure value
///
/// Blue → green → yellow → red, piecewise linear with stops at 0.33 and
/// 0.66. Out-of-range input is clamped.
pub fn pressure_color(value: f32) -> [f32; 3] {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    if v < FIRST_STOP {
        lerp_rgb(hex_to_rgb(LOW), hex_to_rgb(MID_LOW), v / FIRST_STOP)
    } else if v < SECOND_STOP {
        lerp_rgb(
            hex_to_rgb(MID_LOW),
            hex_to_rgb(MID_HIGH),
            (v - FIRST_STOP) / (SECOND_STOP - FIRST_STOP),
        )
    } else {
        lerp_rgb(
            hex_to_rgb(MID_HIGH),
            hex_to_rgb(HIGH),
            (v - SECOND_STOP) / (1.0 - SECOND_STOP),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    fn neutral() -> PressureInputs {
        PressureInputs {
            arch_type: ArchType::Normal,
            pronation: Pronation::Neutral,
            hallux_valgus_deg: 0.0,
        }
    }

    #[test]
    fn test_color_endpoints_and_stops() {
        assert!(close(pressure_color(0.0), hex_to_rgb(LOW)));
        assert!(close(pressure_color(0.33), hex_to_rgb(MID_LOW)));
        assert!(close(pressure_color(0.66), hex_to_rgb(MID_HIGH)));
        assert!(close(pressure_color(1.0), hex_to_rgb(HIGH)));
    }

    #[test]
    fn test_color_is_continuous_at_stops() {
        for stop in [FIRST_STOP, SECOND_STOP] {
            let below = pressure_color(stop - 1e-4);
            let above = pressure_color(stop + 1e-4);
            assert!(close(below, above), "jump at {}", stop);
        }
    }

    #[test]
    fn test_color_clamps_input() {
        assert_eq!(pressure_color(-3.0), pressure_color(0.0));
        assert_eq!(pressure_color(7.0), pressure_color(1.0));
        assert_eq!(pressure_color(f32::NAN), pressure_color(0.0));
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex_to_rgb(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_regional_loads() {
        let params = PressureParams::default();
        let inputs = neutral();
        // Centre line has no edge boost
        assert!((params.pressure_at(&inputs, 0.5, 0.05) - 0.75).abs() < 1e-6);
        assert!((params.pressure_at(&inputs, 0.5, 0.7) - 0.65).abs() < 1e-6);
        assert!((params.pressure_at(&inputs, 0.5, 0.9) - 0.45).abs() < 1e-6);
        let midfoot = 0.2 + 0.1 * (std::f32::consts::PI * 0.4).sin();
        assert!((params.pressure_at(&inputs, 0.5, 0.4) - midfoot).abs() < 1e-6);
    }

    #[test]
    fn test_overpronation_loads_medial_heel() {
        let params = PressureParams::default();
        let inputs = PressureInputs {
            pronation: Pronation::Overpronation,
            ..neutral()
        };
        let medial = params.pressure_at(&inputs, 0.1, 0.05);
        let lateral = params.pressure_at(&inputs, 0.9, 0.05);
        assert!(medial > lateral);
    }

    #[test]
    fn test_flat_arch_loads_midfoot() {
        let params = PressureParams::default();
        let flat = PressureInputs {
            arch_type: ArchType::Flat,
            ..neutral()
        };
        let high = PressureInputs {
            arch_type: ArchType::High,
            ..neutral()
        };
        assert!(params.pressure_at(&flat, 0.5, 0.4) > params.pressure_at(&high, 0.5, 0.4));
    }

    #[test]
    fn test_pressure_is_clamped() {
        let params = PressureParams {
            heel: 5.0,
            ..Default::default()
        };
        assert_eq!(params.pressure_at(&neutral(), 0.0, 0.0), 1.0);
    }
}
