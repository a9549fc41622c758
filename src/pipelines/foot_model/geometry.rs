// SPDX-License-Identifier: GPL-3.0-only

//! Parametric foot surface
//!
//! Each foot is a `segments_x × segments_z` grid over `(tx, tz) ∈ [0,1]²`:
//!
//! ```text
//!   tz = 1  toes   ┌───────────┐
//!                  │  ball     │
//!                  │  midfoot  │   tx = 0 medial border, tx = 1 lateral border
//!   tz = 0  heel   └───────────┘
//! ```
//!
//! Nodes are laid out in a lateral-positive frame `u` and mirrored into the
//! scene by the side's lateral direction, so the left foot is the exact
//! mirror image of the right for equal measurements. Scene units are
//! centimetres; the surface faces +Y and the toes point to +Z.

use super::measurements::{ArchType, FootMeasurements, Pronation, SideMeasurements};
use super::pressure::{PressureInputs, PressureParams, hex_to_rgb, pressure_color};
use crate::app::state::Side;
use crate::constants::geometry::{
    GUIDE_OFFSET, LEFT_TINT, MM_TO_UNITS, RIGHT_TINT, SEGMENTS_X, SEGMENTS_Z, SIDE_OFFSET,
};
use crate::errors::GeometryError;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::{debug, info};

/// Medial/lateral weighting of the arch rise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchMultipliers {
    pub medial: f32,
    pub lateral: f32,
}

/// Shape coefficients
///
/// Heights and shifts are in scene units. The defaults describe a generic
/// adult foot and are meant to be tuned per site through the config file.
/// They are empirical and have not been clinically validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryParams {
    pub segments_x: u32,
    pub segments_z: u32,
    pub mm_to_units: f32,
    /// Minimum distance of each foot's centre line from the scene midline
    pub side_offset: f32,

    pub arch_normal: ArchMultipliers,
    pub arch_flat: ArchMultipliers,
    pub arch_high: ArchMultipliers,
    pub arch_scale: f32,

    pub heel_bump: f32,
    pub ball_bump: f32,
    /// Toe centres in `tx`, big toe first
    pub toe_centers: [f32; 5],
    pub toe_radius: f32,
    pub toe_height: f32,
    /// Height lost per toe away from the big toe
    pub toe_falloff: f32,

    pub overpronation_tilt: f32,
    pub supination_tilt: f32,
    pub calcaneal_tilt: f32,
    pub calcaneal_reference_deg: f32,

    pub hallux_min_deg: f32,
    pub hallux_reference_deg: f32,
    pub hallux_shift: f32,
    pub hallux_reach: f32,
    pub bunion_min_deg: f32,
    pub bunion_height: f32,
    pub bunion_radius: f32,

    /// Forefoot shift towards the medial side, as a fraction of the width
    pub medial_bulge: f32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            segments_x: SEGMENTS_X,
            segments_z: SEGMENTS_Z,
            mm_to_units: MM_TO_UNITS,
            side_offset: SIDE_OFFSET,
            arch_normal: ArchMultipliers {
                medial: 1.0,
                lateral: 0.35,
            },
            arch_flat: ArchMultipliers {
                medial: 0.3,
                lateral: 0.15,
            },
            arch_high: ArchMultipliers {
                medial: 1.4,
                lateral: 0.6,
            },
            arch_scale: 0.5,
            heel_bump: 0.4,
            ball_bump: 0.2,
            toe_centers: [0.15, 0.30, 0.45, 0.60, 0.75],
            toe_radius: 0.08,
            toe_height: 0.15,
            toe_falloff: 0.15,
            overpronation_tilt: 0.15,
            supination_tilt: 0.12,
            calcaneal_tilt: 0.2,
            calcaneal_reference_deg: 15.0,
            hallux_min_deg: 10.0,
            hallux_reference_deg: 45.0,
            hallux_shift: 0.8,
            hallux_reach: 0.15,
            bunion_min_deg: 15.0,
            bunion_height: 0.12,
            bunion_radius: 0.08,
            medial_bulge: 0.04,
        }
    }
}

impl GeometryParams {
    /// Arch multipliers for a classification
    pub fn arch_multipliers(&self, arch_type: ArchType) -> ArchMultipliers {
        match arch_type {
            ArchType::Normal => self.arch_normal,
            ArchType::Flat => self.arch_flat,
            ArchType::High => self.arch_high,
        }
    }
}

/// Outline width along the foot as a fraction of the measured width
pub fn width_factor(tz: f32) -> f32 {
    let factor = if tz < 0.12 {
        0.48 + (tz / 0.12) * 0.32
    } else if tz < 0.25 {
        0.80 + (tz - 0.12) * 0.77
    } else if tz < 0.55 {
        0.90 + (tz - 0.25) * 0.33
    } else if tz < 0.72 {
        1.0 + 0.02 * ((tz - 0.55) / 0.17 * PI).sin()
    } else if tz < 0.82 {
        1.0 - (tz - 0.72) * 1.5
    } else {
        0.85 - ((tz - 0.82) / 0.18) * 0.65
    };
    factor.max(0.12)
}

/// Coloring applied to the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Heat map from the modelled pressure
    #[default]
    Pressure,
    /// Flat per-side tint
    Solid,
}

/// Which measurement a guide shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideKind {
    Length,
    Width,
}

/// A labelled line drawn next to a foot
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementGuide {
    pub kind: GuideKind,
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub label_position: [f32; 3],
    pub label: String,
}

/// Triangle mesh of one foot
#[derive(Debug, Clone, PartialEq)]
pub struct FootGeometry {
    pub side: Side,
    pub segments_x: u32,
    pub segments_z: u32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    /// Modelled pressure per vertex, in `[0, 1]`
    pub pressure: Vec<f32>,
    pub indices: Vec<u32>,
}

impl FootGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex index of grid node `(ix, iz)`
    pub fn node_index(&self, ix: u32, iz: u32) -> usize {
        (iz * (self.segments_x + 1) + ix) as usize
    }

    /// Axis-aligned bounds of the positions
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in &self.positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        (min, max)
    }

    /// Replace the upward normals with area-weighted vertex normals
    pub fn smooth_normals(&mut self) {
        let mut accum = vec![[0.0f32; 3]; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
            let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
            let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
            // Unnormalised cross product: its length is twice the triangle area
            let n = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            for v in [a, b, c] {
                accum[v][0] += n[0];
                accum[v][1] += n[1];
                accum[v][2] += n[2];
            }
        }

        self.normals = accum
            .into_iter()
            .map(|n| {
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                if len > f32::EPSILON {
                    [n[0] / len, n[1] / len, n[2] / len]
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();
    }
}

/// Per-foot values shared by every node
struct SideFrame {
    lateral_dir: f32,
    offset: f32,
    length: f32,
    width: f32,
    arch_height: f32,
    arch: ArchMultipliers,
    pronation: Pronation,
    calcaneal_deg: f32,
    hallux_deg: f32,
}

impl SideFrame {
    fn new(params: &GeometryParams, m: &FootMeasurements, side: Side) -> Self {
        let dims: SideMeasurements = m.side(side);
        let width = dims.width_mm * params.mm_to_units;
        // Keeps the medial border at least half a unit off the midline
        let offset = params.side_offset.max((0.51 + params.medial_bulge) * width + 0.5);
        Self {
            lateral_dir: lateral_direction(side),
            offset,
            length: dims.length_mm * params.mm_to_units,
            width,
            arch_height: dims.arch_height_mm * params.mm_to_units,
            arch: params.arch_multipliers(m.arch_type),
            pronation: m.pronation,
            calcaneal_deg: m.calcaneal_alignment_deg,
            hallux_deg: m.hallux_valgus_deg,
        }
    }
}

/// Scene X direction of a foot's lateral border
pub fn lateral_direction(side: Side) -> f32 {
    match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    }
}

/// Builds foot meshes from measurements
#[derive(Debug, Clone, Default)]
pub struct FootModelGenerator {
    geometry: GeometryParams,
    pressure: PressureParams,
}

impl FootModelGenerator {
    pub fn new(geometry: GeometryParams, pressure: PressureParams) -> Self {
        Self { geometry, pressure }
    }

    pub fn geometry_params(&self) -> &GeometryParams {
        &self.geometry
    }

    pub fn pressure_params(&self) -> &PressureParams {
        &self.pressure
    }

    /// Arch rise at `(tx, tz)` for an arch of `arch_height` scene units
    pub fn arch_rise(&self, arch_type: ArchType, arch_height: f32, tx: f32, tz: f32) -> f32 {
        self.rise(self.geometry.arch_multipliers(arch_type), arch_height, tx, tz)
    }

    fn rise(&self, arch: ArchMultipliers, arch_height: f32, tx: f32, tz: f32) -> f32 {
        let medial = 1.0 - tx;
        let edge = 1.0 - 2.0 * (tx - 0.5).abs();
        arch_height
            * (PI * tz).sin()
            * edge
            * (medial * arch.medial + (1.0 - medial) * arch.lateral)
            * self.geometry.arch_scale
    }

    /// Lateral coordinate and height of one node, before mirroring
    fn node(&self, frame: &SideFrame, tx: f32, tz: f32) -> (f32, f32) {
        let p = &self.geometry;
        let medial = 1.0 - tx;
        let centre_dist = (tx - 0.5).abs();

        let half_width = frame.width * width_factor(tz) / 2.0;
        let mut u = -half_width + tx * 2.0 * half_width;
        if tz > 0.65 && tz < 0.95 {
            u -= p.medial_bulge * frame.width * ((tz - 0.65) / 0.3 * PI).sin();
        }

        let mut y = self.rise(frame.arch, frame.arch_height, tx, tz);

        if tz < 0.15 {
            let fall = 1.0 - tz / 0.15;
            y += p.heel_bump * fall * fall * (1.0 - 1.8 * centre_dist);
        }
        if tz > 0.58 && tz < 0.78 {
            y += p.ball_bump * ((tz - 0.58) / 0.2 * PI).sin() * (1.0 - 1.2 * centre_dist);
        }
        if tz > 0.85 {
            let bump = ((tz - 0.85) / 0.15 * PI).sin() * p.toe_height;
            for (i, &centre) in p.toe_centers.iter().enumerate() {
                let d = (tx - centre).abs();
                if d < p.toe_radius {
                    y += (1.0 - d / p.toe_radius) * bump * (1.0 - i as f32 * p.toe_falloff);
                }
            }
        }

        match frame.pronation {
            Pronation::Overpronation => y -= p.overpronation_tilt * (medial - 0.5),
            Pronation::Supination => y -= p.supination_tilt * ((1.0 - medial) - 0.5),
            Pronation::Neutral => {}
        }
        if tz < 0.2 {
            y += (frame.calcaneal_deg / p.calcaneal_reference_deg)
                * p.calcaneal_tilt
                * (1.0 - tz / 0.2)
                * (tx - 0.5);
        }

        if frame.hallux_deg > p.hallux_min_deg && tz > 0.8 {
            let d = (tx - p.toe_centers[0]).abs();
            if d < p.hallux_reach {
                let deviation =
                    (frame.hallux_deg / p.hallux_reference_deg) * p.hallux_shift * ((tz - 0.8) / 0.2);
                u += deviation * (1.0 - d / p.hallux_reach);

                if frame.hallux_deg > p.bunion_min_deg && tz < 0.88 && d < p.bunion_radius {
                    y += p.bunion_height
                        * (1.0 - d / p.bunion_radius)
                        * ((tz - 0.8) / 0.08 * PI).sin();
                }
            }
        }

        (u, y)
    }

    /// Generate the mesh of one foot
    ///
    /// Pure: equal inputs give bit-identical meshes.
    pub fn generate(
        &self,
        measurements: &FootMeasurements,
        side: Side,
        color_mode: ColorMode,
    ) -> Result<FootGeometry, GeometryError> {
        measurements.validate()?;

        let seg_x = self.geometry.segments_x.max(1);
        let seg_z = self.geometry.segments_z.max(1);
        let frame = SideFrame::new(&self.geometry, measurements, side);
        let inputs = PressureInputs {
            arch_type: measurements.arch_type,
            pronation: measurements.pronation,
            hallux_valgus_deg: measurements.hallux_valgus_deg,
        };
        let tint = hex_to_rgb(match side {
            Side::Left => LEFT_TINT,
            Side::Right => RIGHT_TINT,
        });

        let node_count = ((seg_x + 1) * (seg_z + 1)) as usize;
        let mut positions = Vec::with_capacity(node_count);
        let mut uvs = Vec::with_capacity(node_count);
        let mut colors = Vec::with_capacity(node_count);
        let mut pressure = Vec::with_capacity(node_count);

        for iz in 0..=seg_z {
            let tz = iz as f32 / seg_z as f32;
            let z = -frame.length / 2.0 + tz * frame.length;
            for ix in 0..=seg_x {
                let tx = ix as f32 / seg_x as f32;
                let (u, y) = self.node(&frame, tx, tz);
                positions.push([frame.lateral_dir * (frame.offset + u), y, z]);
                uvs.push([tx, tz]);

                let load = self.pressure.pressure_at(&inputs, tx, tz);
                pressure.push(load);
                colors.push(match color_mode {
                    ColorMode::Pressure => pressure_color(load),
                    ColorMode::Solid => tint,
                });
            }
        }

        let indices = grid_indices(seg_x, seg_z, side);

        info!(
            side = %side,
            vertices = positions.len(),
            triangles = indices.len() / 3,
            "Foot geometry generated"
        );

        Ok(FootGeometry {
            side,
            segments_x: seg_x,
            segments_z: seg_z,
            normals: vec![[0.0, 1.0, 0.0]; positions.len()],
            positions,
            uvs,
            colors,
            pressure,
            indices,
        })
    }

    /// Generate both feet, left first
    pub fn generate_pair(
        &self,
        measurements: &FootMeasurements,
        color_mode: ColorMode,
    ) -> Result<[FootGeometry; 2], GeometryError> {
        Ok([
            self.generate(measurements, Side::Left, color_mode)?,
            self.generate(measurements, Side::Right, color_mode)?,
        ])
    }

    /// Length guide along the medial border and width guide beyond the toes
    pub fn guides(
        &self,
        measurements: &FootMeasurements,
        side: Side,
    ) -> Result<Vec<MeasurementGuide>, GeometryError> {
        measurements.validate()?;
        let frame = SideFrame::new(&self.geometry, measurements, side);
        let dims = measurements.side(side);
        let height = 0.5;
        let to_scene = |u: f32, z: f32| [frame.lateral_dir * (frame.offset + u), height, z];

        let half_len = frame.length / 2.0;
        let half_width = frame.width / 2.0;
        let medial_u = -half_width - GUIDE_OFFSET;
        let toe_z = half_len + GUIDE_OFFSET;

        let guides = vec![
            MeasurementGuide {
                kind: GuideKind::Length,
                start: to_scene(medial_u, -half_len),
                end: to_scene(medial_u, half_len),
                label_position: to_scene(medial_u - 1.0, 0.0),
                label: format!("{:.0}mm", dims.length_mm),
            },
            MeasurementGuide {
                kind: GuideKind::Width,
                start: to_scene(-half_width, toe_z),
                end: to_scene(half_width, toe_z),
                label_position: to_scene(0.0, toe_z + 1.0),
                label: format!("{:.0}mm", dims.width_mm),
            },
        ];
        debug!(side = %side, count = guides.len(), "Measurement guides built");
        Ok(guides)
    }
}

/// Two triangles per grid cell, wound so every face points up after mirroring
fn grid_indices(seg_x: u32, seg_z: u32, side: Side) -> Vec<u32> {
    let mut indices = Vec::with_capacity((seg_x * seg_z * 6) as usize);
    for iz in 0..seg_z {
        for ix in 0..seg_x {
            let a = iz * (seg_x + 1) + ix;
            let b = a + 1;
            let c = a + seg_x + 1;
            let d = c + 1;
            match side {
                Side::Right => indices.extend_from_slice(&[a, c, b, b, c, d]),
                Side::Left => indices.extend_from_slice(&[a, b, c, b, d, c]),
            }
        }
    }
    indices
}
