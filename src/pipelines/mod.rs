// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines behind the capture flow
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │  CapturedImage   │
//! │              │     │  - quality check  │     │  (JPEG + result) │
//! │              │     │  - JPEG encoding  │     │                  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │   Recorder   │ ──▶ │  Video Pipeline   │ ──▶ │  ≤5 best frames  │
//! │              │     │  - 30 s cap       │     │  in time order   │
//! │              │     │  - extract + rank │     │                  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Measurements │ ──▶ │  Foot Model       │ ──▶ │  meshes / GLB    │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! Heavy work runs on blocking tasks so the live monitor keeps ticking.

pub mod foot_model;
pub mod photo;
pub mod video;
