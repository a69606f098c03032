use crate::error::{DeviceError, DeviceResult};
use serde::Serialize;

/// Constants for one plotter model.
///
/// `native_steps_per_mm` is the resolution at the finest microstepping
/// setting (mode 1); coarser modes divide it by `2^(mode-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotterModel {
    /// Registry id, matched against the `model` configuration option.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Steps per millimetre at microstepping mode 1.
    pub native_steps_per_mm: f64,
    /// Steps per inch at microstepping mode 1.
    pub native_steps_per_inch: f64,
    /// Usable carriage travel along X, millimetres.
    pub travel_width_mm: f64,
    /// Usable carriage travel along Y, millimetres.
    pub travel_height_mm: f64,
    /// Vertical pen travel, millimetres.
    pub pen_travel_mm: f64,
    /// Maximum carriage speed, millimetres per second.
    pub max_speed_mm_s: f64,
}

const MODELS: &[PlotterModel] = &[
    PlotterModel {
        id: "MiniKit2",
        name: "MiniKit 2",
        native_steps_per_mm: 80.0,
        native_steps_per_inch: 2032.0,
        travel_width_mm: 160.0,
        travel_height_mm: 101.0,
        pen_travel_mm: 17.8,
        max_speed_mm_s: 380.0,
    },
    PlotterModel {
        id: "DeskKit3",
        name: "DeskKit 3",
        native_steps_per_mm: 80.0,
        native_steps_per_inch: 2032.0,
        travel_width_mm: 300.0,
        travel_height_mm: 218.0,
        pen_travel_mm: 17.8,
        max_speed_mm_s: 380.0,
    },
    PlotterModel {
        id: "DeskKitA3",
        name: "DeskKit A3",
        native_steps_per_mm: 80.0,
        native_steps_per_inch: 2032.0,
        travel_width_mm: 430.0,
        travel_height_mm: 297.0,
        pen_travel_mm: 17.8,
        max_speed_mm_s: 380.0,
    },
];

impl PlotterModel {
    /// Look up a model by registry id.
    pub fn find(id: &str) -> DeviceResult<&'static PlotterModel> {
        MODELS
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| DeviceError::UnknownModel { id: id.to_string() })
    }

    /// All registered models.
    pub fn all() -> &'static [PlotterModel] {
        MODELS
    }

    /// Effective step resolution at the given microstepping mode.
    pub fn steps_per_mm(&self, microstepping_mode: u8) -> f64 {
        debug_assert!((1..=5).contains(&microstepping_mode));
        self.native_steps_per_mm / f64::from(1u32 << (microstepping_mode.saturating_sub(1)))
    }
}
