// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::weight::Corner;
use embassy_time::Duration;
use smartcrib_loadcell::FailurePolicy;
use strum::EnumCount;

pub const WEIGHT_POLL_PERIOD: Duration = Duration::from_millis(200);
/// Time for the cells to settle after power on before the startup tare.
pub const STARTUP_SETTLE_TIME: Duration = Duration::from_millis(1000);
pub const TARE_AT_STARTUP: bool = true;
pub const CALIBRATION_SAMPLES: usize = 20;
pub const TARE_BUTTON_DEBOUNCE: Duration = Duration::from_millis(20);
/// Holding the tare button this long calibrates the next corner instead of taring.
pub const CALIBRATION_HOLD_TIME: Duration = Duration::from_millis(3000);
/// Reference mass placed over the corner being calibrated.
pub const CALIBRATION_REFERENCE_GRAMS: f32 = 1000.0;
pub const WEIGHT_FAILURE_POLICY: FailurePolicy = FailurePolicy::SubstituteZero;

#[derive(Debug, Clone, Copy)]
pub struct CornerCalibration {
    pub offset: i32,
    /// Raw counts per gram.
    pub scale: f32,
}

/// Factory calibration, indexed by [`Corner`]. Offsets are replaced by the startup tare.
pub const CORNER_CALIBRATION: [CornerCalibration; Corner::COUNT] = [
    CornerCalibration { offset: 0, scale: 420.5 },
    CornerCalibration { offset: 0, scale: 418.3 },
    CornerCalibration { offset: 0, scale: 422.1 },
    CornerCalibration { offset: 0, scale: 419.7 },
];
