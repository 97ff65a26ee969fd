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

pub(crate) mod messaging;
pub(crate) mod reporting;
pub(crate) mod weighing_manager;

use crate::config::CornerCalibration;
use core::convert::Infallible;
use defmt::{warn, Format};
use embassy_rp::gpio::{Input, Output};
use embassy_time::Delay;
use smartcrib_loadcell::{CriticalSectionLock, LoadCellChannel};
use strum::{EnumCount, EnumIter, IntoStaticStr};

pub type LoadCell = LoadCellChannel<Output<'static>, Input<'static>, Delay, CriticalSectionLock>;
pub type LoadCellError = smartcrib_loadcell::Error<Infallible, Infallible>;

/// Load cell position under the monitored surface. Discriminants index per-corner arrays.
#[derive(Debug, Format, Copy, Clone, PartialEq, EnumCount, EnumIter, IntoStaticStr)]
pub enum Corner {
    FrontLeft = 0,
    FrontRight = 1,
    BackLeft = 2,
    BackRight = 3,
}

impl Corner {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Binds one corner's pins. The pins must already be configured, clock as a low output and
/// data as an input with pull-up.
pub fn bring_up_load_cell(
    corner: Corner,
    clock_pin: Output<'static>,
    data_pin: Input<'static>,
    calibration: &CornerCalibration,
) -> Result<LoadCell, LoadCellError> {
    let mut load_cell = LoadCellChannel::init(clock_pin, data_pin, Delay, CriticalSectionLock::new())?
        .with_failure_policy(crate::config::WEIGHT_FAILURE_POLICY);

    load_cell.set_offset(calibration.offset);
    if load_cell.set_scale(calibration.scale).is_err() {
        warn!("{} calibration scale rejected, using 1.0", corner.name());
    }
    Ok(load_cell)
}
