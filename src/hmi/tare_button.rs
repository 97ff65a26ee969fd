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

use crate::config::{CALIBRATION_HOLD_TIME, CALIBRATION_REFERENCE_GRAMS};
use crate::weight::messaging::{WeightRequest, WeightRequestPublisher};
use crate::weight::Corner;
use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Level};
use embassy_time::{Duration, Timer};
use strum::IntoEnumIterator;

/// Active low push button, pulled up, debounced on both edges.
pub struct TareButton<'a> {
    input: Input<'a>,
    debounce_time: Duration,
}

impl<'a> TareButton<'a> {
    pub fn new(input: Input<'a>, debounce_time: Duration) -> Self {
        Self {
            input,
            debounce_time,
        }
    }

    /// Level once the input has been free of edges for the debounce time.
    async fn settled_level(&mut self) -> Level {
        loop {
            match select(self.input.wait_for_any_edge(), Timer::after(self.debounce_time)).await {
                Either::First(_) => continue,
                Either::Second(_) => break self.input.get_level(),
            }
        }
    }

    pub async fn wait_for_press(&mut self) {
        loop {
            self.input.wait_for_falling_edge().await;
            if self.settled_level().await == Level::Low {
                break;
            }
        }
    }

    pub async fn wait_for_release(&mut self) {
        self.input.wait_for_high().await;
        while self.settled_level().await != Level::High {}
    }
}

/// A short press tares every corner. Holding for [`CALIBRATION_HOLD_TIME`] calibrates one corner
/// against [`CALIBRATION_REFERENCE_GRAMS`], moving to the next corner on each hold.
pub async fn tare_button_handler(
    mut button: TareButton<'_>,
    request_publisher: WeightRequestPublisher<'static>,
) -> ! {
    let mut calibration_corners = Corner::iter().cycle();
    loop {
        button.wait_for_press().await;
        match select(button.wait_for_release(), Timer::after(CALIBRATION_HOLD_TIME)).await {
            Either::First(_) => {
                info!("Tare button pressed");
                request_publisher.publish(WeightRequest::Tare).await;
            }
            Either::Second(_) => {
                if let Some(corner) = calibration_corners.next() {
                    info!(
                        "Calibrating {} against {=f32} g",
                        corner.name(),
                        CALIBRATION_REFERENCE_GRAMS
                    );
                    request_publisher
                        .publish(WeightRequest::CalibrateCorner(
                            corner,
                            CALIBRATION_REFERENCE_GRAMS,
                        ))
                        .await;
                }
                button.wait_for_release().await;
            }
        }
    }
}
