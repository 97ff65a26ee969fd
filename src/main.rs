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

#![no_std]
#![no_main]

mod config;
mod hmi;
mod weight;

use crate::config::{
    CORNER_CALIBRATION, STARTUP_SETTLE_TIME, TARE_AT_STARTUP, TARE_BUTTON_DEBOUNCE,
};
use crate::hmi::tare_button::{tare_button_handler, TareButton};
use crate::weight::messaging::{
    WeightChannel, WeightChannelPublisher, WeightChannelSubscriber, WeightRequestChannel,
    WeightRequestPublisher, WeightRequestSubscriber,
};
use crate::weight::reporting::weight_reporter;
use crate::weight::weighing_manager::WeighingManager;
use crate::weight::{bring_up_load_cell, Corner, LoadCell, LoadCellError};
use assign_resources::assign_resources;
use defmt::{error, info, warn};
use embassy_executor::{Executor, Spawner};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals;
use embassy_sync::pubsub::PubSubChannel;
use embassy_time::Timer;
use static_cell::StaticCell;
use strum::EnumCount;
#[allow(unused_imports)]
use {defmt_rtt as _, panic_probe as _};

mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

static WEIGHT_REQUEST_CHANNEL: WeightRequestChannel = PubSubChannel::new();
static WEIGHT_CHANNEL: WeightChannel = PubSubChannel::new();

#[cfg(not(feature = "crib_flat"))]
assign_resources! {
    load_cells: LoadCellPins {
        front_left_clk: PIN_2,
        front_left_data: PIN_3,
        front_right_clk: PIN_4,
        front_right_data: PIN_5,
        back_left_clk: PIN_6,
        back_left_data: PIN_7,
        back_right_clk: PIN_8,
        back_right_data: PIN_9,
    },
    tare_input: TareButtonPins {
        button_pin: PIN_15,
    }
}

#[cfg(feature = "crib_flat")]
assign_resources! {
    load_cells: LoadCellPins {
        front_left_clk: PIN_10,
        front_left_data: PIN_11,
        front_right_clk: PIN_12,
        front_right_data: PIN_13,
        back_left_clk: PIN_18,
        back_left_data: PIN_19,
        back_right_clk: PIN_20,
        back_right_data: PIN_21,
    },
    tare_input: TareButtonPins {
        button_pin: PIN_22,
    }
}

static EXECUTOR0: StaticCell<Executor> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    let resources = split_resources! {p};

    info!(
        "{} v{} ({}) starting",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown")
    );

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| core0_main(spawner, resources.load_cells, resources.tare_input));
}

fn core0_main(spawner: Spawner, load_cell_pins: LoadCellPins, tare_pins: TareButtonPins) {
    spawner
        .spawn(weighing_task(
            load_cell_pins,
            WEIGHT_REQUEST_CHANNEL.subscriber().unwrap(),
            WEIGHT_CHANNEL.publisher().unwrap(),
        ))
        .unwrap();
    spawner
        .spawn(tare_button_task(tare_pins, WEIGHT_REQUEST_CHANNEL.publisher().unwrap()))
        .unwrap();
    spawner
        .spawn(reporting_task(WEIGHT_CHANNEL.subscriber().unwrap()))
        .unwrap();
}

fn bring_up_load_cells(pins: LoadCellPins) -> Result<[LoadCell; Corner::COUNT], LoadCellError> {
    Ok([
        bring_up_load_cell(
            Corner::FrontLeft,
            Output::new(pins.front_left_clk, Level::Low),
            Input::new(pins.front_left_data, Pull::Up),
            &CORNER_CALIBRATION[Corner::FrontLeft.index()],
        )?,
        bring_up_load_cell(
            Corner::FrontRight,
            Output::new(pins.front_right_clk, Level::Low),
            Input::new(pins.front_right_data, Pull::Up),
            &CORNER_CALIBRATION[Corner::FrontRight.index()],
        )?,
        bring_up_load_cell(
            Corner::BackLeft,
            Output::new(pins.back_left_clk, Level::Low),
            Input::new(pins.back_left_data, Pull::Up),
            &CORNER_CALIBRATION[Corner::BackLeft.index()],
        )?,
        bring_up_load_cell(
            Corner::BackRight,
            Output::new(pins.back_right_clk, Level::Low),
            Input::new(pins.back_right_data, Pull::Up),
            &CORNER_CALIBRATION[Corner::BackRight.index()],
        )?,
    ])
}

/// Terminal safe state. Interrupts stay masked so no task, including the tare button and the
/// reporter, runs again until reset. Only reachable with pin types whose errors are not
/// `Infallible`.
fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[embassy_executor::task]
async fn weighing_task(
    load_cell_pins: LoadCellPins,
    request_subscriber: WeightRequestSubscriber<'static>,
    weight_channel_publisher: WeightChannelPublisher<'static>,
) {
    let load_cells = match bring_up_load_cells(load_cell_pins) {
        Ok(load_cells) => load_cells,
        Err(e) => {
            error!("Load cell bring up failed: {}", e);
            halt();
        }
    };

    let mut weighing_manager =
        WeighingManager::new(request_subscriber, weight_channel_publisher, load_cells);

    if TARE_AT_STARTUP {
        Timer::after(STARTUP_SETTLE_TIME).await;
        if weighing_manager.tare_all().await.is_err() {
            warn!("Startup tare incomplete, affected corners keep factory offset");
        }
    }

    weighing_manager.run().await;
}

#[embassy_executor::task]
async fn tare_button_task(
    tare_pins: TareButtonPins,
    request_publisher: WeightRequestPublisher<'static>,
) {
    let button = TareButton::new(Input::new(tare_pins.button_pin, Pull::Up), TARE_BUTTON_DEBOUNCE);
    tare_button_handler(button, request_publisher).await;
}

#[embassy_executor::task]
async fn reporting_task(weight_channel_subscriber: WeightChannelSubscriber<'static>) {
    weight_reporter(weight_channel_subscriber).await;
}
