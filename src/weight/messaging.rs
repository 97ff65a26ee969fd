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
use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};
use strum::EnumCount;

#[derive(Clone, Copy, Debug, Format, PartialEq)]
pub enum WeighingError {
    TareFailed(Corner),
    CalibrationFailed(Corner),
    MeasurementFailed(Corner),
}

#[derive(Clone, Copy, Debug, Format, PartialEq)]
pub enum WeightRequest {
    /// Tare every corner.
    Tare,
    /// Known mass in grams currently on the given corner.
    CalibrateCorner(Corner, f32),
}

#[derive(Clone, Copy, Debug, Format, PartialEq)]
pub struct CornerWeights {
    pub grams: [f32; Corner::COUNT],
    pub total_grams: f32,
    /// Corners whose reading failed and was reported as zero.
    pub faulted: [bool; Corner::COUNT],
}

#[derive(Debug, Format, PartialEq, Clone, Copy)]
pub enum WeightEvents {
    WeightUpdate(CornerWeights),
    RequestFailed(WeighingError),
    RequestCompleted(WeightRequest),
}

const REQUEST_CHANNEL_DEPTH: usize = 4;
const REQUEST_CHANNEL_SUBS: usize = 1;
const REQUEST_CHANNEL_PUBS: usize = 1;

pub type WeightRequestChannel = PubSubChannel<
    CriticalSectionRawMutex,
    WeightRequest,
    REQUEST_CHANNEL_DEPTH,
    REQUEST_CHANNEL_SUBS,
    REQUEST_CHANNEL_PUBS,
>;
pub type WeightRequestSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    WeightRequest,
    REQUEST_CHANNEL_DEPTH,
    REQUEST_CHANNEL_SUBS,
    REQUEST_CHANNEL_PUBS,
>;
pub type WeightRequestPublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    WeightRequest,
    REQUEST_CHANNEL_DEPTH,
    REQUEST_CHANNEL_SUBS,
    REQUEST_CHANNEL_PUBS,
>;

const CHANNEL_DEPTH: usize = 10;
const CHANNEL_SUBS: usize = 2;
const CHANNEL_PUBS: usize = 1;

pub type WeightChannel =
    PubSubChannel<CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelSubscriber<'a> =
    Subscriber<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelPublisher<'a> =
    Publisher<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
