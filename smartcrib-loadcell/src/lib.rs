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

//! Load cell channel driver for HX711 compatible strain gauge ADCs.
//!
//! The protocol is bit-banged over two GPIOs using the `embedded-hal` 1.0 traits, so the same
//! driver serves any board that can hand over an input pin, an output pin and a delay.

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod channel;
pub mod interface;

#[cfg(test)]
mod testing;

pub use channel::{FailurePolicy, LoadCellChannel};
pub use interface::hx711::Hx711Gain;
pub use interface::{CriticalSectionLock, ShiftLock};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<ClkE, DataE> {
    /// Read attempted while the channel is not bound or is powered down.
    NotInitialized,
    /// DOUT never signalled data ready, or every sample of an average failed.
    Timeout,
    /// The clock pin could not be driven to its idle level during init.
    Config(ClkE),
    /// Driving the clock pin failed during a read or a power state change.
    ClockPin(ClkE),
    /// Sampling the data pin failed.
    DataPin(DataE),
    /// A zero scale or calibration mass was supplied.
    InvalidScale,
}
