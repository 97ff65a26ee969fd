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

//! HX711 two-wire protocol primitives. Pure pin and delay manipulation, no channel state.

use crate::Error;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Number of 1us polls of DOUT before a read is abandoned.
pub const DATA_READY_TIMEOUT_US: u32 = 1000;
/// Minimum clock high/low time. Bounded above by the 60us power down threshold.
pub const CLK_HALF_PERIOD_US: u32 = 1;
/// Clock held high (or low again) for this long changes the power state.
pub const POWER_MODE_CHANGE_DELAY_US: u32 = 60;
pub const VALID_DATA_BITS: usize = 24;

const SIGN_BIT: u32 = 1 << (VALID_DATA_BITS - 1);
const SIGN_EXTENSION_MASK: u32 = 0xFF00_0000;
const DATA_MASK: u32 = (1 << VALID_DATA_BITS) - 1;

/// Input and amplification used by the conversion after the current one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hx711Gain {
    #[default]
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    /// Clock pulses sent after the 24 data bits to select this gain.
    pub fn gain_pulses(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 1,
            Hx711Gain::Gain32ChannelB => 2,
            Hx711Gain::Gain64 => 3,
        }
    }
}

/// Polls DOUT until the sensor pulls it low to signal a latched conversion.
pub fn wait_for_data_ready<DATA, D, ClkE, DataE>(
    data_pin: &mut DATA,
    delay: &mut D,
) -> Result<(), Error<ClkE, DataE>>
where
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    for _ in 0..DATA_READY_TIMEOUT_US {
        if data_pin.is_low().map_err(Error::DataPin)? {
            return Ok(());
        }
        delay.delay_us(1);
    }
    Err(Error::Timeout)
}

/// Clocks out the 24 data bits MSB first followed by the gain select pulses. Must run with
/// interrupts masked, a stall with the clock high corrupts the read or powers the sensor down.
///
/// If a pin fails part way through, the clock is still driven low before the error is returned.
pub fn shift_in<CLK, DATA, D, ClkE, DataE>(
    clock_pin: &mut CLK,
    data_pin: &mut DATA,
    delay: &mut D,
    gain_pulses: usize,
) -> Result<u32, Error<ClkE, DataE>>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    let result = shift_bits(clock_pin, data_pin, delay, gain_pulses);
    if result.is_err() {
        // best effort, the original error is the one reported
        let _ = clock_pin.set_low();
    }
    result
}

fn shift_bits<CLK, DATA, D, ClkE, DataE>(
    clock_pin: &mut CLK,
    data_pin: &mut DATA,
    delay: &mut D,
    gain_pulses: usize,
) -> Result<u32, Error<ClkE, DataE>>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    let mut data: u32 = 0;

    for _ in 0..VALID_DATA_BITS {
        clock_pin.set_high().map_err(Error::ClockPin)?;
        delay.delay_us(CLK_HALF_PERIOD_US);
        data <<= 1;
        if data_pin.is_high().map_err(Error::DataPin)? {
            data |= 0x1;
        }
        clock_pin.set_low().map_err(Error::ClockPin)?;
        delay.delay_us(CLK_HALF_PERIOD_US);
    }

    for _ in 0..gain_pulses {
        clock_pin.set_high().map_err(Error::ClockPin)?;
        delay.delay_us(CLK_HALF_PERIOD_US);
        clock_pin.set_low().map_err(Error::ClockPin)?;
        delay.delay_us(CLK_HALF_PERIOD_US);
    }

    Ok(data)
}

/// Extends a 24-bit two's complement value into an `i32`.
pub fn sign_extend(data: u32) -> i32 {
    let data = data & DATA_MASK;
    if data & SIGN_BIT != 0 {
        (data | SIGN_EXTENSION_MASK) as i32
    } else {
        data as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_values_pass_through() {
        assert_eq!(sign_extend(0x000000), 0);
        assert_eq!(sign_extend(0x000001), 1);
        assert_eq!(sign_extend(0x7F_FFFF), 8_388_607);
    }

    #[test]
    fn bit_23_extends_to_negative() {
        assert_eq!(sign_extend(0xFF_FFFF), -1);
        assert_eq!(sign_extend(0xFF_FFF3), -13);
        assert_eq!(sign_extend(0x80_0000), -8_388_608);
    }

    #[test]
    fn sign_extension_matches_value_minus_two_pow_24() {
        for raw in [0x80_0000_u32, 0x80_0001, 0xA5_5A5A, 0xC0_0000, 0xFF_FFFE] {
            assert_eq!(sign_extend(raw) as i64, raw as i64 - (1 << 24));
        }
        for raw in [0x00_0002_u32, 0x12_3456, 0x40_0000, 0x7F_FFFE] {
            assert_eq!(sign_extend(raw) as i64, raw as i64);
        }
    }

    #[test]
    fn bits_above_24_are_ignored() {
        assert_eq!(sign_extend(0x0100_0005), 5);
    }

    #[test]
    fn gain_pulse_counts() {
        assert_eq!(Hx711Gain::Gain128.gain_pulses(), 1);
        assert_eq!(Hx711Gain::Gain32ChannelB.gain_pulses(), 2);
        assert_eq!(Hx711Gain::Gain64.gain_pulses(), 3);
        assert_eq!(Hx711Gain::default(), Hx711Gain::Gain128);
    }
}
