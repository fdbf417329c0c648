//! GPIO / peripheral pin assignments for the SwitchBank main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Relay outputs (active HIGH through NPN drivers)
// ---------------------------------------------------------------------------

/// Output channel 0 relay coil driver.
pub const RELAY_0_GPIO: i32 = 26;
/// Output channel 1 relay coil driver.
pub const RELAY_1_GPIO: i32 = 25;
/// Output channel 2 relay coil driver.
pub const RELAY_2_GPIO: i32 = 32;
/// Output channel 3 relay coil driver.
pub const RELAY_3_GPIO: i32 = 33;

/// Relay GPIOs indexed by channel.
pub const RELAY_GPIOS: [i32; 4] = [RELAY_0_GPIO, RELAY_1_GPIO, RELAY_2_GPIO, RELAY_3_GPIO];

// ---------------------------------------------------------------------------
// I²C bus (DS1307 real-time clock at 0x68)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;

/// I²C bus clock.  The DS1307 tops out at 100 kHz.
pub const I2C_FREQ_HZ: u32 = 100_000;
