//! Camera status reported by the keep-alive scheduler.

use std::fmt;

use crate::error::X7Error;

/// Battery charge as reported by the `battery_level` setting.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryLevel {
    L0 = 0,
    L1 = 1,
    L2 = 2,
    L3 = 3,
    L4 = 4,
    /// Running on external power.
    Ac = 5,
}

impl BatteryLevel {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// `L0` and `L1` are the levels the camera warns about.
    pub fn is_low(self) -> bool {
        matches!(self, Self::L0 | Self::L1)
    }
}

impl TryFrom<i64> for BatteryLevel {
    type Error = X7Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::L0),
            1 => Ok(Self::L1),
            2 => Ok(Self::L2),
            3 => Ok(Self::L3),
            4 => Ok(Self::L4),
            5 => Ok(Self::Ac),
            _ => Err(X7Error::UnknownVariant {
                type_name: "BatteryLevel",
                value,
            }),
        }
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ac => write!(f, "AC"),
            level => write!(f, "{}/4", level.code()),
        }
    }
}

/// One status sample: battery and free SD card capacity in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraStatus {
    pub battery: BatteryLevel,
    pub sd_card_capacity: i64,
}

impl CameraStatus {
    /// Decode the raw setting values read from the camera.
    pub fn from_settings(battery_level: &str, sd_card_capacity: &str) -> Result<Self, X7Error> {
        let battery = parse_int("battery_level", battery_level)?;
        let sd_card_capacity = parse_int("sd_card_capacity", sd_card_capacity)?;
        Ok(Self {
            battery: BatteryLevel::try_from(battery)?,
            sd_card_capacity,
        })
    }
}

fn parse_int(key: &str, raw: &str) -> Result<i64, X7Error> {
    raw.trim()
        .parse()
        .map_err(|_| X7Error::Protocol(format!("{key} is not an integer: {raw:?}")))
}
