use serde::{Deserialize, Serialize};

/// Operating state reported through the CurrentHeaterCoolerState characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentHeaterCoolerState {
    Inactive,
    Idle,
    Heating,
    Cooling,
}

impl CurrentHeaterCoolerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Idle => "IDLE",
            Self::Heating => "HEATING",
            Self::Cooling => "COOLING",
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Idle => 1,
            Self::Heating => 2,
            Self::Cooling => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inactive),
            1 => Some(Self::Idle),
            2 => Some(Self::Heating),
            3 => Some(Self::Cooling),
            _ => None,
        }
    }
}

/// Mode requested by a controller through the TargetHeaterCoolerState characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetHeaterCoolerState {
    Automatic,
    Heat,
    Cool,
}

impl TargetHeaterCoolerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "AUTOMATIC",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Automatic => 0,
            Self::Heat => 1,
            Self::Cool => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Automatic),
            1 => Some(Self::Heat),
            2 => Some(Self::Cool),
            _ => None,
        }
    }
}

/// State of the accessory server as reported by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerState {
    Idle,
    Running,
    Stopping,
}

impl ServerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopping => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Running),
            2 => Some(Self::Stopping),
            _ => None,
        }
    }
}

pub fn active_as_u8(active: bool) -> u8 {
    u8::from(active)
}

pub fn active_from_u8(value: u8) -> Option<bool> {
    match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}
