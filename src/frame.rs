use core::str::FromStr;

#[cfg(feature = "defmt")]
use defmt::Format;

/// The wire-timing and data encoding conventions shared by a family of sensors.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// DHT11-style sensors: an 18ms start pulse, 8-bit integer humidity and a sign-magnitude
    /// 8-bit temperature.
    A,
    /// DHT22-style sensors: a 1ms start pulse, 16-bit humidity and temperature in tenths, with
    /// the temperature's top bit used as a sign flag.
    B,
}

impl Profile {
    /// Decodes a frame according to this profile. The checksum is not checked here.
    pub fn decode(self, frame: &RawFrame) -> Reading {
        let bytes = frame.as_bytes();
        match self {
            Profile::A => {
                let magnitude = (bytes[2] & 0x7F) as f32;
                Reading {
                    humidity: bytes[0] as f32,
                    temperature: if bytes[2] & 0x80 != 0 {
                        -magnitude
                    } else {
                        magnitude
                    },
                }
            }
            Profile::B => {
                let humidity_x10 = u16::from_be_bytes([bytes[0], bytes[1]]);
                let temperature_x10 = u16::from_be_bytes([bytes[2] & 0x7F, bytes[3]]);
                let temperature = temperature_x10 as f32 / 10.0;
                Reading {
                    humidity: humidity_x10 as f32 / 10.0,
                    temperature: if bytes[2] & 0x80 != 0 {
                        -temperature
                    } else {
                        temperature
                    },
                }
            }
        }
    }

    /// The smallest step this profile can represent, for both humidity and temperature.
    pub fn resolution(self) -> f32 {
        match self {
            Profile::A => 1.0,
            Profile::B => 0.1,
        }
    }
}

/// Sensor model names, several of which are electrically identical.
///
/// Use [`SensorModel::profile`] to find the wire protocol a model speaks.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorModel {
    Dht11,
    Sen11301p,
    Rht01,
    Dht22,
    Am2302,
    Sen51035p,
    Rht02,
    Rht03,
}

const MODEL_NAMES: [(&str, SensorModel); 8] = [
    ("DHT11", SensorModel::Dht11),
    ("SEN11301P", SensorModel::Sen11301p),
    ("RHT01", SensorModel::Rht01),
    ("DHT22", SensorModel::Dht22),
    ("AM2302", SensorModel::Am2302),
    ("SEN51035P", SensorModel::Sen51035p),
    ("RHT02", SensorModel::Rht02),
    ("RHT03", SensorModel::Rht03),
];

impl SensorModel {
    pub fn profile(self) -> Profile {
        match self {
            SensorModel::Dht11 | SensorModel::Sen11301p | SensorModel::Rht01 => Profile::A,
            SensorModel::Dht22
            | SensorModel::Am2302
            | SensorModel::Sen51035p
            | SensorModel::Rht02
            | SensorModel::Rht03 => Profile::B,
        }
    }

    /// The model name as printed on the part.
    pub fn name(self) -> &'static str {
        match self {
            SensorModel::Dht11 => "DHT11",
            SensorModel::Sen11301p => "SEN11301P",
            SensorModel::Rht01 => "RHT01",
            SensorModel::Dht22 => "DHT22",
            SensorModel::Am2302 => "AM2302",
            SensorModel::Sen51035p => "SEN51035P",
            SensorModel::Rht02 => "RHT02",
            SensorModel::Rht03 => "RHT03",
        }
    }
}

impl From<SensorModel> for Profile {
    fn from(model: SensorModel) -> Profile {
        model.profile()
    }
}

/// Returned when parsing a model name that is not in the alias table.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownModel;

impl FromStr for SensorModel {
    type Err = UnknownModel;

    /// Parses a model name, ignoring ASCII case.
    fn from_str(name: &str) -> Result<SensorModel, UnknownModel> {
        MODEL_NAMES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name.trim()))
            .map(|(_, model)| *model)
            .ok_or(UnknownModel)
    }
}

/// The five bytes sent by the sensor in one transaction: humidity high and low, temperature
/// high and low, then the checksum.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFrame([u8; 5]);

impl RawFrame {
    pub fn new(bytes: [u8; 5]) -> RawFrame {
        RawFrame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }

    pub fn checksum(&self) -> u8 {
        self.0[4]
    }

    /// The low 8 bits of the sum of the four data bytes.
    pub fn expected_checksum(&self) -> u8 {
        let sum: u16 = self.0[..4].iter().map(|byte| *byte as u16).sum();
        sum.to_be_bytes()[1]
    }

    pub fn is_valid(&self) -> bool {
        self.checksum() == self.expected_checksum()
    }

    pub fn decode(&self, profile: Profile) -> Reading {
        profile.decode(self)
    }

    /// Builds the frame a sensor of the given profile would send for `reading`, including a
    /// valid checksum.
    ///
    /// Values are rounded to the profile's resolution and clamped to what the encoding can hold.
    pub fn encode(profile: Profile, reading: &Reading) -> RawFrame {
        let negative = reading.temperature < 0.0;
        let mut bytes = [0u8; 5];
        match profile {
            Profile::A => {
                bytes[0] = clamp_round(reading.humidity, u8::MAX as f32) as u8;
                bytes[2] = clamp_round(libm::fabsf(reading.temperature), 0x7F as f32) as u8;
                if negative && bytes[2] != 0 {
                    bytes[2] |= 0x80;
                }
            }
            Profile::B => {
                let humidity_x10 = clamp_round(reading.humidity * 10.0, u16::MAX as f32) as u16;
                let mut temperature_x10 =
                    clamp_round(libm::fabsf(reading.temperature) * 10.0, 0x7FFF as f32) as u16;
                if negative && temperature_x10 != 0 {
                    temperature_x10 |= 0x8000;
                }
                bytes[..2].copy_from_slice(&humidity_x10.to_be_bytes());
                bytes[2..4].copy_from_slice(&temperature_x10.to_be_bytes());
            }
        }
        let mut frame = RawFrame(bytes);
        frame.0[4] = frame.expected_checksum();
        frame
    }
}

fn clamp_round(value: f32, max: f32) -> f32 {
    libm::roundf(value).clamp(0.0, max)
}

/// A decoded humidity (percent) and temperature (degrees Celsius) pair.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub humidity: f32,
    pub temperature: f32,
}
