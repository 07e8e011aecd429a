use libm::{log10f, logf, powf};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Temperature scales supported by [`Dht::temperature`](crate::dhtxx::Dht::temperature).
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Scale {
    /// Converts a Celsius temperature into this scale.
    pub fn convert_celsius(self, celsius: f32) -> f32 {
        match self {
            Scale::Celsius => celsius,
            Scale::Fahrenheit => celsius_to_fahrenheit(celsius),
            Scale::Kelvin => celsius_to_kelvin(celsius),
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn celsius_to_kelvin(celsius: f32) -> f32 {
    celsius + 273.15
}

/// Dew point in degrees Celsius, from the saturation vapor pressure series described at
/// <http://wahiduddin.net/calc/density_algorithms.htm>.
///
/// Slower than [`dew_point_fast`], but holds across the full humidity range.
pub fn dew_point(celsius: f32, humidity: f32) -> f32 {
    let a0 = 373.15 / (273.15 + celsius);
    let mut sum = -7.90298 * (a0 - 1.0);
    sum += 5.02808 * log10f(a0);
    sum += -1.3816e-7 * (powf(10.0, 11.344 * (1.0 - 1.0 / a0)) - 1.0);
    sum += 8.1328e-3 * (powf(10.0, -3.49149 * (a0 - 1.0)) - 1.0);
    sum += log10f(1013.246);
    // Vapor pressure in kPa.
    let vapor_pressure = powf(10.0, sum - 3.0) * humidity;
    let t = logf(vapor_pressure / 0.61078);
    (241.88 * t) / (17.558 - t)
}

/// Dew point in degrees Celsius using the Magnus approximation.
///
/// Only accurate to about 1 degree, and only when humidity is above 50%.
pub fn dew_point_fast(celsius: f32, humidity: f32) -> f32 {
    const A: f32 = 17.271;
    const B: f32 = 237.7;
    let gamma = (A * celsius) / (B + celsius) + logf(humidity / 100.0);
    (B * gamma) / (A - gamma)
}
