#![cfg_attr(not(test), no_std)]

/// Driver for DHT11/DHT22-family sensors: the single-wire transaction and the cached reading.
pub mod dhtxx;
/// Raw five-byte frames, their checksum, and decoding for each sensor profile.
pub mod frame;
/// Temperature scales and dew point approximations.
pub mod units;
