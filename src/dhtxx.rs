use core::fmt;
use core::time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::frame::{Profile, RawFrame, Reading, SensorModel};
use crate::units::{self, Scale};

#[cfg(feature = "defmt")]
use defmt::{debug, trace, warn};
#[cfg(all(feature = "log", not(feature = "defmt")))]
use log::{debug, trace, warn};
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

/// Possible failures of a single transaction with the sensor.
///
/// None of these are fatal: the driver and its cached reading stay valid, and the caller decides
/// whether to try again. Retrying before the minimum read interval has passed returns
/// [`Error::BusBusy`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    Wrapped(TIoError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// The sensor was read too recently, or the line was not idle before the start pulse.
    BusBusy,
    /// The sensor never pulled the line low after the start pulse.
    NotPresent,
    /// The low half of the sensor's acknowledgement lasted too long.
    AckTooLong,
    /// The high half of the acknowledgement, or a bit's low sync pulse, lasted too long.
    SyncTimeout,
    /// A bit's high data pulse lasted too long.
    DataTimeout,
    /// All 40 bits were received but the checksum byte did not match.
    Checksum,
    /// A wait loop used up its poll budget without seeing the expected edge.
    NoPatience,
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

impl<TIoError> fmt::Display for Error<TIoError>
where
    TIoError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Wrapped(err) => write!(f, "IO error: {:?}", err),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::BusBusy => f.write_str("bus busy"),
            Error::NotPresent => f.write_str("sensor not present"),
            Error::AckTooLong => f.write_str("acknowledgement too long"),
            Error::SyncTimeout => f.write_str("sync timeout"),
            Error::DataTimeout => f.write_str("data timeout"),
            Error::Checksum => f.write_str("checksum mismatch"),
            Error::NoPatience => f.write_str("poll budget exhausted"),
        }
    }
}

/// The minimum read interval of profile A (DHT11-style) sensors.
///
/// Note that this can vary a bit by device, so check your device's datasheet to be sure. Try
/// doubling this value if you are encountering problems.
pub const MIN_PROFILE_A_READ_INTERVAL: Duration = Duration::from_millis(1000);

/// The minimum read interval of profile B (DHT22-style) sensors.
///
/// Note that this can vary a bit by device, so check your device's datasheet to be sure. Try
/// doubling this value if you are encountering problems.
pub const MIN_PROFILE_B_READ_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of line samples any single wait may take before giving up.
///
/// Every protocol phase lasts at most a few hundred microseconds, so this only trips when the
/// clock is not advancing.
pub const DEFAULT_MAX_POLLS: u32 = 100_000;

/// Options to modify the behavior of the DHT driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// The minimum time interval that must pass between transactions. Cannot be below this
    /// sensor's absolute minimum read interval (i.e. [`MIN_PROFILE_A_READ_INTERVAL`] or
    /// [`MIN_PROFILE_B_READ_INTERVAL`]).
    pub min_read_interval: Duration,
    /// The maximum number of times any one wait loop samples the line before failing with
    /// [`Error::NoPatience`]. Must be at least 1.
    pub max_polls: u32,
}

pub const DEFAULT_PROFILE_A_OPTIONS: Options = Options {
    min_read_interval: MIN_PROFILE_A_READ_INTERVAL,
    max_polls: DEFAULT_MAX_POLLS,
};

pub const DEFAULT_PROFILE_B_OPTIONS: Options = Options {
    min_read_interval: MIN_PROFILE_B_READ_INTERVAL,
    max_polls: DEFAULT_MAX_POLLS,
};

const PROFILE_A_START_PULSE: Duration = Duration::from_millis(18);
const PROFILE_B_START_PULSE: Duration = Duration::from_millis(1);

impl Profile {
    /// How long the host holds the line low to request a reading.
    pub fn start_pulse(self) -> Duration {
        match self {
            Profile::A => PROFILE_A_START_PULSE,
            Profile::B => PROFILE_B_START_PULSE,
        }
    }

    pub fn min_read_interval(self) -> Duration {
        match self {
            Profile::A => MIN_PROFILE_A_READ_INTERVAL,
            Profile::B => MIN_PROFILE_B_READ_INTERVAL,
        }
    }

    pub fn default_options(self) -> Options {
        match self {
            Profile::A => DEFAULT_PROFILE_A_OPTIONS,
            Profile::B => DEFAULT_PROFILE_B_OPTIONS,
        }
    }
}

// Time between releasing the line and looking for the sensor's response.
const RELEASE_SETTLE_US: u32 = 30;

// A high data pulse longer than this is a 1. Zeros last 26-28us, ones about 70us.
const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(48);

const BIT_COUNT: usize = 40;

/// The stages of a transaction in which the driver waits for the line to change.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    /// Line must return high before we drive it.
    Idle,
    /// Waiting for the sensor to pull the line low.
    Presence,
    /// The sensor's ~80us low acknowledgement.
    AckLow,
    /// The sensor's ~80us high acknowledgement.
    AckHigh,
    /// The ~50us low pulse preceding each bit.
    Sync,
    /// The high pulse whose width encodes a bit.
    Data,
}

impl Phase {
    /// The line level held for the duration of this phase.
    fn holds_high(self) -> bool {
        match self {
            Phase::Idle | Phase::AckLow | Phase::Sync => false,
            Phase::Presence | Phase::AckHigh | Phase::Data => true,
        }
    }

    fn budget(self) -> Duration {
        match self {
            Phase::Idle => Duration::from_micros(250),
            Phase::Presence => Duration::from_micros(40),
            Phase::AckLow | Phase::AckHigh => Duration::from_micros(100),
            Phase::Sync => Duration::from_micros(75),
            Phase::Data => Duration::from_micros(90),
        }
    }

    fn timeout_error<TIoError>(self) -> Error<TIoError> {
        match self {
            Phase::Idle => Error::BusBusy,
            Phase::Presence => Error::NotPresent,
            Phase::AckLow => Error::AckTooLong,
            Phase::AckHigh | Phase::Sync => Error::SyncTimeout,
            Phase::Data => Error::DataTimeout,
        }
    }

    #[cfg_attr(not(any(feature = "defmt", feature = "log")), allow(dead_code))]
    fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Presence => "presence",
            Phase::AckLow => "ack-low",
            Phase::AckHigh => "ack-high",
            Phase::Sync => "sync",
            Phase::Data => "data",
        }
    }
}

/// A DHT11/DHT22-family sensor on a single open-drain data line.
///
/// The pin must be configured as open-drain with a pull-up: `set_low` drives the line and
/// `set_high` releases it so the sensor can answer.
///
/// The provided `time_fn` closure should provide some representation of a given instant that
/// can be used with `elapsed_since_fn` to determine how much time has passed since then. It
/// does not need to reflect real dates and times, but it must resolve single microseconds, since
/// bits are told apart by the width of their high pulse.
#[derive(Debug)]
pub struct Dht<P, D, TimeFn, ElapsedFn, TTime>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    pin: P,
    delay: D,
    model: SensorModel,
    options: Options,
    time_fn: TimeFn,
    elapsed_since_fn: ElapsedFn,
    last_transaction_time: Option<TTime>,
    reading: Reading,
    last_reading_time: Option<TTime>,
}

impl<P, D, E, TimeFn, ElapsedFn, TTime> Dht<P, D, TimeFn, ElapsedFn, TTime>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    /// Constructs a DHT sensor that reads from the given pin. No I/O is performed.
    ///
    /// If `options` is `None`, the model's profile defaults are used (see
    /// [`DEFAULT_PROFILE_A_OPTIONS`] or [`DEFAULT_PROFILE_B_OPTIONS`]). Reads can sometimes be
    /// more reliable with a longer interval, so consider raising `min_read_interval` if error
    /// rates are high.
    pub fn new(
        pin: P,
        delay: D,
        model: SensorModel,
        time_fn: TimeFn,
        elapsed_since_fn: ElapsedFn,
        options: Option<Options>,
    ) -> Result<Dht<P, D, TimeFn, ElapsedFn, TTime>, Error<E>> {
        let profile = model.profile();
        let options = match options {
            None => profile.default_options(),
            Some(options) => {
                if options.min_read_interval < profile.min_read_interval()
                    || options.max_polls < 1
                {
                    return Err(Error::InvalidArgument);
                }
                options
            }
        };
        Ok(Dht {
            pin,
            delay,
            model,
            options,
            time_fn,
            elapsed_since_fn,
            last_transaction_time: None,
            reading: Reading::default(),
            last_reading_time: None,
        })
    }

    /// Performs one transaction with the sensor and, if it succeeds, replaces the cached
    /// reading.
    ///
    /// Due to the tight timing necessary to distinguish bits in the DHT's response, this
    /// busy-polls the line for the whole transaction: the start pulse (18ms for profile A, 1ms
    /// for profile B) plus about 4-5ms of data.
    ///
    /// Returns [`Error::BusBusy`] without touching the line if called within
    /// [`Options::min_read_interval`] of the end of the previous transaction, including a
    /// failed one.
    ///
    /// On any error the cached reading is left as it was, and the line is left released.
    pub fn read_data(&mut self) -> Result<(), Error<E>> {
        if let Some(last_transaction_time) = self.last_transaction_time {
            if (self.elapsed_since_fn)(last_transaction_time) < self.options.min_read_interval {
                trace!("dht: read requested within the minimum read interval");
                return Err(Error::BusBusy);
            }
        }
        self.wait_while(Phase::Idle)?;

        let received = self.send_start_pulse().and_then(|_| self.receive_frame());
        self.finish_transaction()?;
        let frame = received?;

        if !frame.is_valid() {
            warn!(
                "dht: checksum mismatch, got {} expected {}",
                frame.checksum(),
                frame.expected_checksum()
            );
            return Err(Error::Checksum);
        }

        let reading = frame.decode(self.profile());
        debug!(
            "dht: {} read {}% {}C",
            self.model.name(),
            reading.humidity,
            reading.temperature
        );
        self.reading = reading;
        self.last_reading_time = Some((self.time_fn)());
        Ok(())
    }

    /// Humidity in percent from the last successful read, or 0 if there has not been one.
    pub fn humidity(&self) -> f32 {
        self.reading.humidity
    }

    /// Temperature from the last successful read in the given scale, or the equivalent of 0°C
    /// if there has not been one.
    pub fn temperature(&self, scale: Scale) -> f32 {
        scale.convert_celsius(self.reading.temperature)
    }

    /// The last successful reading, if any.
    pub fn reading(&self) -> Option<Reading> {
        self.last_reading_time.map(|_| self.reading)
    }

    /// When the cached reading was taken, as reported by `time_fn`.
    pub fn last_reading_time(&self) -> Option<TTime> {
        self.last_reading_time
    }

    pub fn reading_age(&self) -> Option<Duration> {
        self.last_reading_time.map(|time| (self.elapsed_since_fn)(time))
    }

    /// See [`units::dew_point`]. Uses the cached reading.
    pub fn dew_point(&self) -> f32 {
        units::dew_point(self.reading.temperature, self.reading.humidity)
    }

    /// See [`units::dew_point_fast`]. Uses the cached reading.
    pub fn dew_point_fast(&self) -> f32 {
        units::dew_point_fast(self.reading.temperature, self.reading.humidity)
    }

    pub fn model(&self) -> SensorModel {
        self.model
    }

    pub fn profile(&self) -> Profile {
        self.model.profile()
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Releases the pin and delay.
    pub fn free(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn send_start_pulse(&mut self) -> Result<(), Error<E>> {
        let pulse = self.profile().start_pulse();
        trace!("dht: start pulse of {}us", pulse.as_micros() as u32);
        self.pin.set_low().map_err(Error::Wrapped)?;
        self.delay.delay_us(pulse.as_micros() as u32);
        self.pin.set_high().map_err(Error::Wrapped)?;
        self.delay.delay_us(RELEASE_SETTLE_US);
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<RawFrame, Error<E>> {
        self.wait_while(Phase::Presence)?;
        self.wait_while(Phase::AckLow)?;
        self.wait_while(Phase::AckHigh)?;

        // Only record pulse widths while receiving; decoding them can wait.
        let mut high_durations = [Duration::ZERO; BIT_COUNT];
        for duration in high_durations.iter_mut() {
            self.wait_while(Phase::Sync)?;
            *duration = self.wait_while(Phase::Data)?;
        }

        let mut bytes = [0u8; 5];
        for (byte, durations) in bytes.iter_mut().zip(high_durations.chunks_exact(8)) {
            *byte = parse_byte(durations);
        }
        Ok(RawFrame::new(bytes))
    }

    /// Leaves the line released and starts the sensor's recovery interval.
    fn finish_transaction(&mut self) -> Result<(), Error<E>> {
        self.last_transaction_time = Some((self.time_fn)());
        self.pin.set_high().map_err(Error::Wrapped)
    }

    /// Polls the line while it holds the level expected for `phase`, returning how long it held.
    #[inline]
    fn wait_while(&mut self, phase: Phase) -> Result<Duration, Error<E>> {
        let start_time = (self.time_fn)();
        let mut polls: u32 = 0;
        loop {
            let is_high = self.pin.is_high().map_err(Error::Wrapped)?;
            let elapsed = (self.elapsed_since_fn)(start_time);
            if is_high != phase.holds_high() {
                return Ok(elapsed);
            }
            if elapsed > phase.budget() {
                warn!(
                    "dht: {} phase exceeded {}us",
                    phase.name(),
                    phase.budget().as_micros() as u32
                );
                return Err(phase.timeout_error());
            }
            polls += 1;
            if polls >= self.options.max_polls {
                warn!("dht: gave up waiting in {} phase", phase.name());
                return Err(Error::NoPatience);
            }
        }
    }
}

fn parse_byte(high_durations: &[Duration]) -> u8 {
    let mut byte = 0u8;
    for (i, duration) in high_durations.iter().enumerate() {
        if *duration > ONE_BIT_THRESHOLD {
            byte |= 1 << (7 - i);
        }
    }
    byte
}
