use super::concurrent;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use std::collections::VecDeque;

#[derive(Debug, PartialEq)]
pub enum Error {}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {}
    }
}

/// Builds the line levels a sensor produces, one entry per microsecond.
#[derive(Debug, Default)]
pub struct Waveform(Vec<bool>);

impl Waveform {
    pub fn new() -> Waveform {
        Waveform(Vec::new())
    }

    pub fn high(mut self, us: usize) -> Waveform {
        self.0.extend(std::iter::repeat(true).take(us));
        self
    }

    pub fn low(mut self, us: usize) -> Waveform {
        self.0.extend(std::iter::repeat(false).take(us));
        self
    }

    pub fn into_levels(self) -> Vec<bool> {
        self.0
    }
}

/// An open-drain pin on a line with a pull-up and a scripted sensor.
///
/// Every time the host releases the line after driving it low, the next queued waveform starts
/// playing. Each sample of the line advances the named clock by one microsecond. Once a waveform
/// runs out, or if none was queued, the pull-up holds the line high.
#[derive(Debug)]
pub struct Pin {
    name: &'static str,
    queued: VecDeque<Vec<bool>>,
    playing: Vec<bool>,
    idle_high: bool,
    driven_low: bool,
    released_at: Option<u64>,
    start_pulses: usize,
}

impl Pin {
    pub fn new(name: &'static str) -> Pin {
        concurrent::set_named_value(name, 0);
        Pin {
            name,
            queued: VecDeque::new(),
            playing: Vec::new(),
            idle_high: true,
            driven_low: false,
            released_at: None,
            start_pulses: 0,
        }
    }

    /// Queues the sensor's response to the next start pulse.
    pub fn queue_response(&mut self, waveform: Waveform) {
        self.queued.push_back(waveform.into_levels());
    }

    /// Sets the line level seen before the host has ever driven the line.
    pub fn set_idle_high(&mut self, idle_high: bool) {
        self.idle_high = idle_high;
    }

    pub fn start_pulses(&self) -> usize {
        self.start_pulses
    }

    pub fn is_released(&self) -> bool {
        !self.driven_low
    }

    fn sample(&mut self) -> bool {
        let now = concurrent::add_to_named_value(self.name, 1);
        if self.driven_low {
            return false;
        }
        match self.released_at {
            None => self.idle_high,
            Some(released_at) => self
                .playing
                .get((now - released_at) as usize)
                .copied()
                .unwrap_or(true),
        }
    }
}

impl ErrorType for Pin {
    type Error = Error;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sample())
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if !self.driven_low {
            self.start_pulses += 1;
        }
        self.driven_low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.driven_low {
            self.released_at = Some(concurrent::get_named_value(self.name));
            self.playing = self.queued.pop_front().unwrap_or_default();
        }
        self.driven_low = false;
        Ok(())
    }
}
