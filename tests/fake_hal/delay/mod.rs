use super::concurrent;
use embedded_hal::delay::DelayNs;

/// Delays by advancing the named fake clock instead of sleeping.
#[derive(Debug)]
pub struct Delay {
    name: &'static str,
}

impl Delay {
    pub fn new(name: &'static str) -> Delay {
        Delay { name }
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        concurrent::add_to_named_value(self.name, (ns as u64 + 999) / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        concurrent::add_to_named_value(self.name, us as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        concurrent::add_to_named_value(self.name, ms as u64 * 1000);
    }
}
