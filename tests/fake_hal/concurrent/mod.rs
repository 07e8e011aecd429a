use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

// Tests run in parallel, so each fake device keys its clock by a unique name.
lazy_static! {
    static ref CLOCKS_US: Mutex<HashMap<&'static str, u64>> = Mutex::new(HashMap::new());
}

pub fn set_named_value(name: &'static str, value: u64) {
    let mut map = CLOCKS_US.lock().unwrap();
    map.insert(name, value);
}

pub fn get_named_value(name: &'static str) -> u64 {
    let map = CLOCKS_US.lock().unwrap();
    *map.get(name).unwrap_or(&0)
}

/// Adds to the named value, returning the value from before the addition.
pub fn add_to_named_value(name: &'static str, amount: u64) -> u64 {
    let mut map = CLOCKS_US.lock().unwrap();
    let value = map.entry(name).or_insert(0);
    *value += amount;
    *value - amount
}
