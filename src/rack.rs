// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Rack key derivation shared by the mixed scenario's rack-balanced allocation/stage
//! placement and the mice injector's optional cross-rack rejection sampling.

use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref LEAF_DIGITS: Regex = Regex::new(r"leaf(\d+)").unwrap();
}

/// Searches for a `leaf<digits>` substring and parses `<digits>`; if absent, concatenates
/// every ASCII digit anywhere in the name and buckets it `(n - 1) / 4`; if the name has no
/// digits at all, defaults to rack 0.
pub fn rack_key(host_name: &str) -> u32 {
    if let Some(caps) = LEAF_DIGITS.captures(host_name) {
        if let Ok(n) = caps[1].parse() {
            return n;
        }
    }
    let digits: String = host_name.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Ok(n) = digits.parse::<u32>() {
        if n == 0 {
            return 0;
        }
        return (n - 1) / 4;
    }
    0
}
