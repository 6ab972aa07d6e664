// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! IPv4 addresses and longest-prefix-match prefixes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("invalid IPv4 address: {0:?}")]
    Malformed(String),
    #[error("invalid prefix length: {0}")]
    BadPrefixLen(u8),
}

/// Four octets plus a cached 32-bit integer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Addr {
    octets: [u8; 4],
    #[serde(skip)]
    as_u32: u32,
}

impl Ipv4Addr {
    pub fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        let octets = [a, b, c, d];
        Self {
            octets,
            as_u32: u32::from_be_bytes(octets),
        }
    }

    pub fn from_u32(v: u32) -> Self {
        Self {
            octets: v.to_be_bytes(),
            as_u32: v,
        }
    }

    pub fn to_u32(self) -> u32 {
        self.as_u32
    }

    pub fn octets(self) -> [u8; 4] {
        self.octets
    }
}

impl FromStr for Ipv4Addr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(AddrParseError::Malformed(s.to_string()));
        }
        let mut octets = [0u8; 4];
        for (i, p) in parts.iter().enumerate() {
            octets[i] = p
                .parse::<u8>()
                .map_err(|_| AddrParseError::Malformed(s.to_string()))?;
        }
        Ok(Self::new(octets[0], octets[1], octets[2], octets[3]))
    }
}

impl fmt::Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.octets[0], self.octets[1], self.octets[2], self.octets[3]
        )
    }
}

/// A network prefix: `(network, prefix_len)`. `contains` implements `(addr & mask) == network`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prefix {
    network: u32,
    prefix_len: u8,
}

impl Prefix {
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, AddrParseError> {
        if prefix_len > 32 {
            return Err(AddrParseError::BadPrefixLen(prefix_len));
        }
        let mask = Self::mask_from_len(prefix_len);
        Ok(Self {
            network: network.to_u32() & mask,
            prefix_len,
        })
    }

    fn mask_from_len(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            0xFFFF_FFFFu32 << (32 - prefix_len)
        }
    }

    pub fn mask(&self) -> u32 {
        Self::mask_from_len(self.prefix_len)
    }

    pub fn network(&self) -> u32 {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn contains(&self, addr: u32) -> bool {
        (addr & self.mask()) == self.network
    }
}

impl FromStr for Prefix {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| AddrParseError::Malformed(s.to_string()))?;
        let addr: Ipv4Addr = addr.parse()?;
        let len: u8 = len
            .parse()
            .map_err(|_| AddrParseError::Malformed(s.to_string()))?;
        Self::new(addr, len)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from_u32(self.network), self.prefix_len)
    }
}
