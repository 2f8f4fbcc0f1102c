//! Shared test helpers for license tests.

#![allow(dead_code)]

use debase_license::{Email, MachineId, MachineInfo};
use rand::{CryptoRng, RngCore};

pub const TEST_DOMAIN: &str = "debase.test";

/// Returns a well-formed machine id built by repeating `c`.
pub fn machine_id_of(c: char) -> MachineId {
    MachineId::parse(&c.to_string().repeat(64)).unwrap()
}

pub fn test_email() -> Email {
    Email::parse("test@example.com").unwrap()
}

pub fn test_info() -> MachineInfo {
    MachineInfo::new("MacBookPro18,3 / macOS 14.2")
}

/// A secure-random source that always fails.
pub struct BrokenRng;

impl RngCore for BrokenRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!("only try_fill_bytes is used")
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!("only try_fill_bytes is used")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!("only try_fill_bytes is used")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for BrokenRng {}
