/*!
Abstraction over a physical address in the captured machine.
*/

use std::fmt;
use std::ops;

/// This type represents an absolute physical address of the captured
/// machine. It is a thin wrapper over an `u64` value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Address(u64);

impl Address {
    /// A address with the value of zero.
    pub const NULL: Address = Address(0);

    /// Returns an address with a value of zero.
    pub const fn null() -> Self {
        Address::NULL
    }

    /// Checks wether the address is zero or not.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the address as an `u64` value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the address as an `usize` value.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u64> for Address {
    fn from(item: u64) -> Self {
        Address(item)
    }
}

impl From<u32> for Address {
    fn from(item: u32) -> Self {
        Address(u64::from(item))
    }
}

impl From<usize> for Address {
    fn from(item: usize) -> Self {
        Address(item as u64)
    }
}

impl ops::Add<u64> for Address {
    type Output = Address;

    fn add(self, other: u64) -> Address {
        Address(self.0 + other)
    }
}

impl ops::Sub<Address> for Address {
    type Output = u64;

    fn sub(self, other: Address) -> u64 {
        self.0 - other.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
