/*!
This crate contains the foundation of dumpflow's dump analysis framework.

You will almost always import this module when working with dumpflow.

It contains the normalized model of a captured machine:
[CPU register snapshots](cpu/index.html),
[physical memory chunks](mem/index.html) and
[dump header attributes](attrs/index.html), as well as the
[dump format trait and dispatch](dfi/index.html) that format drivers
plug into.
*/

#[macro_use]
extern crate bitflags;

pub mod error;
#[doc(hidden)]
pub use error::*;

pub mod types;
#[doc(hidden)]
pub use types::*;

pub mod source;
#[doc(hidden)]
pub use source::*;

pub mod attrs;
#[doc(hidden)]
pub use attrs::*;

pub mod cpu;
#[doc(hidden)]
pub use cpu::*;

pub mod mem;
#[doc(hidden)]
pub use mem::*;

pub mod dfi;
#[doc(hidden)]
pub use dfi::*;

pub mod vmcoreinfo;
#[doc(hidden)]
pub use vmcoreinfo::*;
