//! ecfan Hardware Library
//!
//! Low-level access to the embedded controller: the raw port transport,
//! the serialized register bus, and a protocol-accurate simulated EC for
//! mock mode and tests.

pub mod bus;
pub mod port;
pub mod sim;

pub use bus::{decode_level, encode_level, EcBus};
pub use port::{DevPort, PortIo};
pub use sim::{SimHandle, SimulatedEc};
