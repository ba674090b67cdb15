//! Simulated embedded controller
//!
//! Implements the command/data handshake of the real EC over an in-memory
//! register file, so the daemon can run in mock mode and the rest of the
//! workspace can be tested without hardware. Protocol misuse (a data byte
//! with no command in flight, an unknown command) is an error rather than
//! a silent default: the simulation is strict on purpose.

use crate::bus::{decode_level, reg, EC_CMD_READ, EC_CMD_WRITE, EC_COMMAND_PORT, EC_DATA_PORT};
use ecfan_core::{EcfanError, Result};
use std::sync::{Arc, Mutex};

/// Handshake progress of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Read command accepted, waiting for the register index
    ReadRegister,
    /// Write command accepted, waiting for the register index
    WriteRegister,
    /// Write register selected, waiting for the value
    WriteValue(u8),
    /// Register value latched for the host to collect
    DataReady(u8),
}

struct SimState {
    regs: [u8; 256],
    phase: Phase,
}

impl SimState {
    fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[reg::FIRMWARE_MAJOR as usize] = 1;
        regs[reg::FIRMWARE_MINOR as usize] = 5;
        regs[reg::APU_TEMPERATURE as usize] = 45;
        regs[reg::APU_POWER_MODE as usize] = 0x00;

        // Fans start in auto mode, level off
        for (i, &mode_reg) in reg::FAN_MODE.iter().enumerate() {
            let base = ((i as u8) + 1) << 4;
            regs[mode_reg as usize] = base;
            regs[(mode_reg + 1) as usize] = base | 0x7;
        }

        Self {
            regs,
            phase: Phase::Idle,
        }
    }

    /// Level writes move the modeled rotor; the tachometer follows.
    fn apply_side_effects(&mut self, register: u8, value: u8) {
        for (i, &mode_reg) in reg::FAN_MODE.iter().enumerate() {
            if register == mode_reg + 1 {
                let rpm = decode_level(value) as u16 * 850;
                let (high, low) = reg::FAN_SPEED[i];
                let bytes = rpm.to_be_bytes();
                self.regs[high as usize] = bytes[0];
                self.regs[low as usize] = bytes[1];
            }
        }
    }
}

/// Shared view into a [`SimulatedEc`], for tests and the mock-mode
/// temperature source.
#[derive(Clone)]
pub struct SimHandle {
    inner: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Overwrite a register directly, bypassing the handshake.
    pub fn set_register(&self, register: u8, value: u8) {
        self.inner.lock().unwrap().regs[register as usize] = value;
    }

    /// Read a register directly, bypassing the handshake.
    pub fn register(&self, register: u8) -> u8 {
        self.inner.lock().unwrap().regs[register as usize]
    }

    /// Set the reported APU temperature.
    pub fn set_temperature(&self, celsius: u8) {
        self.set_register(reg::APU_TEMPERATURE, celsius);
    }
}

/// The simulated EC session. Boxed into an [`crate::EcBus`] exactly like a
/// real [`crate::DevPort`].
pub struct SimulatedEc {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedEc {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// A handle for inspecting and steering the simulation.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            inner: self.inner.clone(),
        }
    }
}

impl Default for SimulatedEc {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::port::PortIo for SimulatedEc {
    fn inb(&mut self, port: u16) -> Result<u8> {
        let mut state = self.inner.lock().unwrap();
        match port {
            EC_COMMAND_PORT => {
                // Status: the simulation consumes input instantly, so the
                // input buffer is always clear; output is full while a
                // latched byte waits.
                let obf = matches!(state.phase, Phase::DataReady(_));
                Ok(if obf { 0x01 } else { 0x00 })
            }
            EC_DATA_PORT => match state.phase {
                Phase::DataReady(value) => {
                    state.phase = Phase::Idle;
                    Ok(value)
                }
                phase => Err(EcfanError::Ec(format!(
                    "Data port read with no data latched (phase {:?})",
                    phase
                ))),
            },
            other => Err(EcfanError::Ec(format!("Unmapped port 0x{:02X}", other))),
        }
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        match port {
            EC_COMMAND_PORT => {
                state.phase = match value {
                    EC_CMD_READ => Phase::ReadRegister,
                    EC_CMD_WRITE => Phase::WriteRegister,
                    other => {
                        return Err(EcfanError::Ec(format!(
                            "Unknown EC command 0x{:02X}",
                            other
                        )))
                    }
                };
                Ok(())
            }
            EC_DATA_PORT => {
                match state.phase {
                    Phase::ReadRegister => {
                        state.phase = Phase::DataReady(state.regs[value as usize]);
                    }
                    Phase::WriteRegister => {
                        state.phase = Phase::WriteValue(value);
                    }
                    Phase::WriteValue(register) => {
                        state.regs[register as usize] = value;
                        state.apply_side_effects(register, value);
                        state.phase = Phase::Idle;
                    }
                    phase => {
                        return Err(EcfanError::Ec(format!(
                            "Data byte 0x{:02X} with no command in flight (phase {:?})",
                            value, phase
                        )))
                    }
                }
                Ok(())
            }
            other => Err(EcfanError::Ec(format!("Unmapped port 0x{:02X}", other))),
        }
    }
}
