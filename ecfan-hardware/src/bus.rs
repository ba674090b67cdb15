//! Serialized EC register bus
//!
//! All register traffic goes through [`EcBus`]. A single mutex spans the
//! full command/data handshake of every logical operation, so concurrent
//! callers (HTTP handlers, the monitor loop) never interleave on the wire.
//! The EC tolerates exactly one in-flight exchange; everything above this
//! module relies on that guarantee.

use crate::port::PortIo;
use ecfan_core::{EcfanError, FanId, PowerMode, Result, MAX_LEVEL};
use tokio::sync::Mutex;
use tracing::trace;

/// EC command port (status reads, command writes)
pub const EC_COMMAND_PORT: u16 = 0x66;
/// EC data port (register selection, data bytes)
pub const EC_DATA_PORT: u16 = 0x62;

/// Command byte selecting a register read
pub const EC_CMD_READ: u8 = 0x80;
/// Command byte selecting a register write
pub const EC_CMD_WRITE: u8 = 0x81;

// Status flags on the command port
const EC_STATUS_OUTPUT_BUFFER_FULL: u8 = 0x01;
const EC_STATUS_INPUT_BUFFER_FULL: u8 = 0x02;

// Status polls before an exchange is declared timed out
const STATUS_POLL_LIMIT: u32 = 500;

/// EC register map (mirrors the vendor's ACPI layout)
pub mod reg {
    pub const FIRMWARE_MAJOR: u8 = 0x00;
    pub const FIRMWARE_MINOR: u8 = 0x01;
    pub const APU_POWER_MODE: u8 = 0x31;
    pub const APU_TEMPERATURE: u8 = 0x70;

    /// Fan mode registers, indexed by fan; level register is mode + 1
    pub const FAN_MODE: [u8; 3] = [0x21, 0x23, 0x25];
    /// Fan tachometer (high, low) register pairs
    pub const FAN_SPEED: [(u8, u8); 3] = [(0x35, 0x36), (0x37, 0x38), (0x28, 0x29)];
}

fn fan_mode_register(fan: FanId) -> u8 {
    reg::FAN_MODE[fan.index()]
}

fn fan_level_register(fan: FanId) -> u8 {
    fan_mode_register(fan) + 1
}

/// Per-fan base value for mode and level registers (0x10/0x20/0x30)
fn fan_base(fan: FanId) -> u8 {
    fan.number() << 4
}

/// Encode a logical level (0-5) into the EC's level nibble
pub fn encode_level(level: u8) -> u8 {
    match level {
        0 => 0x7, // off
        1 => 0x2, // 20%
        2 => 0x3, // 40%
        3 => 0x4, // 60%
        4 => 0x5, // 80%
        _ => 0x6, // 100%
    }
}

/// Decode the EC's level nibble back to a logical level
pub fn decode_level(value: u8) -> u8 {
    match value & 0xF {
        0x2 => 1,
        0x3 => 2,
        0x4 => 3,
        0x5 => 4,
        0x6 => 5,
        _ => 0, // 0x7 and anything unexpected read as off
    }
}

fn power_mode_code(mode: PowerMode) -> u8 {
    match mode {
        PowerMode::Balanced => 0x00,
        PowerMode::Performance => 0x01,
        PowerMode::Quiet => 0x02,
    }
}

fn power_mode_from_code(code: u8) -> Result<PowerMode> {
    match code {
        0x00 => Ok(PowerMode::Balanced),
        0x01 => Ok(PowerMode::Performance),
        0x02 => Ok(PowerMode::Quiet),
        other => Err(EcfanError::Ec(format!(
            "Unknown power mode code: 0x{:02X}",
            other
        ))),
    }
}

/// Spin on the command port until the input buffer drains.
fn wait_input_clear(port: &mut dyn PortIo) -> Result<()> {
    for _ in 0..STATUS_POLL_LIMIT {
        if port.inb(EC_COMMAND_PORT)? & EC_STATUS_INPUT_BUFFER_FULL == 0 {
            return Ok(());
        }
    }
    Err(EcfanError::Ec(
        "Timed out waiting for EC input buffer".to_string(),
    ))
}

/// Spin on the command port until the output buffer holds a byte.
fn wait_output_full(port: &mut dyn PortIo) -> Result<()> {
    for _ in 0..STATUS_POLL_LIMIT {
        if port.inb(EC_COMMAND_PORT)? & EC_STATUS_OUTPUT_BUFFER_FULL != 0 {
            return Ok(());
        }
    }
    Err(EcfanError::Ec(
        "Timed out waiting for EC output buffer".to_string(),
    ))
}

/// One register read exchange. Caller must hold the bus guard.
fn read_register(port: &mut dyn PortIo, register: u8) -> Result<u8> {
    wait_input_clear(port)?;
    port.outb(EC_COMMAND_PORT, EC_CMD_READ)?;
    wait_input_clear(port)?;
    port.outb(EC_DATA_PORT, register)?;
    wait_input_clear(port)?;
    wait_output_full(port)?;
    let value = port.inb(EC_DATA_PORT)?;
    trace!("EC read 0x{:02X} -> 0x{:02X}", register, value);
    Ok(value)
}

/// One register write exchange. Caller must hold the bus guard.
fn write_register(port: &mut dyn PortIo, register: u8, value: u8) -> Result<()> {
    wait_input_clear(port)?;
    port.outb(EC_COMMAND_PORT, EC_CMD_WRITE)?;
    wait_input_clear(port)?;
    port.outb(EC_DATA_PORT, register)?;
    wait_input_clear(port)?;
    port.outb(EC_DATA_PORT, value)?;
    trace!("EC write 0x{:02X} <- 0x{:02X}", register, value);
    Ok(())
}

/// Exclusive owner of the EC session.
///
/// Operations are synchronous on the wire and block the caller for the
/// duration of the exchange (sub-millisecond in practice); contention is
/// resolved first-come-first-served by the internal mutex. A failed
/// exchange surfaces as [`EcfanError::Ec`] with no retry; the caller
/// decides whether to propagate it or skip a sample.
pub struct EcBus {
    port: Mutex<Box<dyn PortIo>>,
}

impl EcBus {
    /// Take ownership of an open EC session.
    pub fn new(port: Box<dyn PortIo>) -> Self {
        Self {
            port: Mutex::new(port),
        }
    }

    /// Read a single EC register.
    pub async fn read(&self, register: u8) -> Result<u8> {
        let mut port = self.port.lock().await;
        read_register(port.as_mut(), register)
    }

    /// Write a single EC register.
    pub async fn write(&self, register: u8, value: u8) -> Result<()> {
        let mut port = self.port.lock().await;
        write_register(port.as_mut(), register, value)
    }

    /// Firmware version as (major, minor). All-zero and all-0xFF pairs mean
    /// the EC did not answer the probe.
    pub async fn firmware_version(&self) -> Result<(u8, u8)> {
        let mut port = self.port.lock().await;
        let major = read_register(port.as_mut(), reg::FIRMWARE_MAJOR)?;
        let minor = read_register(port.as_mut(), reg::FIRMWARE_MINOR)?;

        if (major == 0 && minor == 0) || (major == 0xFF && minor == 0xFF) {
            return Err(EcfanError::Ec(
                "Invalid firmware version detected".to_string(),
            ));
        }

        Ok((major, minor))
    }

    /// APU temperature in degrees Celsius.
    pub async fn apu_temperature(&self) -> Result<u8> {
        self.read(reg::APU_TEMPERATURE).await
    }

    /// Active power preset as reported by the EC.
    pub async fn power_mode(&self) -> Result<PowerMode> {
        let code = self.read(reg::APU_POWER_MODE).await?;
        power_mode_from_code(code)
    }

    /// Apply a power preset.
    pub async fn set_power_mode(&self, mode: PowerMode) -> Result<()> {
        self.write(reg::APU_POWER_MODE, power_mode_code(mode)).await
    }

    /// Current rotation speed. The two tachometer bytes are read under one
    /// guard so the value is never torn by a concurrent operation.
    pub async fn fan_rpm(&self, fan: FanId) -> Result<u16> {
        let (high_reg, low_reg) = reg::FAN_SPEED[fan.index()];

        let mut port = self.port.lock().await;
        let high = read_register(port.as_mut(), high_reg)?;
        let low = read_register(port.as_mut(), low_reg)?;
        let rpm = u16::from_be_bytes([high, low]);

        // Fan 3's tachometer reports a phantom 8000 while spinning down
        if fan.number() == 3 && rpm == 8000 {
            return Ok(0);
        }

        Ok(rpm)
    }

    /// Current level of a fan, decoded from its level register.
    pub async fn fan_level(&self, fan: FanId) -> Result<u8> {
        let value = self.read(fan_level_register(fan)).await?;
        Ok(decode_level(value))
    }

    /// Drive a fan to the given level (0-5).
    pub async fn set_fan_level(&self, fan: FanId, level: u8) -> Result<()> {
        if level > MAX_LEVEL {
            return Err(EcfanError::InvalidLevel(level.into()));
        }
        let value = fan_base(fan) | encode_level(level);
        self.write(fan_level_register(fan), value).await
    }

    /// Select auto or manual control for a fan. Fixed and curve are both
    /// manual at the register level; the distinction is host-side state.
    pub async fn set_fan_mode(&self, fan: FanId, manual: bool) -> Result<()> {
        let value = fan_base(fan) + if manual { 1 } else { 0 };
        self.write(fan_mode_register(fan), value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedEc;

    fn bus() -> (EcBus, crate::sim::SimHandle) {
        let sim = SimulatedEc::new();
        let handle = sim.handle();
        (EcBus::new(Box::new(sim)), handle)
    }

    #[test]
    fn test_level_encoding_table() {
        assert_eq!(encode_level(0), 0x7);
        assert_eq!(encode_level(1), 0x2);
        assert_eq!(encode_level(2), 0x3);
        assert_eq!(encode_level(3), 0x4);
        assert_eq!(encode_level(4), 0x5);
        assert_eq!(encode_level(5), 0x6);
    }

    #[test]
    fn test_level_decoding_round_trip() {
        for level in 0..=MAX_LEVEL {
            assert_eq!(decode_level(0x20 | encode_level(level)), level);
        }
        // Unknown nibbles read as off
        assert_eq!(decode_level(0x10), 0);
        assert_eq!(decode_level(0x1F), 0);
    }

    #[test]
    fn test_power_mode_codes() {
        assert_eq!(power_mode_code(PowerMode::Balanced), 0x00);
        assert_eq!(power_mode_code(PowerMode::Performance), 0x01);
        assert_eq!(power_mode_code(PowerMode::Quiet), 0x02);

        assert_eq!(power_mode_from_code(0x01).unwrap(), PowerMode::Performance);
        assert!(power_mode_from_code(0x17).is_err());
    }

    #[tokio::test]
    async fn test_register_read_write_round_trip() {
        let (bus, _) = bus();
        bus.write(0x42, 0xAB).await.unwrap();
        assert_eq!(bus.read(0x42).await.unwrap(), 0xAB);
    }

    #[tokio::test]
    async fn test_temperature_read() {
        let (bus, handle) = bus();
        handle.set_temperature(72);
        assert_eq!(bus.apu_temperature().await.unwrap(), 72);
    }

    #[tokio::test]
    async fn test_firmware_probe_rejects_blank_ec() {
        let (bus, handle) = bus();
        assert_eq!(bus.firmware_version().await.unwrap(), (1, 5));

        handle.set_register(reg::FIRMWARE_MAJOR, 0xFF);
        handle.set_register(reg::FIRMWARE_MINOR, 0xFF);
        assert!(bus.firmware_version().await.is_err());

        handle.set_register(reg::FIRMWARE_MAJOR, 0x00);
        handle.set_register(reg::FIRMWARE_MINOR, 0x00);
        assert!(bus.firmware_version().await.is_err());
    }

    #[tokio::test]
    async fn test_set_fan_level_writes_encoded_register() {
        let (bus, handle) = bus();
        let fan2 = FanId::new(2).unwrap();

        bus.set_fan_level(fan2, 3).await.unwrap();
        // Fan 2: base 0x20, level 3 -> nibble 0x4, level register 0x24
        assert_eq!(handle.register(0x24), 0x24);
        assert_eq!(bus.fan_level(fan2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_set_fan_level_rejects_out_of_range() {
        let (bus, _) = bus();
        let fan1 = FanId::new(1).unwrap();
        assert!(matches!(
            bus.set_fan_level(fan1, 6).await,
            Err(EcfanError::InvalidLevel(6))
        ));
    }

    #[tokio::test]
    async fn test_fan_mode_register_values() {
        let (bus, handle) = bus();
        let fan3 = FanId::new(3).unwrap();

        bus.set_fan_mode(fan3, true).await.unwrap();
        assert_eq!(handle.register(0x25), 0x31);

        bus.set_fan_mode(fan3, false).await.unwrap();
        assert_eq!(handle.register(0x25), 0x30);
    }

    #[tokio::test]
    async fn test_fan_rpm_byte_order() {
        let (bus, handle) = bus();
        // 0x0BB8 = 3000 rpm on fan 1
        handle.set_register(0x35, 0x0B);
        handle.set_register(0x36, 0xB8);
        assert_eq!(bus.fan_rpm(FanId::new(1).unwrap()).await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn test_fan3_phantom_rpm_reads_as_zero() {
        let (bus, handle) = bus();
        // 8000 = 0x1F40
        handle.set_register(0x28, 0x1F);
        handle.set_register(0x29, 0x40);
        assert_eq!(bus.fan_rpm(FanId::new(3).unwrap()).await.unwrap(), 0);

        // The same reading on fan 1 is genuine
        handle.set_register(0x35, 0x1F);
        handle.set_register(0x36, 0x40);
        assert_eq!(bus.fan_rpm(FanId::new(1).unwrap()).await.unwrap(), 8000);
    }

    #[tokio::test]
    async fn test_power_mode_round_trip() {
        let (bus, _) = bus();
        bus.set_power_mode(PowerMode::Quiet).await.unwrap();
        assert_eq!(bus.power_mode().await.unwrap(), PowerMode::Quiet);
    }
}
