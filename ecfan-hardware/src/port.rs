//! Raw I/O port transport
//!
//! The EC is reached through two legacy I/O ports. This module defines the
//! transport seam (`PortIo`) and the real implementation over `/dev/port`,
//! where a byte at offset N is a read/write of port N.

use ecfan_core::{EcfanError, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte-wide I/O port access.
///
/// The trait exists so the bus and everything above it can run against a
/// simulated EC; the calls are synchronous because a port access is a single
/// in/out instruction from the kernel's point of view.
pub trait PortIo: Send {
    /// Read one byte from an I/O port
    fn inb(&mut self, port: u16) -> Result<u8>;

    /// Write one byte to an I/O port
    fn outb(&mut self, port: u16, value: u8) -> Result<()>;
}

/// I/O port access through the `/dev/port` device node.
///
/// Holding the open file is the EC session: it is created once at startup
/// and lives until the process exits. Opening requires root.
pub struct DevPort {
    file: File,
    path: PathBuf,
}

impl DevPort {
    /// Open the port device. Failure here is fatal to the daemon; there is
    /// no degraded mode for hardware control.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                EcfanError::Ec(format!(
                    "Failed to open EC port device {}: {}",
                    path.display(),
                    e
                ))
            })?;

        debug!("Opened EC port device {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Device node this session was opened on
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PortIo for DevPort {
    fn inb(&mut self, port: u16) -> Result<u8> {
        let mut buf = [0u8; 1];
        let n = self
            .file
            .read_at(&mut buf, port as u64)
            .map_err(|e| EcfanError::Ec(format!("Port 0x{:02X} read failed: {}", port, e)))?;
        if n != 1 {
            return Err(EcfanError::Ec(format!(
                "Port 0x{:02X} read returned {} bytes",
                port, n
            )));
        }
        Ok(buf[0])
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        let n = self
            .file
            .write_at(&[value], port as u64)
            .map_err(|e| EcfanError::Ec(format!("Port 0x{:02X} write failed: {}", port, e)))?;
        if n != 1 {
            return Err(EcfanError::Ec(format!(
                "Port 0x{:02X} write wrote {} bytes",
                port, n
            )));
        }
        Ok(())
    }
}
