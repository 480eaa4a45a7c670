use std::io;

/// Errors surfaced by the device session and the daemon wiring.
///
/// "No data yet" is never an error: reads that would block come back as
/// `Ok(None)`. Malformed reports never get this far either, the decoder
/// simply drops them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device went away (unplugged, receiver lost, I/O error).
    #[error("device disconnected: {0}")]
    DeviceGone(#[source] io::Error),

    /// Handshake or test-mode negotiation failed.
    #[error("protocol error on command {command:#04x}: {reason}")]
    Protocol { command: u8, reason: String },

    #[error("no hidraw node for {vendor_id:04x}:{product_id:04x} interface {interface}")]
    NotFound {
        vendor_id: u16,
        product_id: u16,
        interface: u8,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn protocol(command: u8, reason: impl Into<String>) -> Self {
        Error::Protocol {
            command,
            reason: reason.into(),
        }
    }

    /// Classify a raw I/O error from the device handle.
    pub fn from_device_io(err: io::Error) -> Self {
        if is_device_gone(&err) {
            Error::DeviceGone(err)
        } else {
            Error::Io(err)
        }
    }
}

/// ENODEV / EIO / hangup style errors mean the handle is dead.
pub fn is_device_gone(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::ENODEV) | Some(libc::EIO) | Some(libc::ENXIO) | Some(libc::ESHUTDOWN)
    ) || err.kind() == io::ErrorKind::BrokenPipe
}

pub type Result<T> = std::result::Result<T, Error>;
