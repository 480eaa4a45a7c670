//! Handshake and report reading over a raw HID handle.

use crate::error::{is_device_gone, Error, Result};
use crate::report::{self, Packet, CMD_TEST_MODE, PKT_SIZE};
use crate::state::GamepadState;
use std::io;
use std::time::Duration;

/// Reads per command while waiting for the controller's reply.
const CMD_RETRIES: usize = 10;
const DRAIN_READS: usize = 10;
const RETRY_DELAY: Duration = Duration::from_millis(5);

/// A non-blocking raw HID handle. A read with nothing pending fails with
/// `WouldBlock`.
pub trait DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

pub struct DeviceSession<H: DeviceHandle> {
    handle: H,
    retry_delay: Duration,
    test_mode: bool,
}

impl<H: DeviceHandle> DeviceSession<H> {
    /// Drain stale reports, send the init sequence and enable test mode.
    pub fn open(handle: H) -> Result<Self> {
        Self::with_retry_delay(handle, RETRY_DELAY)
    }

    pub fn with_retry_delay(handle: H, retry_delay: Duration) -> Result<Self> {
        let mut session = Self {
            handle,
            retry_delay,
            test_mode: false,
        };
        session.drain()?;
        for pkt in report::init_sequence() {
            session.send_command(&pkt)?;
        }
        session.send_command(&report::test_mode_packet(true))?;
        session.test_mode = true;
        log::info!("controller initialized, extended reports enabled");
        Ok(session)
    }

    fn drain(&mut self) -> Result<()> {
        let mut buf = [0u8; PKT_SIZE];
        for _ in 0..DRAIN_READS {
            match self.handle.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if is_no_data(&e) => break,
                Err(e) if is_device_gone(&e) => return Err(Error::DeviceGone(e)),
                Err(e) => {
                    log::debug!("drain stopped: {e}");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Write one command and wait for a `5A A5` reply. Input reports that
    /// arrive in between are skipped.
    fn send_command(&mut self, pkt: &Packet) -> Result<()> {
        let command = pkt[2];
        let written = self
            .handle
            .write(pkt)
            .map_err(|e| command_failed(command, e))?;
        if written != pkt.len() {
            return Err(Error::protocol(
                command,
                format!("short write ({written} of {} bytes)", pkt.len()),
            ));
        }

        let mut buf = [0u8; PKT_SIZE];
        for _ in 0..CMD_RETRIES {
            match self.handle.read(&mut buf) {
                Ok(n) if report::is_command_response(&buf[..n]) => {
                    log::debug!("command {command:#04x} acknowledged");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if is_no_data(&e) => {}
                Err(e) => return Err(command_failed(command, e)),
            }
            if !self.retry_delay.is_zero() {
                spin_sleep::sleep(self.retry_delay);
            }
        }
        Err(Error::protocol(command, "no response"))
    }

    /// One decoded report, or `None` when nothing is pending or the report
    /// was not recognised.
    pub fn read_state(&mut self) -> Result<Option<GamepadState>> {
        let mut buf = [0u8; 64];
        match self.handle.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(report::decode(&buf[..n])),
            Err(e) if is_no_data(&e) => Ok(None),
            Err(e) => Err(Error::from_device_io(e)),
        }
    }

    /// Best effort; returns whether the full packet went out.
    pub fn send_rumble(&mut self, left: u8, right: u8) -> bool {
        let pkt = report::rumble_packet(left, right);
        match self.handle.write(&pkt) {
            Ok(n) => n == pkt.len(),
            Err(e) => {
                log::debug!("rumble write failed: {e}");
                false
            }
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

impl<H: DeviceHandle> Drop for DeviceSession<H> {
    fn drop(&mut self) {
        if !self.test_mode {
            return;
        }
        // The device may already be gone.
        if let Err(e) = self.handle.write(&report::test_mode_packet(false)) {
            log::debug!("test mode off (cmd {CMD_TEST_MODE:#04x}) failed: {e}");
        }
    }
}

/// A dead handle stays `DeviceGone`; anything else fails the command.
fn command_failed(command: u8, err: io::Error) -> Error {
    if is_device_gone(&err) {
        Error::DeviceGone(err)
    } else {
        Error::protocol(command, err.to_string())
    }
}

fn is_no_data(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    pub enum Reply {
        Data(Vec<u8>),
        Err(io::ErrorKind),
        Os(i32),
    }

    #[derive(Default)]
    pub struct Shared {
        pub reads: VecDeque<Reply>,
        pub writes: Vec<Vec<u8>>,
        /// Answer every write with a `5A A5` echo.
        pub auto_ack: bool,
        /// Fail every write with this errno.
        pub write_errno: Option<i32>,
    }

    /// Scripted handle. Reads pop from a queue and fall back to `WouldBlock`.
    #[derive(Clone, Default)]
    pub struct MockHandle(pub Rc<RefCell<Shared>>);

    impl MockHandle {
        pub fn acking() -> Self {
            let mock = Self::default();
            mock.0.borrow_mut().auto_ack = true;
            mock
        }

        pub fn push(&self, data: &[u8]) {
            self.0.borrow_mut().reads.push_back(Reply::Data(data.to_vec()));
        }

        pub fn push_err(&self, kind: io::ErrorKind) {
            self.0.borrow_mut().reads.push_back(Reply::Err(kind));
        }

        pub fn push_os_err(&self, code: i32) {
            self.0.borrow_mut().reads.push_back(Reply::Os(code));
        }

        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.0.borrow().writes.clone()
        }
    }

    impl DeviceHandle for MockHandle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.borrow_mut().reads.pop_front() {
                Some(Reply::Data(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Reply::Err(kind)) => Err(kind.into()),
                Some(Reply::Os(code)) => Err(io::Error::from_raw_os_error(code)),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let mut shared = self.0.borrow_mut();
            if let Some(code) = shared.write_errno {
                return Err(io::Error::from_raw_os_error(code));
            }
            shared.writes.push(data.to_vec());
            if shared.auto_ack {
                let mut ack = vec![0u8; PKT_SIZE];
                ack[..3].copy_from_slice(&data[..3]);
                shared.reads.push_back(Reply::Data(ack));
            }
            Ok(data.len())
        }
    }
}
