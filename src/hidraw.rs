use crate::error::{Error, Result};
use crate::session::DeviceHandle;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const VENDOR_ID: u16 = 0x37d7;
pub const PRODUCT_ID: u16 = 0x2401;

const SYSFS_HIDRAW: &str = "/sys/class/hidraw";

/// IDs and interface number of one hidraw node, from its `uevent` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: Option<u8>,
}

/// Parse `HID_ID=0003:000037D7:00002401` and `HID_PHYS=usb-...-1/input1`.
pub fn parse_uevent(text: &str) -> Option<HidInfo> {
    let mut ids = None;
    let mut interface = None;
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("HID_ID=") {
            let mut parts = value.split(':').skip(1);
            let vid = u32::from_str_radix(parts.next()?, 16).ok()?;
            let pid = u32::from_str_radix(parts.next()?, 16).ok()?;
            ids = Some((u16::try_from(vid).ok()?, u16::try_from(pid).ok()?));
        } else if let Some(value) = line.strip_prefix("HID_PHYS=") {
            interface = value
                .rsplit_once("/input")
                .and_then(|(_, n)| n.parse().ok());
        }
    }
    let (vendor_id, product_id) = ids?;
    Some(HidInfo {
        vendor_id,
        product_id,
        interface,
    })
}

/// Find the `/dev/hidrawN` node for the given device and interface.
pub fn find_hidraw_device(vendor_id: u16, product_id: u16, interface: u8) -> Result<PathBuf> {
    let not_found = Error::NotFound {
        vendor_id,
        product_id,
        interface,
    };
    let entries = match std::fs::read_dir(SYSFS_HIDRAW) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found),
        Err(e) => return Err(e.into()),
    };

    let mut names: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    names.sort();

    for name in names {
        let uevent = Path::new(SYSFS_HIDRAW).join(&name).join("device/uevent");
        let Ok(text) = std::fs::read_to_string(&uevent) else {
            continue;
        };
        let Some(info) = parse_uevent(&text) else {
            continue;
        };
        if info.vendor_id == vendor_id
            && info.product_id == product_id
            && info.interface == Some(interface)
        {
            let path = Path::new("/dev").join(&name);
            log::info!("Found controller at {}", path.display());
            return Ok(path);
        }
    }
    Err(not_found)
}

pub enum Readiness {
    Readable,
    Timeout,
}

/// Non-blocking read/write handle on a hidraw node.
pub struct Hidraw {
    file: File,
    path: PathBuf,
}

impl Hidraw {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        log::info!("Opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for a report. Hangup means the device is gone.
    pub fn wait_readable(&self, timeout: Duration) -> Result<Readiness> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms =
            libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::Timeout);
            }
            return Err(Error::from_device_io(err));
        }
        if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
            return Err(Error::DeviceGone(io::Error::from_raw_os_error(libc::ENODEV)));
        }
        if ret == 0 {
            return Ok(Readiness::Timeout);
        }
        Ok(Readiness::Readable)
    }
}

impl DeviceHandle for Hidraw {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }
}
