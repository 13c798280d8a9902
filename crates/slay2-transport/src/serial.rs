//! Raw-mode serial device transport (Unix).
//!
//! Configures the device for 8N1 without parity, flow control or any line
//! discipline processing, and with fully non-blocking reads (`VMIN = 0`,
//! `VTIME = 0`). The queued-transmit count comes from `TIOCOUTQ`, which is
//! what the engine's low-water gate keys on.

use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// A serial device opened in raw 8N1 mode.
#[derive(Debug)]
pub struct SerialPort {
    fd: OwnedFd,
    path: PathBuf,
    epoch: Instant,
}

impl SerialPort {
    /// Open and configure `path` at the given baud rate.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(baud).ok_or(TransportError::UnsupportedBaudRate(baud))?;

        let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| TransportError::Open {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"),
        })?;

        // SAFETY: `cpath` is a valid NUL-terminated string for the duration of
        // the call.
        let raw = unsafe { libc::open(cpath.as_ptr(), libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK) };
        if raw < 0 {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::last_os_error(),
            });
        }
        // SAFETY: `raw` is a freshly opened descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        configure(&fd, speed).map_err(|source| TransportError::Configure {
            path: path.clone(),
            source,
        })?;

        debug!(?path, baud, "serial port opened");
        Ok(Self {
            fd,
            path,
            epoch: Instant::now(),
        })
    }

    /// The device path this port was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn configure(fd: &OwnedFd, speed: libc::speed_t) -> std::io::Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: `tty` is a plain-old-data struct; zeroing gives every field a
    // defined value before tcgetattr overwrites it.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `raw` is an open descriptor and `tty` a valid writable pointer.
    if unsafe { libc::tcgetattr(raw, &mut tty) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // Raw mode: no echo, no canonical input, no signals, 8-bit characters,
    // parity and flow control off.
    // SAFETY: `tty` is a valid termios structure.
    unsafe {
        libc::cfmakeraw(&mut tty);
        libc::cfsetspeed(&mut tty, speed);
    }
    // Non-blocking reads: return immediately even when nothing is pending.
    tty.c_cc[libc::VMIN] = 0;
    tty.c_cc[libc::VTIME] = 0;

    // SAFETY: as above; TCSANOW applies the settings immediately.
    if unsafe { libc::tcsetattr(raw, libc::TCSANOW, &tty) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // Drop whatever is sitting in the driver buffers from before we owned
    // the line.
    // SAFETY: `raw` is an open descriptor.
    unsafe {
        libc::tcflush(raw, libc::TCIOFLUSH);
    }
    Ok(())
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

impl Transport for SerialPort {
    fn transmit(&mut self, data: &[u8]) -> usize {
        // SAFETY: `data` is a valid readable buffer of the given length.
        let written = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                data.as_ptr().cast::<libc::c_void>(),
                data.len(),
            )
        };
        if written < 0 {
            trace!(path = ?self.path, "write accepted nothing");
            return 0;
        }
        written as usize
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        // SAFETY: `buf` is a valid writable buffer of the given length.
        let read = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
            )
        };
        if read <= 0 {
            return 0;
        }
        read as usize
    }

    fn queued_tx_bytes(&mut self) -> usize {
        let mut count: libc::c_int = 0;
        // SAFETY: TIOCOUTQ writes a c_int; `count` is a valid writable
        // pointer for that size.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), libc::TIOCOUTQ, &mut count) };
        if rc != 0 || count < 0 {
            return 0;
        }
        count as usize
    }

    fn now_millis(&mut self) -> u32 {
        // Clamp away from 0: the engine treats 0 as "uninitialized".
        (self.epoch.elapsed().as_millis() as u32).max(1)
    }
}
