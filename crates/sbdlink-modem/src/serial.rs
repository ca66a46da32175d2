use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ModemError, Result};

/// A raw serial line to the modem.
///
/// Reads return after at most 100 ms without data (`VMIN = 0`, `VTIME = 1`),
/// so the AT driver can enforce its own deadlines.
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Line speed of the 9602/9603 serial interface.
    pub const DEFAULT_BAUD: u32 = 19_200;

    /// Open a serial device at the default speed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_baud(path, Self::DEFAULT_BAUD)
    }

    /// Open a serial device in raw 8N1 mode at `baud`.
    pub fn open_with_baud(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = speed(baud)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| ModemError::Open {
                path: path.clone(),
                source,
            })?;
        configure(file.as_raw_fd(), speed).map_err(|source| ModemError::Open {
            path: path.clone(),
            source,
        })?;

        info!(?path, baud, "opened serial port");
        Ok(Self { file, path })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .finish()
    }
}

fn speed(baud: u32) -> Result<libc::speed_t> {
    match baud {
        9_600 => Ok(libc::B9600),
        19_200 => Ok(libc::B19200),
        38_400 => Ok(libc::B38400),
        57_600 => Ok(libc::B57600),
        115_200 => Ok(libc::B115200),
        other => Err(ModemError::UnsupportedBaud(other)),
    }
}

fn check(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn configure(fd: RawFd, speed: libc::speed_t) -> io::Result<()> {
    // SAFETY: `termios` is plain data; tcgetattr fully initialises it before use.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by the caller and `tio` is a
    // valid, writable termios for every call below.
    unsafe {
        check(libc::tcgetattr(fd, &mut tio))?;
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = 1;
        check(libc::cfsetispeed(&mut tio, speed))?;
        check(libc::cfsetospeed(&mut tio, speed))?;
        check(libc::tcsetattr(fd, libc::TCSANOW, &tio))?;
        check(libc::tcflush(fd, libc::TCIOFLUSH))?;

        // Opened non-blocking so a missing carrier cannot hang open(2);
        // reads block again, bounded by VTIME.
        let flags = check(libc::fcntl(fd, libc::F_GETFL))?;
        check(libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK))?;
    }
    Ok(())
}
