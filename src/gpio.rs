//! Linux GPIO character device backend.
//!
//! Uses the v1 GPIO uAPI (`linux/gpio.h`) directly through `libc`:
//! each button is a line event request with both-edge detection, each lamp
//! is a single-line output handle. The blocking wait is one `poll(2)` over
//! the four event descriptors.
//!
//! ```text
//!  /dev/gpiochip0 ──GPIO_GET_LINEEVENT_IOCTL──▶ 4 event fds  ──poll/read──▶ ButtonLines
//!                 ──GPIO_GET_LINEHANDLE_IOCTL─▶ 4 handle fds ──SET_VALUES─▶ LampLines
//! ```
//!
//! Every descriptor is owned; dropping a bank closes its lines, so a
//! failure halfway through setup releases whatever was already acquired.

use crate::config::BoardConfig;
use crate::error::{CalcError, IoOp, LineRole, Result};
use crate::hal::{ButtonBank, Edge, LampBank, LINE_COUNT};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};

const GPIOHANDLES_MAX: usize = 64;
const LABEL_LEN: usize = 32;

const GPIOHANDLE_REQUEST_INPUT: u32 = 1 << 0;
const GPIOHANDLE_REQUEST_OUTPUT: u32 = 1 << 1;
const GPIOEVENT_REQUEST_BOTH_EDGES: u32 = (1 << 0) | (1 << 1);
const GPIOEVENT_EVENT_RISING_EDGE: u32 = 0x01;
const GPIOEVENT_EVENT_FALLING_EDGE: u32 = 0x02;

// _IOWR(0xB4, nr, struct)
const GPIO_GET_LINEHANDLE_IOCTL: u32 = 0xC16C_B403;
const GPIO_GET_LINEEVENT_IOCTL: u32 = 0xC030_B404;
const GPIOHANDLE_SET_LINE_VALUES_IOCTL: u32 = 0xC040_B409;

/// Size of `struct gpioevent_data` (u64 timestamp, u32 id, padding).
const EVENT_RECORD_LEN: usize = 16;

#[repr(C)]
struct GpioHandleRequest {
    line_offsets: [u32; GPIOHANDLES_MAX],
    flags: u32,
    default_values: [u8; GPIOHANDLES_MAX],
    consumer_label: [u8; LABEL_LEN],
    lines: u32,
    fd: libc::c_int,
}

#[repr(C)]
struct GpioEventRequest {
    line_offset: u32,
    handle_flags: u32,
    event_flags: u32,
    consumer_label: [u8; LABEL_LEN],
    fd: libc::c_int,
}

#[repr(C)]
struct GpioHandleData {
    values: [u8; GPIOHANDLES_MAX],
}

fn label(consumer: &str) -> [u8; LABEL_LEN] {
    let mut out = [0u8; LABEL_LEN];
    // keep the trailing NUL
    let len = consumer.len().min(LABEL_LEN - 1);
    out[..len].copy_from_slice(&consumer.as_bytes()[..len]);
    out
}

fn ioctl<T>(fd: libc::c_int, request: u32, arg: &mut T) -> io::Result<()> {
    // SAFETY: `arg` is a live, correctly laid out #[repr(C)] struct for `request`.
    let rc = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn adopt_fd(fd: libc::c_int) -> File {
    // SAFETY: the kernel just handed us this descriptor and nothing else owns it.
    File::from(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// An open GPIO chip device.
#[derive(Debug)]
pub struct GpioChip {
    file: File,
}

impl GpioChip {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::options()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| CalcError::Chip {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(chip = %path.display(), "opened gpio chip");
        Ok(Self { file })
    }

    fn request_events(&self, offset: u32, consumer: &str) -> io::Result<File> {
        let mut req = GpioEventRequest {
            line_offset: offset,
            handle_flags: GPIOHANDLE_REQUEST_INPUT,
            event_flags: GPIOEVENT_REQUEST_BOTH_EDGES,
            consumer_label: label(consumer),
            fd: -1,
        };
        ioctl(self.file.as_raw_fd(), GPIO_GET_LINEEVENT_IOCTL, &mut req)?;
        Ok(adopt_fd(req.fd))
    }

    fn request_output(&self, offset: u32, consumer: &str) -> io::Result<File> {
        let mut req = GpioHandleRequest {
            line_offsets: [0; GPIOHANDLES_MAX],
            flags: GPIOHANDLE_REQUEST_OUTPUT,
            default_values: [0; GPIOHANDLES_MAX],
            consumer_label: label(consumer),
            lines: 1,
            fd: -1,
        };
        req.line_offsets[0] = offset;
        ioctl(self.file.as_raw_fd(), GPIO_GET_LINEHANDLE_IOCTL, &mut req)?;
        Ok(adopt_fd(req.fd))
    }
}

/// Four buttons configured for both-edge events.
#[derive(Debug)]
pub struct ButtonLines {
    lines: Vec<File>,
    offsets: [u32; LINE_COUNT],
}

impl ButtonLines {
    pub fn request(chip: &GpioChip, offsets: [u32; LINE_COUNT], consumer: &str) -> Result<Self> {
        let mut lines = Vec::with_capacity(LINE_COUNT);
        for (index, &offset) in offsets.iter().enumerate() {
            // on error `lines` drops here, closing the buttons opened so far
            let line = chip
                .request_events(offset, consumer)
                .map_err(|e| CalcError::setup(LineRole::Button, index, offset, e))?;
            tracing::debug!(button = index, pin = offset, "button line ready");
            lines.push(line);
        }
        tracing::info!(?offsets, "buttons initialized");
        Ok(Self { lines, offsets })
    }

    pub fn offsets(&self) -> [u32; LINE_COUNT] {
        self.offsets
    }
}

impl ButtonBank for ButtonLines {
    fn wait_ready(&mut self) -> Result<[bool; LINE_COUNT]> {
        let mut fds = [libc::pollfd {
            fd: -1,
            events: 0,
            revents: 0,
        }; LINE_COUNT];
        for (pfd, line) in fds.iter_mut().zip(&self.lines) {
            pfd.fd = line.as_raw_fd();
            pfd.events = libc::POLLIN | libc::POLLPRI;
        }

        // SAFETY: `fds` is a valid array of LINE_COUNT pollfd entries.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), LINE_COUNT as libc::nfds_t, -1) };
        if rc < 0 {
            return Err(CalcError::io(IoOp::Poll, None, io::Error::last_os_error()));
        }

        let mut ready = [false; LINE_COUNT];
        for (line, (flag, pfd)) in ready.iter_mut().zip(&fds).enumerate() {
            // a dead line keeps poll returning at once; treat it as fatal
            if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                return Err(CalcError::io(
                    IoOp::Poll,
                    Some(line),
                    io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        format!("line reported poll revents {:#x}", pfd.revents),
                    ),
                ));
            }
            *flag = pfd.revents & (libc::POLLIN | libc::POLLPRI) != 0;
        }
        Ok(ready)
    }

    fn read_edge(&mut self, line: usize) -> Result<Edge> {
        let file = self.lines.get_mut(line).ok_or_else(|| {
            CalcError::invariant(format!("button line {line} does not exist"))
        })?;
        let mut record = [0u8; EVENT_RECORD_LEN];
        file.read_exact(&mut record)
            .map_err(|e| CalcError::io(IoOp::ReadEdge, Some(line), e))?;

        let id = u32::from_ne_bytes([record[8], record[9], record[10], record[11]]);
        match id {
            GPIOEVENT_EVENT_RISING_EDGE => Ok(Edge::Rising),
            GPIOEVENT_EVENT_FALLING_EDGE => Ok(Edge::Falling),
            other => Err(CalcError::io(
                IoOp::ReadEdge,
                Some(line),
                io::Error::new(io::ErrorKind::InvalidData, format!("unknown event id {other}")),
            )),
        }
    }
}

impl Drop for ButtonLines {
    fn drop(&mut self) {
        tracing::info!(count = self.lines.len(), "releasing buttons");
    }
}

/// Four single-line output handles, initially low.
#[derive(Debug)]
pub struct LampLines {
    lines: Vec<File>,
    offsets: [u32; LINE_COUNT],
}

impl LampLines {
    pub fn request(chip: &GpioChip, offsets: [u32; LINE_COUNT], consumer: &str) -> Result<Self> {
        let mut lines = Vec::with_capacity(LINE_COUNT);
        for (index, &offset) in offsets.iter().enumerate() {
            let line = chip
                .request_output(offset, consumer)
                .map_err(|e| CalcError::setup(LineRole::Lamp, index, offset, e))?;
            tracing::debug!(lamp = index, pin = offset, "lamp line ready");
            lines.push(line);
        }
        tracing::info!(?offsets, "lamps initialized");
        Ok(Self { lines, offsets })
    }

    pub fn offsets(&self) -> [u32; LINE_COUNT] {
        self.offsets
    }
}

impl LampBank for LampLines {
    fn write_level(&mut self, lamp: usize, on: bool) -> Result<()> {
        let file = self.lines.get(lamp).ok_or_else(|| {
            CalcError::invariant(format!("lamp line {lamp} does not exist"))
        })?;
        let mut data = GpioHandleData {
            values: [0; GPIOHANDLES_MAX],
        };
        data.values[0] = u8::from(on);
        ioctl(file.as_raw_fd(), GPIOHANDLE_SET_LINE_VALUES_IOCTL, &mut data)
            .map_err(|e| CalcError::io(IoOp::WriteLevel, Some(lamp), e))
    }
}

impl Drop for LampLines {
    fn drop(&mut self) {
        tracing::info!(count = self.lines.len(), "releasing lamps");
    }
}

/// Both banks acquired from one chip.
///
/// Declared buttons-first so a dropped board releases inputs, then outputs.
#[derive(Debug)]
pub struct Board {
    pub buttons: ButtonLines,
    pub lamps: LampLines,
}

impl Board {
    pub fn open(config: &BoardConfig) -> Result<Self> {
        let chip = GpioChip::open(&config.chip)?;
        let buttons = ButtonLines::request(&chip, config.buttons, &config.consumer)?;
        // a lamp failure drops `buttons` on the way out
        let lamps = LampLines::request(&chip, config.lamps, &config.consumer)?;
        Ok(Self { buttons, lamps })
    }

    pub fn into_parts(self) -> (ButtonLines, LampLines) {
        (self.buttons, self.lamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uapi_struct_sizes_match_ioctl_numbers() {
        let size_of = |req: u32| ((req >> 16) & 0x3FFF) as usize;
        assert_eq!(std::mem::size_of::<GpioHandleRequest>(), size_of(GPIO_GET_LINEHANDLE_IOCTL));
        assert_eq!(std::mem::size_of::<GpioEventRequest>(), size_of(GPIO_GET_LINEEVENT_IOCTL));
        assert_eq!(
            std::mem::size_of::<GpioHandleData>(),
            size_of(GPIOHANDLE_SET_LINE_VALUES_IOCTL)
        );
    }

    #[test]
    fn label_is_nul_terminated_and_truncated() {
        let long = "x".repeat(40);
        let out = label(&long);
        assert_eq!(out[LABEL_LEN - 1], 0);
        assert_eq!(&label("bitlamp")[..8], b"bitlamp\0");
    }

    #[test]
    fn missing_chip_is_a_setup_error() {
        let err = GpioChip::open("/nonexistent/gpiochip9").unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("/nonexistent/gpiochip9"));
    }

    #[test]
    fn board_open_fails_cleanly_without_hardware() {
        let config = BoardConfig {
            chip: PathBuf::from("/nonexistent/gpiochip9"),
            ..BoardConfig::default()
        };
        assert!(Board::open(&config).unwrap_err().is_setup());
    }

    #[test]
    fn hung_up_line_fails_the_wait() {
        let mut lines = Vec::with_capacity(LINE_COUNT);
        for _ in 0..LINE_COUNT {
            let mut fds = [0 as libc::c_int; 2];
            // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
            assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
            // closing the writer makes the reader report POLLHUP
            drop(adopt_fd(fds[1]));
            lines.push(adopt_fd(fds[0]));
        }
        let mut buttons = ButtonLines {
            lines,
            offsets: [0, 1, 2, 3],
        };

        let err = buttons.wait_ready().unwrap_err();
        assert!(matches!(
            err,
            CalcError::Io {
                op: IoOp::Poll,
                line: Some(0),
                ..
            }
        ));
    }
}
