//! Response formatting.
//!
//! Every response is one `>...#` frame built in a fixed-capacity string.
//! Milli-unit measurements are rounded half away from zero to centi-units
//! and printed with two decimals; centi-unit readings print directly.

use core::fmt::{self, Write};

use heapless::String;

use crate::board::{FRAME_END, FRAME_START, PORT_COUNT, PROGRAM_NAME, PROGRAM_VERSION};
use crate::power::{PortRegistry, PwmMode};
use crate::sensors::ProbeAggregator;

/// Longest response (a full status frame with every optional field).
pub const RESPONSE_CAPACITY: usize = 256;

/// One complete response frame.
pub type Response = String<RESPONSE_CAPACITY>;

/// `value` (centi-units) as `[-]I.FF`.
pub struct Centi(pub i32);

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// `value` (milli-units) rounded to centi-units, as `[-]I.FF`.
pub struct Milli(pub i32);

impl fmt::Display for Milli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let centi = if self.0 >= 0 {
            (i64::from(self.0) + 5) / 10
        } else {
            (i64::from(self.0) - 5) / 10
        };
        Centi(centi as i32).fmt(f)
    }
}

fn frame(body: fmt::Arguments<'_>) -> Response {
    let mut out = Response::new();
    // Bodies are bounded well below the capacity.
    let _ = write!(
        out,
        "{}{body}{}",
        char::from(FRAME_START),
        char::from(FRAME_END)
    );
    out
}

/// `>TAG#`
pub fn ok(tag: &str) -> Response {
    frame(format_args!("{tag}"))
}

/// `>ERR#`
pub fn err() -> Response {
    ok("ERR")
}

/// `>D:<name>:<version>:<signature>#`
pub fn discovery(signature: &str) -> Response {
    frame(format_args!("D:{PROGRAM_NAME}:{PROGRAM_VERSION}:{signature}"))
}

/// `>G:<NN>:<mode>#`
pub fn pwm_mode(port: usize, mode: PwmMode) -> Response {
    frame(format_args!("G:{port:02}:{}", mode as u8))
}

/// `>H:<NN>:<whole degrees>#`
pub fn dew_margin(port: usize, on_margin_centi: i16) -> Response {
    frame(format_args!("H:{port:02}:{}", on_margin_centi / 100))
}

/// `>N:<NN>:<name>#`
pub fn name(port: usize, name: &str) -> Response {
    frame(format_args!("N:{port:02}:{name}"))
}

/// `>S:<status>...:<mA>...:<input mA>:<input mV>[:<T>:<RH>:<DP>[:<hPa>]]#`
pub fn status(registry: &PortRegistry, probe: &ProbeAggregator) -> Response {
    frame(format_args!("{}", StatusBody { registry, probe }))
}

struct StatusBody<'a> {
    registry: &'a PortRegistry,
    probe: &'a ProbeAggregator,
}

impl fmt::Display for StatusBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("S")?;
        for port in 0..PORT_COUNT {
            write!(f, ":{}", self.registry.status_value(port))?;
        }
        let m = self.registry.measurements();
        for port in 0..PORT_COUNT {
            write!(f, ":{}", Milli(m.port_ma(port)))?;
        }
        write!(f, ":{}:{}", Milli(m.input_ma()), Milli(m.input_mv()))?;
        if self.probe.have_ambient() {
            write!(
                f,
                ":{}:{}:{}",
                Centi(self.probe.temperature_centi()),
                Centi(self.probe.humidity_centi()),
                Centi(self.probe.dewpoint_centi())
            )?;
            if self.probe.have_pressure() {
                write!(f, ":{}", self.probe.pressure_hpa())?;
            }
        }
        Ok(())
    }
}
