//! Inbound commands to the application service.
//!
//! A queued frame body is tokenized once into a [`Command`], which the
//! [`PowerBox`](super::service::PowerBox) matches exhaustively.  A frame
//! splits into at most three `:`-separated tokens; the third keeps any
//! further separators, so `K` can carry both duty bounds in it while other
//! commands only look at its first field.

use crate::board::{PORT_COUNT, TOKEN_SEPARATOR};
use crate::error::ProtocolError;
use crate::power::PwmMode;
use crate::storage::names::PortName;

/// Granularity of the `R` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Port names only.
    Names,
    /// Config and port state only.
    Config,
    /// Both.
    All,
}

/// Commands the host can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `P`: liveness check.
    Ping,
    /// `D`: name, version and board signature.
    Discover,
    /// `S`: full status.
    Status,
    /// `O:<port>`: switch on.
    PortOn(usize),
    /// `F:<port>`: switch off.
    PortOff(usize),
    /// `W:<port>:<level>`: variable PWM duty.
    SetPwmLevel { port: usize, level: u8 },
    /// `C:<port>:<mode>`: PWM mode.
    SetPwmMode { port: usize, mode: PwmMode },
    /// `G:<port>`: query PWM mode.
    GetPwmMode(usize),
    /// `M:<port>:<name>`: rename.
    SetName { port: usize, name: PortName },
    /// `N:<port>`: query name.
    GetName(usize),
    /// `T`: accepted for older hosts, does nothing.
    LegacyTemperature,
    /// `H:<port>`: turn-on margin in whole degrees, for older hosts.
    LegacyDewMargin(usize),
    /// `K:<on_deg>[:<min%>[:<max%>]]`: dew tuning.
    DewTuning {
        on_margin_deg: u8,
        duty_min_pct: Option<u8>,
        duty_max_pct: Option<u8>,
    },
    /// `R:<NAMES|CONF|ALL>`: factory reset.
    Reset(ResetScope),
    /// `X:<temp_deg>:<humid_pct>` sets, `X:` clears the probe override.
    /// Values are carried in centi-units.
    DebugOverride(Option<(i32, i32)>),
}

/// Largest accepted dew turn-on margin in whole degrees.
const MAX_ON_MARGIN_DEG: i16 = 5;

impl Command {
    /// Tokenize and validate one frame body.
    pub fn parse(frame: &[u8]) -> Result<Self, ProtocolError> {
        let text = core::str::from_utf8(frame).map_err(|_| ProtocolError::UnknownCommand)?;
        let mut tokens = text.splitn(3, TOKEN_SEPARATOR);
        let head = tokens.next().unwrap_or("");
        let arg1 = tokens.next();
        let arg2 = tokens.next();

        let letter = head.bytes().next().ok_or(ProtocolError::Empty)?;
        let cmd = match letter {
            b'P' => Self::Ping,
            b'D' => Self::Discover,
            b'S' => Self::Status,
            b'T' => Self::LegacyTemperature,
            b'O' => Self::PortOn(parse_port(arg1)?),
            b'F' => Self::PortOff(parse_port(arg1)?),
            b'G' => Self::GetPwmMode(parse_port(arg1)?),
            b'N' => Self::GetName(parse_port(arg1)?),
            b'H' => Self::LegacyDewMargin(parse_port(arg1)?),
            b'W' => Self::SetPwmLevel {
                port: parse_port(arg1)?,
                level: parse_u8(first_field(required(arg2)?))?,
            },
            b'C' => {
                let port = parse_port(arg1)?;
                let raw = parse_u8(first_field(required(arg2)?))?;
                let mode = PwmMode::from_u8(raw).ok_or(ProtocolError::InvalidMode)?;
                Self::SetPwmMode { port, mode }
            }
            b'M' => {
                let port = parse_port(arg1)?;
                let text = first_field(required(arg2)?);
                if text.is_empty() {
                    return Err(ProtocolError::MissingArgument);
                }
                let mut name = PortName::new();
                for c in text.chars() {
                    if name.push(c).is_err() {
                        break;
                    }
                }
                Self::SetName { port, name }
            }
            b'K' => {
                let on = parse_i16(required(arg1)?)?;
                if !(0..=MAX_ON_MARGIN_DEG).contains(&on) {
                    return Err(ProtocolError::OutOfRange);
                }
                let mut bounds = arg2.map(|rest| rest.splitn(2, TOKEN_SEPARATOR));
                let mut next_bound = || bounds.as_mut().and_then(|it| it.next());
                let duty_min_pct = next_bound().map(parse_percent).transpose()?;
                let duty_max_pct = next_bound().map(parse_percent).transpose()?;
                Self::DewTuning {
                    on_margin_deg: on as u8,
                    duty_min_pct,
                    duty_max_pct,
                }
            }
            b'R' => Self::Reset(match required(arg1)? {
                "NAMES" => ResetScope::Names,
                "CONF" => ResetScope::Config,
                "ALL" => ResetScope::All,
                _ => return Err(ProtocolError::InvalidScope),
            }),
            b'X' => match (arg1, arg2) {
                (Some(""), None) => Self::DebugOverride(None),
                (Some(t), Some(h)) => {
                    let t = parse_i16(t)?;
                    let h = parse_i16(first_field(h))?;
                    if !(0..=100).contains(&h) {
                        return Err(ProtocolError::OutOfRange);
                    }
                    Self::DebugOverride(Some((i32::from(t) * 100, i32::from(h) * 100)))
                }
                _ => return Err(ProtocolError::MissingArgument),
            },
            _ => return Err(ProtocolError::UnknownCommand),
        };
        Ok(cmd)
    }
}

/// Text of `token` up to the next separator.
fn first_field(token: &str) -> &str {
    token.split(TOKEN_SEPARATOR).next().unwrap_or(token)
}

fn required(token: Option<&str>) -> Result<&str, ProtocolError> {
    token.ok_or(ProtocolError::MissingArgument)
}

fn parse_port(token: Option<&str>) -> Result<usize, ProtocolError> {
    let port = usize::from(parse_u8(required(token)?)?);
    if port >= PORT_COUNT {
        return Err(ProtocolError::OutOfRange);
    }
    Ok(port)
}

fn parse_u8(token: &str) -> Result<u8, ProtocolError> {
    let value: u16 = token.parse().map_err(|_| ProtocolError::InvalidNumber)?;
    u8::try_from(value).map_err(|_| ProtocolError::OutOfRange)
}

fn parse_i16(token: &str) -> Result<i16, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::InvalidNumber)
}

fn parse_percent(token: &str) -> Result<u8, ProtocolError> {
    let pct = parse_u8(token)?;
    if pct > 100 {
        return Err(ProtocolError::OutOfRange);
    }
    Ok(pct)
}
