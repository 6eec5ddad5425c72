//! Device specifications
//!
//! Parses `"<kind>:<bus>:<device>"` / `"<kind>"` strings into a validated
//! [`DeviceSpec`] and opens the matching [`Transport`]. Known kinds live in a
//! static table so the accepted grammar is visible in one place.

use crate::display::device_id;
use crate::transport::{LinuxI2c, TRACE_NAME, Transport, TransportError, linux_name};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Unknown device kind: {0}")]
    UnknownKind(String),

    #[error("Invalid device specification '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Failed to open device: {0}")]
    Open(#[from] TransportError),
}

/// Transport kinds accepted in a device specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Linux,
    Trace,
}

struct KindEntry {
    token: &'static str,
    kind: DeviceKind,
    /// Number of `:`-separated hex arguments after the kind
    arity: usize,
}

const KINDS: &[KindEntry] = &[
    KindEntry {
        token: "linux",
        kind: DeviceKind::Linux,
        arity: 2,
    },
    KindEntry {
        token: "trace",
        kind: DeviceKind::Trace,
        arity: 0,
    },
];

impl DeviceKind {
    /// Kind token as written in a specification
    pub fn token(&self) -> &'static str {
        KINDS
            .iter()
            .find(|e| e.kind == *self)
            .map(|e| e.token)
            .unwrap_or("unknown")
    }

    /// All known kind tokens
    pub fn tokens() -> Vec<&'static str> {
        KINDS.iter().map(|e| e.token).collect()
    }
}

/// A validated display location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    /// `/dev/i2c-<bus>`, 7-bit address `device`
    Linux { bus: u32, device: u8 },
    /// Discarding transport
    Trace,
}

impl DeviceSpec {
    /// Parse a specification such as `linux:1:3c` or `trace`
    pub fn parse(spec: &str) -> Result<Self, DeviceError> {
        let invalid = |reason: String| DeviceError::InvalidSpec {
            spec: spec.to_string(),
            reason,
        };

        let mut parts = spec.trim().split(':');
        let token = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let entry = KINDS
            .iter()
            .find(|e| e.token.eq_ignore_ascii_case(token))
            .ok_or_else(|| {
                DeviceError::UnknownKind(format!(
                    "{} (known: {})",
                    token,
                    DeviceKind::tokens().join(", ")
                ))
            })?;

        if args.len() != entry.arity {
            return Err(invalid(format!(
                "'{}' takes {} argument(s), got {}",
                entry.token,
                entry.arity,
                args.len()
            )));
        }

        match entry.kind {
            DeviceKind::Trace => Ok(DeviceSpec::Trace),
            DeviceKind::Linux => {
                let bus = u32::from_str_radix(args[0], 16)
                    .map_err(|e| invalid(format!("bus '{}': {}", args[0], e)))?;
                let device = u8::from_str_radix(args[1], 16)
                    .map_err(|e| invalid(format!("device '{}': {}", args[1], e)))?;
                if device > 0x7F {
                    return Err(invalid(format!(
                        "device 0x{:02x} is not a 7-bit address",
                        device
                    )));
                }
                Ok(DeviceSpec::Linux { bus, device })
            }
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceSpec::Linux { .. } => DeviceKind::Linux,
            DeviceSpec::Trace => DeviceKind::Trace,
        }
    }

    /// Name the driver will report once opened
    pub fn name(&self) -> String {
        match self {
            DeviceSpec::Linux { bus, device } => linux_name(*bus, *device),
            DeviceSpec::Trace => TRACE_NAME.to_string(),
        }
    }

    /// Id the driver will report once opened
    pub fn id(&self) -> String {
        device_id(&self.name())
    }

    /// Open the transport described by this specification
    pub fn open(&self) -> Result<Transport, DeviceError> {
        match *self {
            DeviceSpec::Linux { bus, device } => Ok(Transport::Linux(LinuxI2c::open(bus, device)?)),
            DeviceSpec::Trace => Ok(Transport::Trace),
        }
    }
}

impl FromStr for DeviceSpec {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Linux { bus, device } => {
                write!(f, "{}:{:x}:{:x}", self.kind().token(), bus, device)
            }
            DeviceSpec::Trace => f.write_str(self.kind().token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux() {
        assert_eq!(
            DeviceSpec::parse("linux:1:3c").unwrap(),
            DeviceSpec::Linux { bus: 1, device: 0x3c }
        );
        // Bus is hexadecimal too
        assert_eq!(
            DeviceSpec::parse("LINUX:a:3D").unwrap(),
            DeviceSpec::Linux { bus: 10, device: 0x3d }
        );
    }

    #[test]
    fn test_parse_trace() {
        assert_eq!(DeviceSpec::parse("trace").unwrap(), DeviceSpec::Trace);
        assert_eq!("trace".parse::<DeviceSpec>().unwrap(), DeviceSpec::Trace);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DeviceSpec::parse("spi:0:0"),
            Err(DeviceError::UnknownKind(_))
        ));
        assert!(matches!(
            DeviceSpec::parse("linux:1"),
            Err(DeviceError::InvalidSpec { .. })
        ));
        assert!(matches!(
            DeviceSpec::parse("trace:1:2"),
            Err(DeviceError::InvalidSpec { .. })
        ));
        assert!(matches!(
            DeviceSpec::parse("linux:zz:3c"),
            Err(DeviceError::InvalidSpec { .. })
        ));
        assert!(matches!(
            DeviceSpec::parse("linux:1:80"),
            Err(DeviceError::InvalidSpec { .. })
        ));
        assert!(matches!(DeviceSpec::parse(""), Err(DeviceError::UnknownKind(_))));
    }

    #[test]
    fn test_names_and_ids() {
        let a = DeviceSpec::Linux { bus: 1, device: 0x3c };
        let b = DeviceSpec::Linux { bus: 1, device: 0x3d };
        assert_eq!(a.name(), "linux:bus_1:dev_3c");
        assert_eq!(DeviceSpec::Trace.name(), "trace");
        assert_eq!(a.id(), DeviceSpec::parse("linux:1:3c").unwrap().id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["linux:1:3c", "linux:a:3d", "trace"] {
            let parsed = DeviceSpec::parse(spec).unwrap();
            assert_eq!(parsed.to_string(), spec);
        }
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(DeviceKind::Linux.token(), "linux");
        assert_eq!(DeviceKind::tokens(), vec!["linux", "trace"]);
        let err = DeviceSpec::parse("spi:0:0").unwrap_err();
        assert!(err.to_string().contains("known: linux, trace"));
        assert_eq!(DeviceSpec::Trace.kind(), DeviceKind::Trace);
    }

    #[test]
    fn test_open_trace() {
        let transport = DeviceSpec::Trace.open().unwrap();
        assert!(matches!(transport, Transport::Trace));
    }
}
