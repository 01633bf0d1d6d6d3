//! Domain-specific scalar formats: ports, schedules, network ranges, platforms.

use super::{ValidationError, ValidationErrors};
use crate::fieldpath::Path;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const SCHEDULE_PRESETS: &[&str] = &[
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

static CRON_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z*?/,#-]+$").expect("cron field pattern is valid")
});

static RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rate\(\s*[1-9][0-9]*\s+(minute|minutes|hour|hours|day|days)\s*\)$")
        .expect("rate pattern is valid")
});

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
    Tls,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tls => write!(f, "tls"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "tls" => Ok(Protocol::Tls),
            other => Err(format!("unknown protocol \"{}\"", other)),
        }
    }
}

/// Parses `80` or `80/tcp`. A bare port is TCP.
pub fn parse_port(s: &str) -> Result<(u16, Protocol), String> {
    let (port, protocol) = match s.split_once('/') {
        Some((port, protocol)) => (port, protocol.parse::<Protocol>()?),
        None => (s, Protocol::Tcp),
    };
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("\"{}\" is not a port between 1 and 65535", port)),
        Ok(n) => Ok((n, protocol)),
    }
}

/// Checks a port mapping string and returns its parts when well formed.
pub fn port(path: &Path, s: &str, errors: &mut ValidationErrors) -> Option<(u16, Protocol)> {
    match parse_port(s) {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.add(
                ValidationError::invalid_format(path.clone(), message)
                    .with_hint("use \"<port>\" or \"<port>/<tcp|udp|tls>\""),
            );
            None
        }
    }
}

/// Returns true for schedule presets, `@every <duration>`, `none`,
/// `rate(N unit)` and five-field cron expressions.
pub fn is_valid_schedule(s: &str) -> bool {
    let s = s.trim();
    if s == "none" || SCHEDULE_PRESETS.contains(&s) {
        return true;
    }
    if let Some(every) = s.strip_prefix("@every ") {
        return humantime::parse_duration(every.trim()).is_ok_and(|d| !d.is_zero());
    }
    if RATE.is_match(s) {
        return true;
    }
    let fields: Vec<&str> = s.split_whitespace().collect();
    fields.len() == 5 && fields.iter().all(|f| CRON_FIELD.is_match(f))
}

/// Checks a schedule expression.
pub fn schedule(path: &Path, s: &str, errors: &mut ValidationErrors) {
    if !is_valid_schedule(s) {
        errors.add(
            ValidationError::invalid_format(path.clone(), format!("schedule \"{}\" is invalid", s))
                .with_hint("use a cron expression like \"0 9 * * 1\", a preset like \"@daily\", or \"@every 30m\""),
        );
    }
}

/// An IPv4 network range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    /// Returns true if `other` lies entirely inside this range.
    pub fn contains(&self, other: &Cidr) -> bool {
        other.prefix >= self.prefix
            && (u32::from(other.addr) & self.mask()) == (u32::from(self.addr) & self.mask())
    }

    /// Returns true if the two ranges share any address.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl FromStr for Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("\"{}\" is missing a prefix length", s))?;
        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| format!("\"{}\" is not an IPv4 address", addr))?;
        let prefix = prefix
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| format!("\"{}\" is not a prefix length between 0 and 32", prefix))?;
        Ok(Cidr { addr, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// Checks a network range and returns it when well formed.
pub fn cidr(path: &Path, s: &str, errors: &mut ValidationErrors) -> Option<Cidr> {
    match s.parse::<Cidr>() {
        Ok(c) => Some(c),
        Err(message) => {
            errors.add(
                ValidationError::invalid_format(path.clone(), message)
                    .with_hint("use CIDR notation such as \"10.0.0.0/16\""),
            );
            None
        }
    }
}

/// Checks a value against a fixed set of accepted spellings.
pub fn one_of(path: &Path, value: &str, accepted: &[&str], errors: &mut ValidationErrors) {
    if !accepted.contains(&value) {
        let quoted: Vec<String> = accepted.iter().map(|a| format!("\"{}\"", a)).collect();
        errors.add(ValidationError::invalid_format(
            path.clone(),
            format!("\"{}\" must be one of {}", value, quoted.join(", ")),
        ));
    }
}

/// Checks an `os/arch` platform string.
pub fn platform(path: &Path, s: &str, errors: &mut ValidationErrors) {
    const OSES: &[&str] = &["linux", "windows_server_2019_core", "windows_server_2019_full"];
    const ARCHES: &[&str] = &["amd64", "x86_64", "arm", "arm64"];
    let valid = s
        .split_once('/')
        .is_some_and(|(os, arch)| OSES.contains(&os) && ARCHES.contains(&arch));
    if !valid {
        errors.add(
            ValidationError::invalid_format(path.clone(), format!("platform \"{}\" is invalid", s))
                .with_hint("use \"<os>/<arch>\", for example \"linux/arm64\""),
        );
    }
}
