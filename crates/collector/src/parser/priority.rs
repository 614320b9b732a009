//! Facility and severity names encoded in the `<PRI>` prefix.
//!
//! The appliance repeats the severity in its own `level` field, so these are
//! informational only and never persisted.

/// Syslog severity levels (RFC 5424 §6.2.1)
const SEVERITIES: [&str; 8] = [
    "emergency", "alert", "critical", "error",
    "warning", "notice", "info", "debug",
];

/// Syslog facility names (RFC 5424 §6.2.1)
const FACILITIES: [&str; 24] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news",
    "uucp", "cron", "authpriv", "ftp", "ntp", "audit", "alert2", "clock",
    "local0", "local1", "local2", "local3", "local4", "local5", "local6", "local7",
];

pub fn severity(priority: u32) -> Option<&'static str> {
    SEVERITIES.get((priority & 0x07) as usize).copied()
}

/// `None` for priorities beyond the 24 defined facilities.
pub fn facility(priority: u32) -> Option<&'static str> {
    FACILITIES.get((priority >> 3) as usize).copied()
}
