// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Logging utilities for sensitive data anonymization.

use std::net::IpAddr;

/// Anonymize a caller key for logging.
/// IPv4 loses its last octet ("203.0.113.***"), IPv6 keeps only its first three
/// groups. Anything that is not an address is redacted, except the shared
/// "unknown" bucket.
pub fn anonymize_ip(key: &str) -> String {
    match key.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.***")
        }
        Ok(IpAddr::V6(v6)) => {
            let segments = v6.segments();
            format!("{:x}:{:x}:{:x}:***", segments[0], segments[1], segments[2])
        }
        Err(_) if key == "unknown" => key.to_string(),
        Err(_) => "***".to_string(),
    }
}
