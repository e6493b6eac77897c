// src/system/discovery.rs

//! Host probes backing the built-in candidate selectors.
//!
//! Every probe is infallible from the caller's point of view: a probe that
//! cannot read the system reports no values and logs why.

use lazy_static::lazy_static;
use regex::Regex;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddrV4, SocketAddrV6},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

lazy_static! {
    static ref EVDEV_NAME_RE: Regex =
        Regex::new(r"-event-[a-z]+$").expect("evdev pattern is a valid regex");
}

/// Whether `addr` is useful for a server socket to bind to.
pub fn is_server_address(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_link_local(),
        IpAddr::V6(v6) => !v6.is_loopback() && (v6.segments()[0] & 0xffc0) != 0xfe80,
    }
}

/// Interface addresses a server could bind to, followed by the IPv4 wildcard.
pub fn server_addresses() -> Vec<IpAddr> {
    let mut found: Vec<IpAddr> = Vec::new();

    match nix::ifaddrs::getifaddrs() {
        Ok(interfaces) => {
            for ifaddr in interfaces {
                let Some(storage) = ifaddr.address else {
                    continue;
                };
                let ip = if let Some(sin) = storage.as_sockaddr_in() {
                    IpAddr::V4(*SocketAddrV4::from(*sin).ip())
                } else if let Some(sin6) = storage.as_sockaddr_in6() {
                    IpAddr::V6(*SocketAddrV6::from(*sin6).ip())
                } else {
                    continue;
                };
                if is_server_address(&ip) && !found.contains(&ip) {
                    log::trace!("Interface '{}' offers {}", ifaddr.interface_name, ip);
                    found.push(ip);
                }
            }
        }
        Err(e) => log::warn!("Could not enumerate network interfaces: {}", e),
    }

    let wildcard = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    if !found.contains(&wildcard) {
        found.push(wildcard);
    }
    found
}

/// Entries of `dir` whose name ends in `-event-<letters>`, sorted by name.
/// A missing directory yields no devices.
pub fn evdev_devices(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::debug!("Input device directory '{}' does not exist.", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable input device entry: {}", err);
                None
            }
        })
        .filter(|e| EVDEV_NAME_RE.is_match(&e.file_name().to_string_lossy()))
        .map(|e| dir.join(e.file_name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::Ipv6Addr;

    #[test]
    fn test_is_server_address_filters_loopback_and_link_local() {
        assert!(!is_server_address(&IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(!is_server_address(&IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(!is_server_address(&"fe80::1".parse().unwrap()));
        assert!(!is_server_address(&"169.254.3.4".parse().unwrap()));
        assert!(is_server_address(&"192.168.1.20".parse().unwrap()));
        assert!(is_server_address(&"2001:db8::5".parse().unwrap()));
    }

    #[test]
    fn test_server_addresses_end_with_wildcard() {
        let addresses = server_addresses();
        assert_eq!(
            addresses.last(),
            Some(&IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        );
        assert!(addresses.iter().all(|a| a.is_unspecified() || is_server_address(a)));
    }

    #[test]
    fn test_evdev_devices_matches_event_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "usb-Logitech_Gamepad-event-joystick",
            "usb-Dell_Keyboard-event-kbd",
            "usb-Dell_Keyboard-if01-mouse",
            "usb-Foo-event-kbd2",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let devices = evdev_devices(dir.path());
        assert_eq!(
            devices,
            vec![
                dir.path().join("usb-Dell_Keyboard-event-kbd"),
                dir.path().join("usb-Logitech_Gamepad-event-joystick"),
            ]
        );
    }

    #[test]
    fn test_evdev_devices_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(evdev_devices(&dir.path().join("by-id")).is_empty());
    }
}
