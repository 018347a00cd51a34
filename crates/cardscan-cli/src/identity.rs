//! Device identity.
//!
//! Servers key every report on the device id. Unless one is configured,
//! the id is the hardware address of the first network interface that is
//! not the loopback.

use std::fs;
use std::path::Path;

use tracing::debug;

/// Id reported when no interface address can be found.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

const SYSFS_NET: &str = "/sys/class/net";

/// Resolve the id of this device.
pub fn resolve(configured: Option<&str>) -> String {
    if let Some(id) = configured.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    match interface_mac(Path::new(SYSFS_NET)) {
        Some(mac) => mac,
        None => {
            debug!("No interface address found");
            UNKNOWN_DEVICE_ID.to_string()
        }
    }
}

/// First usable hardware address below a sysfs `class/net` directory.
///
/// Interfaces are visited by name so the result is stable across boots.
fn interface_mac(root: &Path) -> Option<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    names.into_iter().find_map(|name| {
        let raw = fs::read_to_string(root.join(&name).join("address")).ok()?;
        normalize_mac(&raw)
    })
}

/// Uppercase a `aa:bb:cc:dd:ee:ff` address; `None` for the all-zero address
/// or anything malformed.
fn normalize_mac(raw: &str) -> Option<String> {
    let mac = raw.trim().to_ascii_uppercase();
    let octets: Vec<&str> = mac.split(':').collect();

    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if !well_formed || octets.iter().all(|o| *o == "00") {
        return None;
    }
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest]
    #[case("a4:cf:12:0b:9e:01\n", Some("A4:CF:12:0B:9E:01"))]
    #[case("A4:CF:12:0B:9E:01", Some("A4:CF:12:0B:9E:01"))]
    #[case("00:00:00:00:00:00\n", None)]
    #[case("", None)]
    #[case("a4:cf:12:0b:9e", None)]
    #[case("zz:cf:12:0b:9e:01", None)]
    fn test_normalize_mac(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_mac(raw).as_deref(), expected);
    }

    #[rstest]
    #[case(Some("table-1"), "table-1")]
    #[case(Some("  seat-4 "), "seat-4")]
    fn test_configured_id_wins(#[case] configured: Option<&str>, #[case] expected: &str) {
        assert_eq!(resolve(configured), expected);
    }

    fn fake_sysfs(name: &str, interfaces: &[(&str, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("cardscan-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        for (iface, address) in interfaces {
            let dir = root.join(iface);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("address"), address).unwrap();
        }
        root
    }

    #[test]
    fn test_skips_loopback_and_zero_addresses() {
        let root = fake_sysfs(
            "skip",
            &[
                ("lo", "00:00:00:00:00:00\n"),
                ("dummy0", "00:00:00:00:00:00\n"),
                ("wlan0", "b8:27:eb:12:34:56\n"),
                ("eth0", "dc:a6:32:aa:bb:cc\n"),
            ],
        );

        assert_eq!(interface_mac(&root).as_deref(), Some("DC:A6:32:AA:BB:CC"));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_no_interfaces() {
        let root = fake_sysfs("none", &[("lo", "00:00:00:00:00:00\n")]);
        assert_eq!(interface_mac(&root), None);
        fs::remove_dir_all(&root).unwrap();

        assert_eq!(interface_mac(Path::new("/nonexistent/net")), None);
    }
}
