//! Device discovery
//!
//! Matching devices are found by scanning the kernel's input device
//! listing rather than probing `/dev/input` directly, because the
//! listing carries the display name needed for substring matching
//! without opening each node.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

pub const DEVICE_LISTING_PATH: &str = "/proc/bus/input/devices";

/// Read the kernel listing and return event-node paths for devices
/// whose display name contains `target_contains`, case-insensitively.
pub fn discover_target_paths(target_contains: &str) -> Vec<PathBuf> {
    let listing = match std::fs::read_to_string(DEVICE_LISTING_PATH) {
        Ok(text) => text,
        Err(err) => {
            debug!("Could not read {}: {}", DEVICE_LISTING_PATH, err);
            return Vec::new();
        }
    };
    find_event_paths(&listing, target_contains)
}

/// Parse a device listing into event-node paths for matching devices.
///
/// Each device is a block of lines separated by blank lines; the name
/// sits on an `N: Name="..."` line and the handlers on an
/// `H: Handlers=...` line. Paths are de-duplicated with order
/// preserved.
pub fn find_event_paths(listing: &str, target_contains: &str) -> Vec<PathBuf> {
    let needle = target_contains.to_lowercase();
    let mut paths = Vec::new();
    let mut seen = HashSet::new();

    for block in split_blocks(listing) {
        let Some(name) = block_name(&block) else {
            continue;
        };
        if !name.to_lowercase().contains(&needle) {
            continue;
        }
        for handler in block_handlers(&block) {
            if handler.starts_with("event") {
                let path = PathBuf::from(format!("/dev/input/{}", handler));
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }
    }
    paths
}

fn split_blocks(listing: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in listing.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn block_name(block: &[&str]) -> Option<String> {
    for line in block {
        let Some(rest) = line.strip_prefix("N:") else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix("Name=") else {
            continue;
        };
        let Some(quoted) = rest.strip_prefix('"') else {
            continue;
        };
        let end = quoted.find('"')?;
        return Some(quoted[..end].to_string());
    }
    None
}

fn block_handlers(block: &[&str]) -> Vec<String> {
    for line in block {
        if let Some(rest) = line.strip_prefix("H:") {
            if let Some(handlers) = rest.trim_start().strip_prefix("Handlers=") {
                return handlers.split_whitespace().map(str::to_string).collect();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
I: Bus=0005 Vendor=2b54 Product=1200 Version=0001
N: Name=\"Remoter ATV3 Consumer Control\"
P: Phys=aa:bb:cc:dd:ee:ff
H: Handlers=kbd event3
B: EV=1f

I: Bus=0005 Vendor=2b54 Product=1200 Version=0001
N: Name=\"Remoter ATV3 Keyboard\"
P: Phys=aa:bb:cc:dd:ee:ff
H: Handlers=sysrq kbd leds event4
B: EV=120013

I: Bus=0019 Vendor=0000 Product=0001 Version=0000
N: Name=\"Power Button\"
H: Handlers=kbd event0
B: EV=3
";

    #[test]
    fn finds_all_matching_event_nodes() {
        let paths = find_event_paths(LISTING, "Remoter ATV3");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/dev/input/event3"),
                PathBuf::from("/dev/input/event4"),
            ]
        );
    }

    #[test]
    fn match_is_case_insensitive() {
        let paths = find_event_paths(LISTING, "remoter atv3");
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn non_matching_target_finds_nothing() {
        assert!(find_event_paths(LISTING, "Some Other Remote").is_empty());
    }

    #[test]
    fn only_event_handlers_become_paths() {
        let paths = find_event_paths(LISTING, "Power Button");
        assert_eq!(paths, vec![PathBuf::from("/dev/input/event0")]);
    }

    #[test]
    fn duplicate_handlers_are_collapsed() {
        let doubled = format!("{}\n{}", LISTING, LISTING);
        let paths = find_event_paths(&doubled, "Power Button");
        assert_eq!(paths, vec![PathBuf::from("/dev/input/event0")]);
    }

    #[test]
    fn blocks_without_name_or_handlers_are_skipped() {
        let listing = "I: Bus=0003\nH: Handlers=event9\n\nN: Name=\"Remoter ATV3\"\nB: EV=3\n";
        assert!(find_event_paths(listing, "Remoter ATV3").is_empty());
    }
}
