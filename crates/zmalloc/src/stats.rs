use std::fmt;

use crate::backend::Backend;

/// Point-in-time view of a tracker, for operational tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Stats {
    /// Backend supplying the memory.
    pub lib: Backend,
    /// Whether the backend reports usable sizes (no size headers).
    pub malloc_size: bool,
    /// Header bytes in front of every payload, 0 with `malloc_size`.
    pub prefix_size: usize,
    /// Word-rounded bytes currently outstanding.
    pub used_memory: usize,
}

impl Stats {
    /// Emits the snapshot as a structured `tracing` event.
    #[cfg(feature = "tracing")]
    pub fn log(&self) {
        tracing::info!(
            lib = self.lib.name(),
            malloc_size = self.malloc_size,
            prefix_size = self.prefix_size,
            used_memory = self.used_memory,
            "zmalloc stats"
        );
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lib={} malloc_size={} prefix_size={} used_memory={}",
            self.lib,
            self.malloc_size,
            self.prefix_size,
            format_bytes(self.used_memory)
        )
    }
}

/// Renders a byte count with a binary unit, e.g. `1.5 KB`.
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(56), "56 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_display() {
        let stats = Stats {
            lib: Backend::Libc,
            malloc_size: false,
            prefix_size: 8,
            used_memory: 2048,
        };
        assert_eq!(
            stats.to_string(),
            "lib=libc malloc_size=false prefix_size=8 used_memory=2.0 KB"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let stats = Stats {
            lib: Backend::Jemalloc,
            malloc_size: true,
            prefix_size: 0,
            used_memory: 64,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "lib": "jemalloc",
                "malloc_size": true,
                "prefix_size": 0,
                "used_memory": 64
            })
        );
    }
}
