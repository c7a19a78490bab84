//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of sizes and durations,
//! and for parsing shard-size strings like "64MB".

use std::time::Duration;

/// Format bytes into human-readable size with appropriate units
///
/// # Examples
/// ```
/// use tici_bench::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// assert_eq!(format_bytes(1073741824), "1.0 GiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Parse human-readable size string into bytes
///
/// Supports units: B, KB, MB, GB, TB, KiB, MiB, GiB, TiB. Shard sizes in
/// cluster configs use the decimal forms ("16MB", "64MB").
///
/// # Examples
/// ```
/// use tici_bench::util::units::parse_bytes;
///
/// assert_eq!(parse_bytes("1 KiB").unwrap(), 1024);
/// assert_eq!(parse_bytes("16MB").unwrap(), 16000000);
/// assert_eq!(parse_bytes("2 GB").unwrap(), 2000000000);
/// ```
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    let input = input.trim();

    // Find the last space or digit-letter boundary
    let (number_part, unit_part) = if let Some(space_pos) = input.rfind(' ') {
        (&input[..space_pos], &input[space_pos + 1..])
    } else {
        // Find where digits end and letters begin
        let mut split_pos = input.len();
        for (i, c) in input.char_indices() {
            if c.is_alphabetic() {
                split_pos = i;
                break;
            }
        }
        (&input[..split_pos], &input[split_pos..])
    };

    let number: f64 = number_part
        .parse()
        .map_err(|_| format!("Invalid number: {}", number_part))?;

    if number < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier = match unit_part.to_uppercase().as_str() {
        "" | "B" => 1u64,
        "KB" => 1_000u64,
        "MB" => 1_000_000u64,
        "GB" => 1_000_000_000u64,
        "TB" => 1_000_000_000_000u64,
        "KIB" => 1_024u64,
        "MIB" => 1_048_576u64,
        "GIB" => 1_073_741_824u64,
        "TIB" => 1_099_511_627_776u64,
        _ => return Err(format!("Unknown unit: {}", unit_part)),
    };

    Ok((number * multiplier as f64) as u64)
}

/// Format duration into human-readable string
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use tici_bench::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

/// Calculate throughput in MB/s from bytes and duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use tici_bench::util::units::calculate_throughput_mbps;
///
/// let throughput = calculate_throughput_mbps(1048576, Duration::from_secs(1));
/// assert!((throughput - 1.0).abs() < 0.01);
/// ```
pub fn calculate_throughput_mbps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    let duration_secs = duration.as_secs_f64();
    let megabytes = bytes as f64 / 1_048_576.0; // 1 MiB = 1,048,576 bytes
    megabytes / duration_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(16 * 1000 * 1000), "15.3 MiB");
    }

    #[test]
    fn test_parse_shard_sizes() {
        assert_eq!(parse_bytes("16MB").unwrap(), 16_000_000);
        assert_eq!(parse_bytes("32MB").unwrap(), 32_000_000);
        assert_eq!(parse_bytes("64MB").unwrap(), 64_000_000);
        assert_eq!(parse_bytes("128MB").unwrap(), 128_000_000);
    }

    #[test]
    fn test_parse_bytes_rejects_garbage() {
        assert!(parse_bytes("fast").is_err());
        assert!(parse_bytes("12XB").is_err());
        assert!(parse_bytes("-3MB").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h 1m 40s");
    }

    #[test]
    fn test_throughput() {
        let t = calculate_throughput_mbps(2 * 1_048_576, Duration::from_secs(2));
        assert!((t - 1.0).abs() < 0.01);
        assert_eq!(calculate_throughput_mbps(100, Duration::ZERO), 0.0);
    }
}
