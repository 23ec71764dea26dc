//! Display Formatting
//!
//! Helpers for rendering feed entries as short human-readable text.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::U256;

use crate::transaction::ClassifiedTransaction;

/// Wei per 0.01 ETH
const WEI_PER_CENT: u64 = 10_000_000_000_000_000;

/// Shorten an address to `0x1234...abcd`
///
/// Strings shorter than 10 characters are returned unchanged.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format a wei amount as ETH with two decimals
pub fn format_eth(wei: U256) -> String {
    if wei.is_zero() {
        return "0.00 ETH".to_string();
    }
    let cent = U256::from(WEI_PER_CENT);
    if wei < cent {
        return "<0.01 ETH".to_string();
    }

    // Round half up to the nearest hundredth
    let cents = (wei + cent / U256::from(2)) / cent;
    let hundred = U256::from(100);
    let whole = cents / hundred;
    let frac = (cents % hundred).to::<u64>();
    format!("{}.{:02} ETH", whole, frac)
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{} {} ago", n, unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Describe how long ago `timestamp_millis` was relative to `now_millis`
///
/// Timestamps in the future read as "just now".
pub fn format_relative_time(timestamp_millis: u64, now_millis: u64) -> String {
    let secs = now_millis.saturating_sub(timestamp_millis) / 1000;
    if secs < 1 {
        return "just now".to_string();
    }
    if secs < 60 {
        return plural(secs, "sec");
    }

    let mins = secs / 60;
    if mins < 60 {
        return plural(mins, "min");
    }

    let hours = mins / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }

    plural(hours / 24, "day")
}

/// Current wall-clock time in unix milliseconds
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One-line rendering of a feed entry
pub fn format_entry(tx: &ClassifiedTransaction, now_millis: u64) -> String {
    let tx_type = tx.tx_type();
    let to = match tx.to {
        Some(to) => truncate_address(&format!("{:#x}", to)),
        None => "(new contract)".to_string(),
    };
    format!(
        "{} {:<16} {} {} -> {} {:>12} #{} {}",
        tx_type.emoji(),
        tx_type.label(),
        truncate_address(&format!("{:#x}", tx.hash)),
        truncate_address(&format!("{:#x}", tx.from)),
        to,
        format_eth(tx.value),
        tx.block_number,
        format_relative_time(tx.timestamp_millis, now_millis),
    )
}

/// Footer line, e.g. "Showing 12 transactions across 3 blocks"
pub fn feed_summary(transactions: usize, blocks: usize) -> String {
    format!(
        "Showing {} transactions across {} block{}",
        transactions,
        blocks,
        if blocks == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, Bytes};

    const ONE_ETH: u64 = 1_000_000_000_000_000_000;

    // ==================== truncate_address tests ====================

    #[test]
    fn test_truncate_address() {
        assert_eq!(
            truncate_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            "0xf39f...2266"
        );
    }

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_address("0x1234"), "0x1234");
        assert_eq!(truncate_address(""), "");
    }

    #[test]
    fn test_truncate_exactly_ten_chars() {
        assert_eq!(truncate_address("0x12345678"), "0x1234...5678");
    }

    // ==================== format_eth tests ====================

    #[test]
    fn test_format_eth_zero() {
        assert_eq!(format_eth(U256::ZERO), "0.00 ETH");
    }

    #[test]
    fn test_format_eth_dust() {
        assert_eq!(format_eth(U256::from(1u64)), "<0.01 ETH");
        assert_eq!(format_eth(U256::from(WEI_PER_CENT - 1)), "<0.01 ETH");
    }

    #[test]
    fn test_format_eth_two_decimals() {
        assert_eq!(format_eth(U256::from(WEI_PER_CENT)), "0.01 ETH");
        assert_eq!(format_eth(U256::from(ONE_ETH)), "1.00 ETH");
        assert_eq!(format_eth(U256::from(1_234_000_000_000_000_000u64)), "1.23 ETH");
    }

    #[test]
    fn test_format_eth_rounds() {
        assert_eq!(format_eth(U256::from(1_236_000_000_000_000_000u64)), "1.24 ETH");
        assert_eq!(format_eth(U256::from(999_999_999_999_999_999u64)), "1.00 ETH");
    }

    #[test]
    fn test_format_eth_large_value() {
        let wei = U256::from(ONE_ETH) * U256::from(123_456u64);
        assert_eq!(format_eth(wei), "123456.00 ETH");
    }

    // ==================== format_relative_time tests ====================

    #[test]
    fn test_relative_time_just_now() {
        assert_eq!(format_relative_time(10_000, 10_500), "just now");
        assert_eq!(format_relative_time(20_000, 10_000), "just now");
    }

    #[test]
    fn test_relative_time_units() {
        let now = 1_000_000_000;
        assert_eq!(format_relative_time(now - 1_000, now), "1 sec ago");
        assert_eq!(format_relative_time(now - 45_000, now), "45 secs ago");
        assert_eq!(format_relative_time(now - 60_000, now), "1 min ago");
        assert_eq!(format_relative_time(now - 5 * 60_000, now), "5 mins ago");
        assert_eq!(format_relative_time(now - 3_600_000, now), "1 hour ago");
        assert_eq!(format_relative_time(now - 23 * 3_600_000, now), "23 hours ago");
        assert_eq!(format_relative_time(now - 24 * 3_600_000, now), "1 day ago");
        assert_eq!(format_relative_time(now - 72 * 3_600_000, now), "3 days ago");
    }

    #[test]
    fn test_current_timestamp_is_after_2023() {
        assert!(current_timestamp_millis() > 1_672_531_200_000);
    }

    // ==================== entry / summary tests ====================

    #[test]
    fn test_format_entry() {
        let tx = ClassifiedTransaction {
            hash: b256!("1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"),
            from: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            to: None,
            value: U256::ZERO,
            input: Bytes::from(vec![0x60, 0x80]),
            block_number: 42,
            timestamp_millis: 1_000_000,
        };
        let line = format_entry(&tx, 1_030_000);

        assert!(line.contains("Contract Creation"));
        assert!(line.contains("0x1234...cdef"));
        assert!(line.contains("0xf39f...2266"));
        assert!(line.contains("(new contract)"));
        assert!(line.contains("0.00 ETH"));
        assert!(line.contains("#42"));
        assert!(line.ends_with("30 secs ago"));
    }

    #[test]
    fn test_feed_summary_pluralizes_blocks() {
        assert_eq!(feed_summary(3, 1), "Showing 3 transactions across 1 block");
        assert_eq!(feed_summary(0, 0), "Showing 0 transactions across 0 blocks");
        assert_eq!(feed_summary(50, 4), "Showing 50 transactions across 4 blocks");
    }
}
