//! # Topic Matching
//!
//! Topics are dot-separated segments (`orders.created`). Patterns may use `*`
//! as a single-segment wildcard (`orders.*`). There is no multi-level
//! wildcard: a pattern only matches topics with the same number of segments.

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Single-segment wildcard.
pub const WILDCARD: &str = "*";

/// Check if a topic matches a subscription pattern.
///
/// Examples:
/// - `orders.created` matches `orders.created`
/// - `orders.created` matches `orders.*`
/// - `orders.created.v2` does not match `orders.*`
/// - `Orders.created` does not match `orders.*` (case-sensitive)
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    // Exact match first (most common case)
    if pattern == topic {
        return true;
    }

    let mut pattern_parts = pattern.split(SEPARATOR);
    let mut topic_parts = topic.split(SEPARATOR);

    loop {
        match (pattern_parts.next(), topic_parts.next()) {
            (None, None) => return true,
            (Some(p), Some(t)) if p == WILDCARD || p == t => continue,
            // Segment mismatch, or segment counts differ
            _ => return false,
        }
    }
}

/// Whether a pattern contains at least one wildcard segment.
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.split(SEPARATOR).any(|segment| segment == WILDCARD)
}
