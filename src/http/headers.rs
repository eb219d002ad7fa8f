//! Raw header block model and the merge/override engine.
//!
//! # Responsibilities
//! - Parse caller-supplied CRLF-joined header text without losing data
//! - Replace-or-insert framing headers case-insensitively
//! - Re-serialize with original order, casing and spacing intact
//!
//! # Design Decisions
//! - Lines are stored verbatim; the parsed (lowercased) name exists only
//!   for matching. A line with no `:` is opaque: it never matches an
//!   override and is passed through untouched
//! - An override with an empty value strips every occurrence of the name
//!   and inserts nothing
//! - Overridden names are re-added canonically at the end of the block,
//!   one line per override, in override order

/// One line of a header block.
///
/// `name` is the lowercased field name, or `None` when the line does not
/// parse as `name: value`.
#[derive(Debug, Clone)]
struct HeaderLine {
    raw: String,
    name: Option<String>,
}

impl HeaderLine {
    fn parse(raw: &str) -> Self {
        let name = raw.split_once(':').and_then(|(name, _)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_ascii_lowercase())
            }
        });
        HeaderLine {
            raw: raw.to_string(),
            name,
        }
    }

    fn named(&self, lower: &str) -> bool {
        self.name.as_deref() == Some(lower)
    }
}

/// A parsed header block that can be merged with overrides and written
/// back out byte-for-byte (modulo the overridden names).
#[derive(Debug, Clone, Default)]
pub struct HeaderBlock {
    lines: Vec<HeaderLine>,
}

impl HeaderBlock {
    /// Parse CRLF-joined header text. Blank segments (including the one a
    /// trailing CRLF produces) are dropped; everything else is kept.
    pub fn parse(raw: &str) -> Self {
        let lines = raw
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(HeaderLine::parse)
            .collect();
        HeaderBlock { lines }
    }

    /// Replace-or-insert `name`.
    ///
    /// Every occurrence of `name` (ASCII case-insensitive) is removed.
    /// A non-empty `value` then appends one `name: value` line at the end
    /// of the block, with `name`'s casing as given here. An empty `value`
    /// strips only.
    pub fn override_header(&mut self, name: &str, value: &str) {
        let lower = name.to_ascii_lowercase();
        self.lines.retain(|line| !line.named(&lower));
        if !value.is_empty() {
            self.lines.push(HeaderLine::parse(&format!("{}: {}", name, value)));
        }
    }

    /// Whether any line carries `name` (ASCII case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.lines.iter().any(|line| line.named(&lower))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serialize the block, one CRLF-terminated line per entry. The blank
    /// line ending the header section is the caller's business.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for line in &self.lines {
            out.extend_from_slice(line.raw.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

impl std::fmt::Display for HeaderBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            f.write_str(&line.raw)?;
            f.write_str("\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_bytes() {
        let raw = "Accept: text/html\r\nX-Odd:no-space\r\nUser-Agent: curl";
        let block = HeaderBlock::parse(raw);
        assert_eq!(
            block.to_string(),
            "Accept: text/html\r\nX-Odd:no-space\r\nUser-Agent: curl\r\n"
        );
    }

    #[test]
    fn test_override_replaces_in_place_value() {
        let mut block = HeaderBlock::parse("Content-Length: 40\r\n");
        block.override_header("Content-Length", "25");
        assert_eq!(block.to_string(), "Content-Length: 25\r\n");
    }

    #[test]
    fn test_override_removes_every_case_variant() {
        let raw = "content-length: 40\r\nAccept: */*\r\nCONTENT-LENGTH: 40\r\nContent-Length: 40\r\n";
        let mut block = HeaderBlock::parse(raw);
        block.override_header("Content-Length", "25");
        assert_eq!(block.to_string(), "Accept: */*\r\nContent-Length: 25\r\n");
    }

    #[test]
    fn test_empty_value_strips_only() {
        let mut block = HeaderBlock::parse("Content-Length: 40\r\nAccept: */*\r\n");
        block.override_header("Content-Length", "");
        assert_eq!(block.to_string(), "Accept: */*\r\n");
        assert!(!block.contains("Content-Length"));
    }

    #[test]
    fn test_insert_when_absent_appends_at_end() {
        let mut block = HeaderBlock::parse("Accept: */*\r\n");
        block.override_header("Content-Type", "text/plain");
        assert_eq!(
            block.to_string(),
            "Accept: */*\r\nContent-Type: text/plain\r\n"
        );
    }

    #[test]
    fn test_overrides_append_in_call_order() {
        let mut block = HeaderBlock::parse("Accept: */*\r\n");
        block.override_header("Content-Type", "text/plain");
        block.override_header("Content-Length", "5");
        assert_eq!(
            block.to_string(),
            "Accept: */*\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n"
        );
    }

    #[test]
    fn test_opaque_line_passes_through() {
        let mut block = HeaderBlock::parse("this is not a header\r\nContent-Length: 9\r\n");
        block.override_header("Content-Length", "3");
        assert_eq!(
            block.to_string(),
            "this is not a header\r\nContent-Length: 3\r\n"
        );
    }

    #[test]
    fn test_empty_input_yields_empty_block() {
        let block = HeaderBlock::parse("");
        assert!(block.is_empty());
        assert_eq!(block.to_string(), "");
    }

    #[test]
    fn test_name_with_surrounding_space_still_matches() {
        let mut block = HeaderBlock::parse("Content-Length : 40\r\n");
        block.override_header("Content-Length", "25");
        assert_eq!(block.to_string(), "Content-Length: 25\r\n");
    }
}
