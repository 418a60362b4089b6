//! # Substring extraction
//!
//! Pulls a value enclosed by two delimiters out of modem output, e.g. the IP address of
//! `+CIFSR:STAIP,"10.0.0.181"`.
//!
//! ## Example
//!
//! ````
//! use esp_at_http::extract::extract;
//!
//! let value = extract("+CIFSR:STAIP,\"10.0.0.181\"\r\n", "STAIP,\"", "\"", 15).unwrap();
//! assert_eq!("10.0.0.181", value.value);
//! assert!(!value.truncated);
//! ````

/// Value found between two delimiters
#[derive(Debug, PartialEq, Eq)]
pub struct Extraction<'a, T: ?Sized> {
    /// Delimited value, cut to the requested max. length
    pub value: &'a T,

    /// True if the delimited value was longer than the max. length
    pub truncated: bool,
}

/// Returns the text between the first `start` delimiter and the next following `end` delimiter.
///
/// Values longer than `max_len` bytes get cut at the last character boundary fitting into `max_len`.
/// Returns None if one of the delimiters is missing.
pub fn extract<'a>(source: &'a str, start: &str, end: &str, max_len: usize) -> Option<Extraction<'a, str>> {
    let found = extract_bytes(source.as_bytes(), start.as_bytes(), end.as_bytes(), usize::MAX)?;

    // Both delimiters are valid UTF-8, so the value starts and ends on a char boundary
    let value = core::str::from_utf8(found.value).ok()?;
    if value.len() <= max_len {
        return Some(Extraction {
            value,
            truncated: false,
        });
    }

    let mut length = max_len;
    while !value.is_char_boundary(length) {
        length -= 1;
    }

    Some(Extraction {
        value: &value[..length],
        truncated: true,
    })
}

/// Byte variant of [extract] for raw modem output
pub fn extract_bytes<'a>(source: &'a [u8], start: &[u8], end: &[u8], max_len: usize) -> Option<Extraction<'a, [u8]>> {
    let value_start = find(source, start)? + start.len();
    let value_length = find(&source[value_start..], end)?;
    let value = &source[value_start..value_start + value_length];

    if value.len() <= max_len {
        return Some(Extraction { value, truncated: false });
    }

    Some(Extraction {
        value: &value[..max_len],
        truncated: true,
    })
}

/// Index of the first occurrence of `needle`. An empty needle matches at index zero.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}
