//! Decoder options.
//!
//! `DecoderOptions` controls how bytes are interpreted where the Avro format
//! leaves room for policy: non-canonical booleans, malformed UTF-8, and
//! resource limits for untrusted input.

/// Default limit for a single bytes or string value. Avro lengths are
/// longs, but anything past `i32::MAX` is treated as hostile, and the value
/// fits `usize` on 32-bit targets.
pub const DEFAULT_MAX_LENGTH: usize = i32::MAX as usize;

/// Default nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How a boolean byte other than 0x00 or 0x01 is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BooleanPolicy {
    /// Reject any byte other than 0x00 and 0x01 with `InvalidBoolean`.
    #[default]
    Strict,
    /// Treat any nonzero byte as `true`.
    Lenient,
}

/// How string payloads that are not valid UTF-8 are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Utf8Policy {
    /// Fail the datum with `InvalidUtf8`.
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD.
    Lossy,
}

/// Options applied on every decode path of a deserializer.
///
/// # Example
/// ```
/// use contrail::api::{BooleanPolicy, DecoderOptions};
///
/// let opts = DecoderOptions {
///     boolean_policy: BooleanPolicy::Lenient,
///     max_depth: 64,
///     ..Default::default()
/// };
/// assert_eq!(opts.max_length, Some(i32::MAX as usize));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Boolean byte handling (default: strict).
    pub boolean_policy: BooleanPolicy,

    /// Invalid UTF-8 handling (default: strict).
    pub utf8_policy: Utf8Policy,

    /// Maximum length of a single bytes or string value (default: 2 GiB - 1).
    ///
    /// Longer lengths fail with `MalformedLength` before anything is read.
    /// Set to `None` to disable the limit (not recommended for untrusted data).
    pub max_length: Option<usize>,

    /// Maximum nesting depth of records, arrays, maps and unions
    /// (default: 128).
    ///
    /// Recursive schemas have no static depth; this bounds the stack used on
    /// hostile input. A recursive record costs two or three levels per
    /// nesting step (record, union, and resolution step), so the default
    /// stays within a 2 MiB thread stack in debug builds. Raise it only
    /// together with the decoding thread's stack size.
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            boolean_policy: BooleanPolicy::Strict,
            utf8_policy: Utf8Policy::Strict,
            max_length: Some(DEFAULT_MAX_LENGTH),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecoderOptions {
    /// Create a new `DecoderOptions` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the boolean policy.
    pub fn with_boolean_policy(mut self, policy: BooleanPolicy) -> Self {
        self.boolean_policy = policy;
        self
    }

    /// Set the UTF-8 policy.
    pub fn with_utf8_policy(mut self, policy: Utf8Policy) -> Self {
        self.utf8_policy = policy;
        self
    }

    /// Set the maximum bytes/string length. `None` disables the limit.
    pub fn with_max_length(mut self, limit: Option<usize>) -> Self {
        self.max_length = limit;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_options_default() {
        let opts = DecoderOptions::default();
        assert_eq!(opts.boolean_policy, BooleanPolicy::Strict);
        assert_eq!(opts.utf8_policy, Utf8Policy::Strict);
        assert_eq!(opts.max_length, Some(i32::MAX as usize));
        assert_eq!(opts.max_depth, 128);
    }

    #[test]
    fn test_decoder_options_new() {
        assert_eq!(DecoderOptions::new(), DecoderOptions::default());
    }

    #[test]
    fn test_decoder_options_builder() {
        let opts = DecoderOptions::new()
            .with_boolean_policy(BooleanPolicy::Lenient)
            .with_utf8_policy(Utf8Policy::Lossy)
            .with_max_length(None)
            .with_max_depth(8);

        assert_eq!(opts.boolean_policy, BooleanPolicy::Lenient);
        assert_eq!(opts.utf8_policy, Utf8Policy::Lossy);
        assert_eq!(opts.max_length, None);
        assert_eq!(opts.max_depth, 8);
    }

    #[test]
    fn test_decoder_options_debug() {
        let debug_str = format!("{:?}", DecoderOptions::default());
        assert!(debug_str.contains("DecoderOptions"));
        assert!(debug_str.contains("boolean_policy"));
    }
}
