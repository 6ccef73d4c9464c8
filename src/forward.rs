//! Forwarded-call detection and script extraction
//!
//! A forwarding transaction calls `forward(bytes)` on a cluster contract,
//! handing it an encoded script to execute on the caller's behalf. This
//! module detects the selector and pulls the script bytes out of the ABI
//! envelope.
//!
//! The extraction decodes the dynamic-`bytes` head properly (offset word,
//! then length word, both bounds-checked) rather than slicing at a fixed
//! offset, so non-standard encodings fail loudly instead of yielding
//! garbage bytes.

/// 4-byte selector of `forward(bytes)`.
pub const FORWARD_SELECTOR: [u8; 4] = [0xd9, 0x48, 0xd4, 0x68];

const WORD: usize = 32;

/// Why a `forward(bytes)` payload could not be decoded.
#[derive(Debug, PartialEq, Eq)]
pub enum ScriptExtractError {
    /// Input does not start with the forwarding selector.
    NotForwardCall,
    /// Input ends before the ABI head (offset + length words) is complete.
    TruncatedHead,
    /// The offset word points outside the argument data.
    OffsetOutOfRange(u64),
    /// The length word claims more bytes than the input holds.
    LengthOutOfRange(u64),
}

impl std::fmt::Display for ScriptExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotForwardCall => write!(f, "input is not a forward(bytes) call"),
            Self::TruncatedHead => write!(f, "ABI head truncated"),
            Self::OffsetOutOfRange(off) => write!(f, "bytes offset {} out of range", off),
            Self::LengthOutOfRange(len) => write!(f, "bytes length {} out of range", len),
        }
    }
}

impl std::error::Error for ScriptExtractError {}

/// Check whether calldata invokes `forward(bytes)`.
pub fn is_forward_call(input: &[u8]) -> bool {
    input.len() >= 4 && input[..4] == FORWARD_SELECTOR
}

/// Read a 32-byte ABI word as u64, rejecting values that do not fit.
///
/// Offsets and lengths beyond u64 cannot reference real calldata, so the
/// high 24 bytes must be zero.
fn read_word_u64(word: &[u8]) -> Option<u64> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Some(u64::from_be_bytes(buf))
}

/// Extract the encoded script from a `forward(bytes)` calldata payload.
///
/// Layout after the selector: one 32-byte offset word (relative to the
/// start of the argument data), then at that offset a 32-byte length word
/// followed by `length` script bytes.
pub fn extract_script(input: &[u8]) -> Result<Vec<u8>, ScriptExtractError> {
    if !is_forward_call(input) {
        return Err(ScriptExtractError::NotForwardCall);
    }
    let args = &input[4..];
    if args.len() < WORD {
        return Err(ScriptExtractError::TruncatedHead);
    }

    let offset = read_word_u64(&args[..WORD])
        .ok_or(ScriptExtractError::OffsetOutOfRange(u64::MAX))?;
    let offset_usize =
        usize::try_from(offset).map_err(|_| ScriptExtractError::OffsetOutOfRange(offset))?;
    if offset_usize
        .checked_add(WORD)
        .map_or(true, |end| end > args.len())
    {
        return Err(ScriptExtractError::OffsetOutOfRange(offset));
    }

    let len = read_word_u64(&args[offset_usize..offset_usize + WORD])
        .ok_or(ScriptExtractError::LengthOutOfRange(u64::MAX))?;
    let len_usize =
        usize::try_from(len).map_err(|_| ScriptExtractError::LengthOutOfRange(len))?;
    let data_start = offset_usize + WORD;
    if data_start
        .checked_add(len_usize)
        .map_or(true, |end| end > args.len())
    {
        return Err(ScriptExtractError::LengthOutOfRange(len));
    }

    Ok(args[data_start..data_start + len_usize].to_vec())
}
