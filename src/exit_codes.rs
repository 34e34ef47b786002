//! Standard exit codes for flashpack binaries
//!
//! Shared by the pack/unpack, sign and verify tools so scripts can tell
//! failure classes apart.

use crate::exceptions::FlashError;

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Generic error (avoid using - be more specific)
pub const EXIT_ERROR: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Container or text format error (truncated image, bad staging list)
pub const EXIT_FORMAT_ERROR: i32 = 102;

/// Checksum re-verification reported a mismatch (strict mode only)
pub const EXIT_CHECKSUM_ERROR: i32 = 103;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Key, signing or signature verification failure
pub const EXIT_SIGNATURE_ERROR: i32 = 107;

/// Build/packaging error
pub const EXIT_BUILD_ERROR: i32 = 108;

/// Map an error to the exit code a binary should return for it
pub fn exit_code_for(err: &FlashError) -> i32 {
    match err {
        FlashError::Format(_) => EXIT_FORMAT_ERROR,
        FlashError::IoError(_) | FlashError::IoAt { .. } => EXIT_IO_ERROR,
        FlashError::Crypto(_) => EXIT_SIGNATURE_ERROR,
        FlashError::ChecksumMismatch(_) => EXIT_CHECKSUM_ERROR,
        FlashError::JsonError(_) => EXIT_ERROR,
        FlashError::Generic(_) => EXIT_BUILD_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_variant() {
        assert_eq!(
            exit_code_for(&FlashError::format("short read")),
            EXIT_FORMAT_ERROR
        );
        assert_eq!(
            exit_code_for(&FlashError::io_at(
                "/nope",
                std::io::Error::from(std::io::ErrorKind::NotFound)
            )),
            EXIT_IO_ERROR
        );
        assert_eq!(
            exit_code_for(&FlashError::Crypto("bad key".into())),
            EXIT_SIGNATURE_ERROR
        );
    }
}
