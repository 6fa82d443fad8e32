// SPDX-License-Identifier: Apache-2.0

// Every message on the socket is a native endian `usize` length followed by
// exactly that many bytes of UTF-8 payload.

use std::io::{Read, Write};

use crate::error::CliError;

pub(crate) const MAX_REQUEST_SIZE: usize = 1024;
pub(crate) const MAX_RESPONSE_SIZE: usize = 16384;

const HEADER_SIZE: usize = std::mem::size_of::<usize>();

pub(crate) fn write_frame<W>(
    writer: &mut W,
    payload: &str,
) -> Result<(), CliError>
where
    W: Write,
{
    writer.write_all(&payload.len().to_ne_bytes())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. `Ok(None)` means the peer closed the stream between
/// frames. A frame larger than `max_size` or not holding UTF-8 is consumed
/// completely before failing with `EX_DATAERR`, so the stream stays usable.
pub(crate) fn read_frame<R>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<String>, CliError>
where
    R: Read,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => (),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    let len = usize::from_ne_bytes(header);
    if len > max_size {
        let skipped = std::io::copy(
            &mut reader.by_ref().take(len as u64),
            &mut std::io::sink(),
        )?;
        if skipped < len as u64 {
            return Err(CliError::from(format!(
                "Connection closed in the middle of a {len} bytes frame"
            )));
        }
        return Err(CliError::data_error(format!(
            "Message of {len} bytes exceeds the limit of {max_size} bytes"
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload).map(Some).map_err(|e| {
        CliError::data_error(format!("Message is not valid UTF-8: {e}"))
    })
}
