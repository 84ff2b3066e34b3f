//! Content-Length framing for JSON-RPC over stdio.
//!
//! Wire format: `Content-Length: <byteLength>\r\n\r\n<body>`, the convention
//! used by editor/tool-server protocols. The decoder is incremental: bytes
//! arrive in arbitrary chunks and complete frames are surfaced as soon as
//! their final byte lands.

/// Encode a message body as a length-prefixed frame.
///
/// # Example
/// ```
/// use taskclaw::rpc::framing::encode_frame;
///
/// let frame = encode_frame(br#"{"jsonrpc":"2.0"}"#);
/// assert!(frame.starts_with(b"Content-Length: 17\r\n\r\n"));
/// ```
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Incremental decoder for length-prefixed frames.
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed incoming bytes into the decoder.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered, not-yet-consumed bytes.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete frame body, if one is fully buffered.
    ///
    /// A header block without a parseable `Content-Length` is discarded and
    /// scanning continues at the following bytes, so one malformed peer
    /// message cannot wedge the connection.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let header_end = find_subslice(&self.buf, b"\r\n\r\n")?;
            let body_start = header_end + 4;

            match parse_content_length(&self.buf[..header_end]) {
                Some(length) => {
                    if self.buf.len() < body_start + length {
                        return None; // body not fully arrived yet
                    }
                    let body = self.buf[body_start..body_start + length].to_vec();
                    self.buf.drain(..body_start + length);
                    return Some(body);
                }
                None => {
                    self.buf.drain(..body_start);
                    // malformed header dropped; try the next block
                }
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse the `Content-Length` header value out of a header block.
fn parse_content_length(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    text.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
