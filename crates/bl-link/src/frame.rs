//! Start/end marker framing.
//!
//! A frame is `START_OF_TEXT body END_OF_TEXT` with a UTF-8 JSON body. Bytes
//! outside a frame are noise and dropped. A frame may be split across any
//! number of reads, and one read may carry several frames.

use tracing::trace;

use crate::error::{LinkError, LinkResult};

/// Two BEL bytes open a frame.
pub const START_OF_TEXT: &[u8] = b"\x07\x07";
/// Two BS bytes close a frame.
pub const END_OF_TEXT: &[u8] = b"\x08\x08";

/// Wrap `payload` in frame markers.
pub fn encode_frame(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(START_OF_TEXT.len() + payload.len() + END_OF_TEXT.len());
    frame.extend_from_slice(START_OF_TEXT);
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(END_OF_TEXT);
    frame
}

/// Incremental frame reassembler.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_frame_len: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_len,
        }
    }

    /// Bytes held while waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed newly read bytes and collect every frame they complete.
    ///
    /// A body that is not UTF-8, or a partial frame that outgrows the size
    /// limit, yields an error entry; decoding continues with the next frame.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<LinkResult<String>> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.buffer, START_OF_TEXT, 0) else {
                // Keep a trailing byte that may be the first half of a marker.
                let keep = usize::from(self.buffer.last() == Some(&START_OF_TEXT[0]));
                let drop = self.buffer.len() - keep;
                self.buffer.drain(..drop);
                break;
            };

            let body_start = start + START_OF_TEXT.len();
            let Some(end) = find(&self.buffer, END_OF_TEXT, body_start) else {
                self.buffer.drain(..start);
                // One extra byte may be the first half of the end marker.
                if self.buffer.len() - START_OF_TEXT.len() > self.max_frame_len.saturating_add(1) {
                    self.buffer.clear();
                    frames.push(Err(LinkError::FrameTooLarge {
                        max: self.max_frame_len,
                    }));
                }
                break;
            };

            let body = self.buffer[body_start..end].to_vec();
            self.buffer.drain(..end + END_OF_TEXT.len());
            trace!(len = body.len(), "Frame reassembled");

            if body.len() > self.max_frame_len {
                frames.push(Err(LinkError::FrameTooLarge {
                    max: self.max_frame_len,
                }));
                continue;
            }
            frames.push(String::from_utf8(body).map_err(LinkError::from));
        }

        frames
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_frames(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<String> {
        decoder
            .push(bytes)
            .into_iter()
            .map(|f| f.expect("frame should decode"))
            .collect()
    }

    #[test]
    fn encode_wraps_payload() {
        assert_eq!(encode_frame("{}"), b"\x07\x07{}\x08\x08");
    }

    #[test]
    fn single_frame() {
        let mut d = FrameDecoder::new(1024);
        assert_eq!(ok_frames(&mut d, b"\x07\x07{\"a\":1}\x08\x08"), [r#"{"a":1}"#]);
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn two_frames_in_one_read() {
        let mut d = FrameDecoder::new(1024);
        let mut bytes = encode_frame("{\"a\":true}");
        bytes.extend(encode_frame("{\"b\":false}"));
        assert_eq!(ok_frames(&mut d, &bytes), [r#"{"a":true}"#, r#"{"b":false}"#]);
    }

    #[test]
    fn markers_split_across_reads() {
        let mut d = FrameDecoder::new(1024);
        assert!(ok_frames(&mut d, b"\x07").is_empty());
        assert!(ok_frames(&mut d, b"\x07{\"At").is_empty());
        assert!(ok_frames(&mut d, b" Entry\":true}\x08").is_empty());
        assert_eq!(ok_frames(&mut d, b"\x08"), [r#"{"At Entry":true}"#]);
    }

    #[test]
    fn noise_between_frames_is_dropped() {
        let mut d = FrameDecoder::new(1024);
        let frames = ok_frames(&mut d, b"junk\x07\x07{}\x08\x08more junk");
        assert_eq!(frames, ["{}"]);
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn invalid_utf8_is_reported_and_decoding_continues() {
        let mut d = FrameDecoder::new(1024);
        let mut bytes = b"\x07\x07\xff\xfe\x08\x08".to_vec();
        bytes.extend(encode_frame("{}"));
        let frames = d.push(&bytes);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Err(LinkError::InvalidUtf8(_))));
        assert_eq!(frames[1].as_deref().ok(), Some("{}"));
    }

    #[test]
    fn oversized_partial_frame_is_discarded() {
        let mut d = FrameDecoder::new(4);
        let frames = d.push(b"\x07\x07{\"abcdef\":");
        assert!(matches!(frames[..], [Err(LinkError::FrameTooLarge { max: 4 })]));
        assert_eq!(d.pending(), 0);
        assert_eq!(ok_frames(&mut d, b"\x07\x07{}\x08\x08"), ["{}"]);
    }

    #[test]
    fn unlimited_frame_len_reassembles_split_frame() {
        let mut d = FrameDecoder::new(usize::MAX);
        assert!(ok_frames(&mut d, b"\x07\x07{\"At Entry\":").is_empty());
        assert_eq!(ok_frames(&mut d, b"true}\x08\x08"), [r#"{"At Entry":true}"#]);
    }

    #[test]
    fn oversized_complete_frame_is_rejected() {
        let mut d = FrameDecoder::new(4);
        let frames = d.push(b"\x07\x07{\"abcdef\":1}\x08\x08");
        assert!(matches!(frames[..], [Err(LinkError::FrameTooLarge { max: 4 })]));
    }
}
