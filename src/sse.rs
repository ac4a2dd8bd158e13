use crate::io_struct::OutboundEvent;
use bytes::Bytes;
use serde_json::json;

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Frames an event as `data: <json>\n\n`, or the `[DONE]` sentinel.
pub fn encode(event: &OutboundEvent) -> Bytes {
    let payload = match event {
        OutboundEvent::Done => return Bytes::from_static(DONE_FRAME),
        OutboundEvent::Content(content) => json!({ "content": content }),
        OutboundEvent::Error(error) => json!({ "error": error }),
    };
    Bytes::from(format!("data: {}\n\n", payload))
}
