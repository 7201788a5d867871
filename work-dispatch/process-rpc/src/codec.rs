// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use work_dispatch_core::{ChannelError, WireRecord, WIRE_RECORD_LEN};

/// Frames a byte stream as back-to-back fixed-size [`WireRecord`]s.
/// No length prefix; every frame is exactly `WIRE_RECORD_LEN` bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkRecordCodec;

impl Decoder for WorkRecordCodec {
    type Item = WireRecord;
    type Error = ChannelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < WIRE_RECORD_LEN {
            src.reserve(WIRE_RECORD_LEN - src.len());
            return Ok(None);
        }
        let frame = src.split_to(WIRE_RECORD_LEN);
        WireRecord::decode(&frame).map(Some)
    }
}

impl Encoder<WireRecord> for WorkRecordCodec {
    type Error = ChannelError;

    fn encode(&mut self, record: WireRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&record.encode()?);
        Ok(())
    }
}
