use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    codec::{self, CodecId, CodecRegistry},
    error::{Error, ErrorKind, Result},
    schema::{EventDesc, MethodDesc},
    value::Value,
};

// Server-to-client frames are discriminated by a leading tag byte. Calls
// carry no tag: the client is the only writer on its half, and every
// client-to-server frame is a call.
pub(crate) const TAG_DATA: u8 = 0;
pub(crate) const TAG_EVENT: u8 = 1;
pub(crate) const TAG_ERROR: u8 = 2;

/// Call frame: method index (u8) · request id (i32 LE) · encoded arguments.
pub(crate) fn encode_call(
    registry: &CodecRegistry,
    method: &MethodDesc,
    request_id: u32,
    args: &[Value],
) -> Result<BytesMut> {
    if args.len() != method.params.len() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!(
                "{} takes {} argument(s), got {}",
                method.name,
                method.params.len(),
                args.len()
            ),
        ));
    }
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(method.index);
    buf.put_i32_le(request_id as i32);
    for (param, arg) in method.params.iter().zip(args) {
        registry.encode(&mut buf, param.ty, arg)?;
    }
    Ok(buf)
}

/// Data response frame: tag 0 · request id echoed · encoded return value
/// (absent entirely for void methods — the frame itself is still sent, so
/// void calls have completion semantics).
pub(crate) fn encode_data_response(
    registry: &CodecRegistry,
    request_id: u32,
    ret: Option<(CodecId, &Value)>,
) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(32);
    buf.put_u8(TAG_DATA);
    buf.put_i32_le(request_id as i32);
    if let Some((id, value)) = ret {
        registry.encode(&mut buf, id, value)?;
    }
    Ok(buf)
}

/// Error response frame: tag 2 · request id echoed · message string.
pub(crate) fn encode_error_response(request_id: u32, msg: &str) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(32 + msg.len());
    buf.put_u8(TAG_ERROR);
    buf.put_i32_le(request_id as i32);
    codec::put_string(&mut buf, msg)?;
    Ok(buf)
}

/// Event frame: tag 1 · event index (u8) · encoded parameters.
pub(crate) fn encode_event(
    registry: &CodecRegistry,
    event: &EventDesc,
    args: &[Value],
) -> Result<BytesMut> {
    if args.len() != event.params.len() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!(
                "{} carries {} parameter(s), got {}",
                event.name,
                event.params.len(),
                args.len()
            ),
        ));
    }
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(TAG_EVENT);
    buf.put_u8(event.index);
    for (param, arg) in event.params.iter().zip(args) {
        registry.encode(&mut buf, param.ty, arg)?;
    }
    Ok(buf)
}

pub(crate) async fn read_request_id<R>(reader: &mut R) -> Result<u32>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .await
        .map_err(codec::decode_io_error)?;
    Ok(i32::from_le_bytes(bytes) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimitiveKind, SchemaBuilder, TypeDesc};

    #[test]
    fn test_call_frame_layout() {
        let schema = SchemaBuilder::new("T")
            .method(
                "add",
                [
                    ("x", TypeDesc::Primitive(PrimitiveKind::I32)),
                    ("y", TypeDesc::Primitive(PrimitiveKind::I32)),
                ],
                Some(TypeDesc::Primitive(PrimitiveKind::I32)),
            )
            .build()
            .unwrap();
        let method = schema.method("add").unwrap();
        let frame = encode_call(
            schema.registry(),
            method,
            7,
            &[Value::I32(2), Value::I32(-3)],
        )
        .unwrap();
        assert_eq!(
            &frame[..],
            &[
                0, // method index
                7, 0, 0, 0, // request id, little-endian
                2, 0, 0, 0, // x
                0xFD, 0xFF, 0xFF, 0xFF, // y = -3
            ]
        );
    }

    #[test]
    fn test_response_frame_layouts() {
        let schema = SchemaBuilder::new("T")
            .method("get", [], Some(TypeDesc::Primitive(PrimitiveKind::U16)))
            .method("fire", [], None)
            .build()
            .unwrap();
        let registry = schema.registry();
        let ret = schema.method("get").unwrap().ret.unwrap();

        let frame =
            encode_data_response(registry, 9, Some((ret, &Value::U16(0x1234)))).unwrap();
        assert_eq!(&frame[..], &[TAG_DATA, 9, 0, 0, 0, 0x34, 0x12]);

        // void response carries the tag and id only
        let frame = encode_data_response(registry, 9, None).unwrap();
        assert_eq!(&frame[..], &[TAG_DATA, 9, 0, 0, 0]);

        let frame = encode_error_response(9, "boom").unwrap();
        assert_eq!(&frame[..5], &[TAG_ERROR, 9, 0, 0, 0]);
        assert_eq!(&frame[5..9], &4u32.to_le_bytes());
        assert_eq!(&frame[9..], b"boom");
    }

    #[test]
    fn test_arity_checked() {
        let schema = SchemaBuilder::new("T")
            .method("one", [("x", TypeDesc::Primitive(PrimitiveKind::Bool))], None)
            .build()
            .unwrap();
        let err = encode_call(schema.registry(), schema.method("one").unwrap(), 0, &[])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
