//! 遥测与控制消息的线格式编解码
//!
//! 外部约定的 protobuf 线格式，字段编号固定：
//! DeviceStatus { 1: deviceId, 2: name, 3: value, 4: unit }
//! Command { 1: command, 2: name, 3: value }
//! Ack { 1: status }

use crate::model::{Ack, Command, DeviceStatus};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// 线格式解码错误
#[derive(Debug, Error)]
pub enum WireError {
    #[error("message truncated")]
    Truncated,

    #[error("varint exceeds 64 bits")]
    InvalidVarint,

    #[error("invalid utf-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),
}

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
}

fn get_varint(buf: &mut impl Buf) -> Result<u64, WireError> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        if !buf.has_remaining() {
            return Err(WireError::Truncated);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(WireError::InvalidVarint)
}

fn put_str(buf: &mut BytesMut, field: u32, value: &str) {
    put_varint(buf, u64::from(field << 3 | u32::from(WIRE_LEN)));
    put_varint(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

fn put_u32(buf: &mut BytesMut, field: u32, value: u32) {
    put_varint(buf, u64::from(field << 3 | u32::from(WIRE_VARINT)));
    put_varint(buf, u64::from(value));
}

fn put_double(buf: &mut BytesMut, field: u32, value: f64) {
    put_varint(buf, u64::from(field << 3 | u32::from(WIRE_FIXED64)));
    buf.put_u64_le(value.to_bits());
}

fn get_string(buf: &mut impl Buf) -> Result<String, WireError> {
    let len = get_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(WireError::Truncated);
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    Ok(String::from_utf8(bytes)?)
}

fn get_double(buf: &mut impl Buf) -> Result<f64, WireError> {
    if buf.remaining() < 8 {
        return Err(WireError::Truncated);
    }
    Ok(f64::from_bits(buf.get_u64_le()))
}

/// 跳过未知字段，保持前向兼容
fn skip_field(buf: &mut impl Buf, wire_type: u8) -> Result<(), WireError> {
    match wire_type {
        WIRE_VARINT => {
            get_varint(buf)?;
        }
        WIRE_FIXED64 => {
            if buf.remaining() < 8 {
                return Err(WireError::Truncated);
            }
            buf.advance(8);
        }
        WIRE_LEN => {
            let len = get_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(WireError::Truncated);
            }
            buf.advance(len);
        }
        WIRE_FIXED32 => {
            if buf.remaining() < 4 {
                return Err(WireError::Truncated);
            }
            buf.advance(4);
        }
        other => return Err(WireError::UnsupportedWireType(other)),
    }
    Ok(())
}

pub fn encode_device_status(status: &DeviceStatus) -> Vec<u8> {
    let mut buf = BytesMut::new();
    put_u32(&mut buf, 1, status.device_id);
    put_str(&mut buf, 2, &status.name);
    put_double(&mut buf, 3, status.value);
    put_str(&mut buf, 4, &status.unit);
    buf.to_vec()
}

pub fn decode_device_status(mut payload: &[u8]) -> Result<DeviceStatus, WireError> {
    let mut status = DeviceStatus::default();
    while payload.has_remaining() {
        let key = get_varint(&mut payload)?;
        let wire_type = (key & 0x7) as u8;
        match (key >> 3, wire_type) {
            (1, WIRE_VARINT) => status.device_id = get_varint(&mut payload)? as u32,
            (2, WIRE_LEN) => status.name = get_string(&mut payload)?,
            (3, WIRE_FIXED64) => status.value = get_double(&mut payload)?,
            (4, WIRE_LEN) => status.unit = get_string(&mut payload)?,
            _ => skip_field(&mut payload, wire_type)?,
        }
    }
    Ok(status)
}

pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = BytesMut::new();
    put_str(&mut buf, 1, &command.command);
    put_str(&mut buf, 2, &command.name);
    put_double(&mut buf, 3, command.value);
    buf.to_vec()
}

pub fn decode_command(mut payload: &[u8]) -> Result<Command, WireError> {
    let mut command = Command::default();
    while payload.has_remaining() {
        let key = get_varint(&mut payload)?;
        let wire_type = (key & 0x7) as u8;
        match (key >> 3, wire_type) {
            (1, WIRE_LEN) => command.command = get_string(&mut payload)?,
            (2, WIRE_LEN) => command.name = get_string(&mut payload)?,
            (3, WIRE_FIXED64) => command.value = get_double(&mut payload)?,
            _ => skip_field(&mut payload, wire_type)?,
        }
    }
    Ok(command)
}

pub fn encode_ack(ack: &Ack) -> Vec<u8> {
    let mut buf = BytesMut::new();
    put_str(&mut buf, 1, &ack.status);
    buf.to_vec()
}

pub fn decode_ack(mut payload: &[u8]) -> Result<Ack, WireError> {
    let mut ack = Ack::default();
    while payload.has_remaining() {
        let key = get_varint(&mut payload)?;
        let wire_type = (key & 0x7) as u8;
        match (key >> 3, wire_type) {
            (1, WIRE_LEN) => ack.status = get_string(&mut payload)?,
            _ => skip_field(&mut payload, wire_type)?,
        }
    }
    Ok(ack)
}
