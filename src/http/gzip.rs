// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! gzip 响应正文解码（RFC 1952）。
//!
//! 头部逐项检查：魔数、压缩方法、保留位、可选的 FEXTRA/FNAME/FCOMMENT 字段与
//! 头部 CRC；正文用 deflate 解压后再核对尾部记录的长度与 CRC-32。

use std::io::Read;

use flate2::read::DeflateDecoder;
use flate2::Crc;
use log::debug;

use crate::exception::{Exception, Result};

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const RESERVED: u8 = 0xe0;

/// 头部之后至少还要留下 8 字节的尾部
const TRAILER_LEN: usize = 8;

fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// 跳过以 0 结尾的字段，返回新的头部长度
fn skip_zero_terminated(data: &[u8], header_len: usize) -> Result<usize> {
    let too_short = Exception::GzipData("data too short");
    if data.len() < header_len + 1 + TRAILER_LEN {
        return Err(too_short);
    }
    let field_len = data[header_len..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(Exception::GzipData("data too short"))?;
    if data.len() < header_len + field_len + 1 + TRAILER_LEN {
        return Err(too_short);
    }
    Ok(header_len + field_len + 1)
}

pub fn decode_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let length = data.len();
    if length < 18 || data[..2] != [0x1f, 0x8b] {
        return Err(Exception::GzipData("not gzip-encoded data"));
    }
    let method = data[2];
    if method != 8 {
        return Err(Exception::GzipMethod(method));
    }
    let flags = data[3];
    if flags & RESERVED != 0 {
        return Err(Exception::GzipData("reserved bits are set"));
    }

    let mut header_len = 10;
    if flags & FEXTRA != 0 {
        if length < header_len + 2 + TRAILER_LEN {
            return Err(Exception::GzipData("data too short"));
        }
        let extra_len = le_u16(data, header_len) as usize;
        if length < header_len + 2 + extra_len + TRAILER_LEN {
            return Err(Exception::GzipData("data too short"));
        }
        header_len += extra_len + 2;
    }
    if flags & FNAME != 0 {
        header_len = skip_zero_terminated(data, header_len)?;
    }
    if flags & FCOMMENT != 0 {
        header_len = skip_zero_terminated(data, header_len)?;
    }
    if flags & FHCRC != 0 {
        if length < header_len + 2 + TRAILER_LEN {
            return Err(Exception::GzipData("data too short"));
        }
        let expected = (crc32(&data[..header_len]) & 0xffff) as u16;
        if expected != le_u16(data, header_len) {
            return Err(Exception::GzipCrc("header"));
        }
        header_len += 2;
    }

    let data_crc = le_u32(data, length - 8);
    let data_size = le_u32(data, length - 4) as usize;
    // ISIZE 来自对端，预分配量以压缩数据长度为界
    let mut unpacked = Vec::with_capacity(data_size.min(length.saturating_mul(4)));
    DeflateDecoder::new(&data[header_len..length - TRAILER_LEN])
        .read_to_end(&mut unpacked)
        .map_err(|e| Exception::GzipRead(format!("inflate failed: {}", e)))?;
    if unpacked.len() != data_size {
        return Err(Exception::GzipRead("data size check failed".to_string()));
    }
    if crc32(&unpacked) != data_crc {
        return Err(Exception::GzipCrc("data"));
    }
    debug!("gzip 解码完成：{} -> {} 字节", length, unpacked.len());
    Ok(unpacked)
}
