//! # 校验层
//!
//! 两种互不相干的校验：
//! - CRC-32：覆盖超级块与 inode
//! - 单字节异或：覆盖目录项
//!
//! 校验值针对结构体的**最终状态**计算，而非流式摘要；
//! 之后任何字段的改动都必须重新计算。

use spin::Lazy;

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// 逐字节查表用的 CRC-32 表，首次使用时构建，此后只读
static CRC32_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut c = i as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 {
                POLYNOMIAL ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *slot = c;
    }
    table
});

pub fn crc32(data: &[u8]) -> u32 {
    let table = &*CRC32_TABLE;
    let c = data.iter().fold(0xFFFF_FFFF_u32, |c, &byte| {
        table[((c ^ byte as u32) & 0xFF) as usize] ^ (c >> 8)
    });
    c ^ 0xFFFF_FFFF
}

#[inline]
pub fn xor8(data: &[u8]) -> u8 {
    data.iter().fold(0, |x, &byte| x ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn xor8_cancels_pairs() {
        assert_eq!(xor8(&[0xAA, 0x55]), 0xFF);
        assert_eq!(xor8(&[0x3C, 0x3C]), 0);
        assert_eq!(xor8(&[]), 0);
    }
}
