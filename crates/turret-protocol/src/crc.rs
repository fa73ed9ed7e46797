//! CRC8 校验
//!
//! 查表法 CRC8（Dallas/Maxim 反射多项式 0x8C），初值 0xFF，无最终异或。
//! 这是与下位机的硬件约定，修改任何参数都会导致所有帧校验失败。

/// 反射多项式（0x31 的位反转）
const POLY_REFLECTED: u8 = 0x8C;

/// 初始值
const CRC_INIT: u8 = 0xFF;

/// 256 项查找表（编译期生成）
pub const CRC8_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// 计算 CRC8
///
/// 逐字节 `crc = TABLE[crc ^ byte]`。
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(CRC_INIT, |crc, &byte| CRC8_TABLE[(crc ^ byte) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_first_row_matches_peer() {
        let expected = [
            0x00, 0x5e, 0xbc, 0xe2, 0x61, 0x3f, 0xdd, 0x83, 0xc2, 0x9c, 0x7e, 0x20, 0xa3, 0xfd,
            0x1f, 0x41,
        ];
        assert_eq!(&CRC8_TABLE[..16], &expected);
    }

    #[test]
    fn test_table_last_row_matches_peer() {
        let expected = [
            0x74, 0x2a, 0xc8, 0x96, 0x15, 0x4b, 0xa9, 0xf7, 0xb6, 0xe8, 0x0a, 0x54, 0xd7, 0x89,
            0x6b, 0x35,
        ];
        assert_eq!(&CRC8_TABLE[240..], &expected);
    }

    #[test]
    fn test_table_spot_checks() {
        // 中间若干行抽查
        assert_eq!(CRC8_TABLE[0x10], 0x9d);
        assert_eq!(CRC8_TABLE[0x80], 0x8c);
        assert_eq!(CRC8_TABLE[0x8A], 0xf2);
        assert_eq!(CRC8_TABLE[0xC0], 0xca);
    }

    #[test]
    fn test_crc8_empty_is_seed() {
        assert_eq!(crc8(&[]), 0xFF);
    }

    #[test]
    fn test_crc8_single_byte() {
        // 0xFF ^ 0xF1 = 0x0E
        assert_eq!(crc8(&[0xF1]), CRC8_TABLE[0x0E]);
    }
}
