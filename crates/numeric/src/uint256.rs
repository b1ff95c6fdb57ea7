// 256-bit unsigned integer type.
//
// Wraps `crypto_bigint::U256`. Limbs are stored as 4 x u64 in little-endian
// limb order (limbs[0] is least significant), which is also the layout of
// `Word256`.

use crypto_bigint::Uint;

/// 256-bit unsigned integer, backed by `crypto_bigint::U256`.
pub type U256 = Uint<4>;

/// Bit and limb accessors used by the word codec.
pub trait U256Ext {
    /// Extract a single bit.
    fn get_bit(&self, index: u32) -> bool;

    /// Construct from 4 x u64 limbs in little-endian limb order.
    fn from_limbs(limbs: [u64; 4]) -> Self;

    /// The raw u64 limbs in little-endian limb order.
    fn limbs(&self) -> [u64; 4];
}

impl U256Ext for U256 {
    fn get_bit(&self, index: u32) -> bool {
        self.bit_vartime(index)
    }

    fn from_limbs(limbs: [u64; 4]) -> Self {
        U256::from_words(limbs)
    }

    fn limbs(&self) -> [u64; 4] {
        *self.as_words()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_bigint::Encoding;

    #[test]
    fn from_limbs_roundtrip() {
        let limbs = [0x1111_2222_3333_4444u64, 0x5555_6666_7777_8888, 0x9999_aaaa_bbbb_cccc, 0xdddd_eeee_ffff_0000];
        let val = U256::from_limbs(limbs);
        assert_eq!(val.limbs(), limbs);
    }

    #[test]
    fn get_bit_across_limbs() {
        let val = U256::from_limbs([0b1010, 1, 0, 1 << 63]);
        assert!(val.get_bit(1));
        assert!(!val.get_bit(2));
        assert!(val.get_bit(64));
        assert!(!val.get_bit(65));
        assert!(val.get_bit(255));
    }

    #[test]
    fn big_endian_bytes_put_top_limb_first() {
        let val = U256::from_limbs([1, 2, 3, 4]);
        let bytes = val.to_be_bytes();
        assert_eq!(bytes[7], 4);
        assert_eq!(bytes[31], 1);
        assert_eq!(U256::from_be_bytes(bytes), val);
    }
}
