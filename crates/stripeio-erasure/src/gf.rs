//! GF(2^8) arithmetic
//!
//! Field elements are bytes. Addition is XOR; multiplication is carried out
//! modulo `x^8 + x^4 + x^3 + x^2 + 1` (0x11d) with generator 2, the field
//! used by ISA-L, so coefficients and parity bytes are interchangeable with it.

/// Reduction polynomial
pub const POLYNOMIAL: u16 = 0x11d;

/// Order of the multiplicative group
const GROUP_ORDER: usize = 255;

static EXP_TABLE: [u8; 512] = generate_exp_table();
static LOG_TABLE: [u8; 256] = generate_log_table();

const fn generate_exp_table() -> [u8; 512] {
    let mut table = [0u8; 512];
    let mut val: u16 = 1;
    let mut i = 0;

    while i < GROUP_ORDER {
        table[i] = val as u8;
        table[i + GROUP_ORDER] = val as u8;
        val <<= 1;
        if val & 0x100 != 0 {
            val ^= POLYNOMIAL;
        }
        i += 1;
    }
    // Sum of two logs never exceeds 508; pad the tail for completeness
    table[510] = table[0];
    table[511] = table[1];

    table
}

const fn generate_log_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut val: u16 = 1;
    let mut i = 0;

    while i < GROUP_ORDER {
        table[val as usize] = i as u8;
        val <<= 1;
        if val & 0x100 != 0 {
            val ^= POLYNOMIAL;
        }
        i += 1;
    }

    table
}

/// Multiply two field elements
#[inline]
#[must_use]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP_TABLE[LOG_TABLE[a as usize] as usize + LOG_TABLE[b as usize] as usize]
}

/// Multiplicative inverse
///
/// Zero has no inverse; `inv(0)` returns 0, matching ISA-L's `gf_inv`.
#[inline]
#[must_use]
pub fn inv(a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    EXP_TABLE[GROUP_ORDER - LOG_TABLE[a as usize] as usize]
}

/// Divide `a` by `b`; returns `None` when `b` is zero
#[inline]
#[must_use]
pub fn div(a: u8, b: u8) -> Option<u8> {
    if b == 0 {
        return None;
    }
    Some(mul(a, inv(b)))
}

/// Generator raised to the power `n`
#[inline]
#[must_use]
pub fn exp(n: usize) -> u8 {
    EXP_TABLE[n % GROUP_ORDER]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shift-and-add multiply, independent of the tables
    fn mul_slow(a: u8, b: u8) -> u8 {
        let mut a = u16::from(a);
        let mut b = b;
        let mut product: u16 = 0;
        while b != 0 {
            if b & 1 != 0 {
                product ^= a;
            }
            a <<= 1;
            if a & 0x100 != 0 {
                a ^= POLYNOMIAL;
            }
            b >>= 1;
        }
        product as u8
    }

    #[test]
    fn test_mul_matches_slow() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                assert_eq!(mul(a, b), mul_slow(a, b), "{a} * {b}");
            }
        }
    }

    #[test]
    fn test_known_products() {
        assert_eq!(mul(2, 0x80), 0x1d);
        assert_eq!(mul(3, 7), 9);
        assert_eq!(mul(1, 0xab), 0xab);
        assert_eq!(mul(0, 0xab), 0);
    }

    #[test]
    fn test_inverse() {
        assert_eq!(inv(0), 0);
        for a in 1..=255u8 {
            assert_eq!(mul(a, inv(a)), 1, "inverse of {a}");
        }
        // ISA-L Cauchy entries for k=1: 1/(1^0) = 1, 1/(2^0) = 0x8e
        assert_eq!(inv(1), 1);
        assert_eq!(inv(2), 0x8e);
    }

    #[test]
    fn test_div() {
        assert_eq!(div(5, 0), None);
        for a in 0..=255u8 {
            for b in 1..=255u8 {
                let q = div(a, b).unwrap();
                assert_eq!(mul(q, b), a);
            }
        }
    }

    #[test]
    fn test_generator_cycle() {
        assert_eq!(exp(0), 1);
        assert_eq!(exp(1), 2);
        assert_eq!(exp(255), 1);
        let mut seen = [false; 256];
        for n in 0..255 {
            let e = exp(n);
            assert!(!seen[e as usize], "generator repeats at {n}");
            seen[e as usize] = true;
        }
        assert!(!seen[0]);
    }
}
