//! Random code shapes and erasure patterns
//!
//! All randomness comes from the caller's generator so a run is reproducible
//! from its seed.

use anyhow::Result;
use rand::Rng;
use stripeio_common::{CodeParams, MAX_FRAGMENTS};

/// A randomly chosen code and the fragments it loses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomCode {
    pub params: CodeParams,
    pub erasures: Vec<usize>,
}

/// Pick `k ∈ [1, 254]`, `p ∈ [1, 255 - k]` and a random erasure subset
///
/// Each fragment is lost with probability 1/2, scanning upward from index 0,
/// until `p` fragments are lost.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> Result<RandomCode> {
    let k = rng.gen_range(1..MAX_FRAGMENTS);
    let p = rng.gen_range(1..=MAX_FRAGMENTS - k);
    let params = CodeParams::new(k, p)?;

    let mut erasures = Vec::with_capacity(p);
    for index in 0..params.total_fragments() {
        if erasures.len() >= p {
            break;
        }
        if rng.r#gen::<bool>() {
            erasures.push(index);
        }
    }

    Ok(RandomCode { params, erasures })
}

/// `p` distinct erased fragments drawn uniformly from `0..m`, in draw order
pub fn random_erasures<R: Rng + ?Sized>(rng: &mut R, params: &CodeParams) -> Vec<usize> {
    rand::seq::index::sample(rng, params.total_fragments(), params.parity_fragments()).into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_random_code_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..500 {
            let code = random_code(&mut rng).unwrap();
            let k = code.params.data_fragments();
            let p = code.params.parity_fragments();
            assert!((1..=254).contains(&k));
            assert!(p >= 1 && k + p <= 255);
            assert!(code.erasures.len() <= p);
            assert!(code.erasures.windows(2).all(|w| w[0] < w[1]));
            assert!(code.erasures.iter().all(|&e| e < k + p));
        }
    }

    #[test]
    fn test_random_code_reproducible() {
        let a = random_code(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = random_code(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_erasures_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = CodeParams::EC_10_4;
        for _ in 0..100 {
            let mut erasures = random_erasures(&mut rng, &params);
            assert_eq!(erasures.len(), 4);
            assert!(erasures.iter().all(|&e| e < 14));
            erasures.sort_unstable();
            erasures.dedup();
            assert_eq!(erasures.len(), 4);
        }
    }
}
