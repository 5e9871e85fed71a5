//! Bloom membership filter (§4.4 step 2), consulted before the FST lookup
//! so a miss on a huge out-of-vocabulary query is a few hash computations
//! instead of a trie walk. No bloom-filter crate appears anywhere in the
//! reference corpus, so this is a small hand-rolled implementation rather
//! than a fabricated dependency.

use lex_core::compute_content_hash;

pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: u32,
}

impl BloomFilter {
    /// Size the filter for `expected_items` at the given false-positive
    /// rate using the standard optimal-parameters formulas.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let expected_items = expected_items.max(1);
        let num_bits = optimal_num_bits(expected_items, false_positive_rate);
        let num_hashes = optimal_num_hashes(num_bits, expected_items);
        Self {
            bits: vec![0u64; num_bits.div_ceil(64)],
            num_bits,
            num_hashes,
        }
    }

    pub fn insert(&mut self, item: &str) {
        for index in self.indices(item) {
            self.bits[index / 64] |= 1 << (index % 64);
        }
    }

    pub fn might_contain(&self, item: &str) -> bool {
        self.indices(item).all(|index| self.bits[index / 64] & (1 << (index % 64)) != 0)
    }

    /// Double-hashing scheme (Kirsch-Mitzenmacher): derive `num_hashes`
    /// indices from two independent SHA-256-derived seeds instead of
    /// computing `num_hashes` independent hashes.
    fn indices(&self, item: &str) -> impl Iterator<Item = usize> + '_ {
        let h1 = u64::from_le_bytes(compute_content_hash(item.as_bytes())[0..8].try_into().unwrap());
        let h2 = u64::from_le_bytes(
            compute_content_hash(format!("{item}\0salt").as_bytes())[0..8]
                .try_into()
                .unwrap(),
        );
        (0..self.num_hashes).map(move |i| {
            let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (combined % self.num_bits as u64) as usize
        })
    }
}

fn optimal_num_bits(n: usize, p: f64) -> usize {
    let n = n as f64;
    let m = -(n * p.ln()) / (std::f64::consts::LN_2.powi(2));
    (m.ceil() as usize).max(64)
}

fn optimal_num_hashes(num_bits: usize, n: usize) -> u32 {
    let k = (num_bits as f64 / n as f64) * std::f64::consts::LN_2;
    (k.round() as u32).clamp(1, 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_items_are_always_found() {
        let mut filter = BloomFilter::new(1000, 0.01);
        let words = ["cogent", "ephemeral", "serendipity", "ubiquitous"];
        for word in words {
            filter.insert(word);
        }
        for word in words {
            assert!(filter.might_contain(word));
        }
    }

    #[test]
    fn false_positive_rate_is_roughly_bounded() {
        let mut filter = BloomFilter::new(1000, 0.01);
        for i in 0..1000 {
            filter.insert(&format!("word-{i}"));
        }
        let false_positives = (1000..11_000)
            .filter(|i| filter.might_contain(&format!("word-{i}")))
            .count();
        // Generous slack over the 1% target to keep this test non-flaky.
        assert!(false_positives < 500, "false positives: {false_positives}");
    }
}
