use crate::normalize::name_tokens;

/// Name similarity on a 0..=100 scale.
///
/// Scoring is split into `key` (run once per name) and `similarity` (run per
/// pair) so a block's candidate keys can be computed once per chunk.
/// Implementations must be deterministic.
pub trait Scorer: Send + Sync {
    fn key(&self, name: &str) -> String;
    fn similarity(&self, a_key: &str, b_key: &str) -> f64;

    fn score(&self, a: &str, b: &str) -> f64 {
        self.similarity(&self.key(a), &self.key(b))
    }
}

/// Token-order-insensitive ratio: folded tokens are sorted and joined, then
/// compared with the indel ratio `200 * LCS / (len_a + len_b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl Scorer for TokenSortRatio {
    fn key(&self, name: &str) -> String {
        let mut tokens = name_tokens(name);
        tokens.sort_unstable();
        tokens.join(" ")
    }

    fn similarity(&self, a_key: &str, b_key: &str) -> f64 {
        if a_key.is_empty() || b_key.is_empty() {
            return 0.0;
        }
        let a: Vec<char> = a_key.chars().collect();
        let b: Vec<char> = b_key.chars().collect();
        indel_ratio(&a, &b)
    }
}

pub fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut cur = vec![0usize; short.len() + 1];
    for &x in long {
        for (j, &y) in short.iter().enumerate() {
            cur[j + 1] = if x == y { prev[j] + 1 } else { cur[j].max(prev[j + 1]) };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[short.len()]
}
