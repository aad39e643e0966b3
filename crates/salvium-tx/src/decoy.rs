//! Decoy selection: a gamma-distributed output-age sampler over the
//! chain's cumulative output offsets (Miller et al. parameters).
//!
//! The picker maps a sampled spend age in seconds onto the ascending
//! output index space, then chooses uniformly within the block the age
//! lands in. Ring assembly retries until enough distinct candidates
//! accumulate around the real output.

use rand::{CryptoRng, Rng, RngCore};
use salvium_types::{DEFAULT_TX_SPENDABLE_AGE, DIFFICULTY_TARGET};

use crate::TxError;

const GAMMA_SHAPE: f64 = 19.28;
const GAMMA_SCALE: f64 = 1.0 / 1.61;

/// Ten blocks of default spendable age, in seconds.
const DEFAULT_UNLOCK_TIME: f64 = DEFAULT_TX_SPENDABLE_AGE as f64 * DIFFICULTY_TARGET as f64;

/// Recent-spend window: 50 blocks, in seconds.
const RECENT_SPEND_WINDOW: f64 = 50.0 * DIFFICULTY_TARGET as f64;

const BLOCKS_IN_YEAR: usize = (365 * 86_400 / DIFFICULTY_TARGET) as usize;

pub struct GammaPicker {
    /// Cumulative output counts per block, ascending.
    offsets: Vec<u64>,
    /// Blocks whose outputs are old enough to spend.
    usable_blocks: usize,
    num_usable: u64,
    /// Seconds per output, measured over the most recent year of blocks.
    average_output_time: f64,
}

impl GammaPicker {
    pub fn new(offsets: Vec<u64>) -> Result<Self, TxError> {
        let spendable_age = DEFAULT_TX_SPENDABLE_AGE as usize;
        if offsets.len() <= spendable_age {
            return Err(TxError::DecoySelection(
                "output distribution shorter than the spendable age".into(),
            ));
        }
        let usable_blocks = offsets.len() - spendable_age;
        let num_usable = offsets[usable_blocks - 1];
        if num_usable == 0 {
            return Err(TxError::DecoySelection("no spendable outputs".into()));
        }

        // Outputs per second from the tail of the chain.
        let window = usable_blocks.min(BLOCKS_IN_YEAR);
        let window_start = usable_blocks - window;
        let outputs_in_window = num_usable
            - if window_start == 0 {
                0
            } else {
                offsets[window_start - 1]
            };
        let average_output_time = if outputs_in_window == 0 {
            DIFFICULTY_TARGET as f64
        } else {
            DIFFICULTY_TARGET as f64 * window as f64 / outputs_in_window as f64
        };

        Ok(Self {
            offsets,
            usable_blocks,
            num_usable,
            average_output_time,
        })
    }

    pub fn num_usable(&self) -> u64 {
        self.num_usable
    }

    /// One gamma pick. `None` is a bad pick (age beyond the usable chain).
    pub fn pick<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Option<u64> {
        let x = gamma_sample(GAMMA_SHAPE, GAMMA_SCALE, rng).exp();
        let age = if x > DEFAULT_UNLOCK_TIME {
            x - DEFAULT_UNLOCK_TIME
        } else {
            rng.gen::<f64>() * RECENT_SPEND_WINDOW
        };

        let offset = (age / self.average_output_time) as u64;
        if offset >= self.num_usable {
            return None;
        }

        // Age counts back from the tip; flip into the ascending index space.
        let index = self.num_usable - 1 - offset;
        Some(self.pick_within_block(index, rng))
    }

    /// Find the block containing `index` and choose uniformly inside it.
    fn pick_within_block<R: RngCore + CryptoRng>(&self, index: u64, rng: &mut R) -> u64 {
        let usable = &self.offsets[..self.usable_blocks];
        let block = match usable.binary_search(&index) {
            Ok(pos) => pos,
            Err(0) => 0,
            Err(pos) => pos - 1,
        };
        let start = if block == 0 { 0 } else { self.offsets[block - 1] };
        let end = self.offsets[block];
        if end <= start {
            return index;
        }
        start + rng.gen_range(0..end - start)
    }

    /// Assemble a sorted ring of `ring_size` distinct indices containing
    /// `real_index` and avoiding everything in `exclude`.
    ///
    /// Returns the ascending indices and the real output's position.
    pub fn select_decoys<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        real_index: u64,
        ring_size: usize,
        exclude: &[u64],
    ) -> Result<(Vec<u64>, usize), TxError> {
        if ring_size == 0 {
            return Err(TxError::DecoySelection("empty ring requested".into()));
        }
        let mut picked = vec![real_index];
        let max_attempts = 100 * ring_size;
        let mut attempts = 0;

        while picked.len() < ring_size {
            attempts += 1;
            if attempts > max_attempts {
                return Err(TxError::DecoySelection(format!(
                    "no ring of {ring_size} after {max_attempts} attempts"
                )));
            }
            let candidate = match self.pick(rng) {
                Some(idx) => idx,
                None => continue,
            };
            if candidate >= self.num_usable
                || picked.contains(&candidate)
                || exclude.contains(&candidate)
            {
                continue;
            }
            picked.push(candidate);
        }

        picked.sort_unstable();
        let real_pos = picked
            .iter()
            .position(|&x| x == real_index)
            .expect("real index was inserted above");
        Ok((picked, real_pos))
    }
}

// ─── Gamma sampling (Marsaglia & Tsang) ─────────────────────────────────────

fn gamma_sample<R: RngCore + CryptoRng>(shape: f64, scale: f64, rng: &mut R) -> f64 {
    if shape < 1.0 {
        let g = gamma_sample(shape + 1.0, 1.0, rng);
        let u: f64 = rng.gen();
        return g * u.powf(1.0 / shape) * scale;
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = standard_normal(rng);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u: f64 = rng.gen();
        let x2 = x * x;
        if u < 1.0 - 0.0331 * x2 * x2 {
            return d * v * scale;
        }
        if u.ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
            return d * v * scale;
        }
    }
}

/// Box-Muller.
fn standard_normal<R: RngCore + CryptoRng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat_offsets(blocks: usize, per_block: u64) -> Vec<u64> {
        (1..=blocks as u64).map(|i| i * per_block).collect()
    }

    #[test]
    fn rejects_short_distribution() {
        assert!(GammaPicker::new(flat_offsets(5, 10)).is_err());
        assert!(GammaPicker::new(flat_offsets(200, 10)).is_ok());
    }

    #[test]
    fn picks_stay_in_range() {
        let picker = GammaPicker::new(flat_offsets(2_000, 25)).unwrap();
        let mut rng = StdRng::seed_from_u64(101);
        for _ in 0..1_000 {
            if let Some(idx) = picker.pick(&mut rng) {
                assert!(idx < picker.num_usable());
            }
        }
    }

    #[test]
    fn gamma_mean_is_plausible() {
        // Mean of Gamma(shape, scale) is shape·scale ≈ 11.98.
        let mut rng = StdRng::seed_from_u64(102);
        let n = 4_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += gamma_sample(GAMMA_SHAPE, GAMMA_SCALE, &mut rng);
        }
        let mean = sum / n as f64;
        let expected = GAMMA_SHAPE * GAMMA_SCALE;
        assert!(
            (mean - expected).abs() < expected * 0.3,
            "mean {mean} too far from {expected}"
        );
    }

    #[test]
    fn ring_contains_real_and_is_sorted() {
        let picker = GammaPicker::new(flat_offsets(2_000, 25)).unwrap();
        let mut rng = StdRng::seed_from_u64(103);
        let real = 12_345;
        let (ring, pos) = picker.select_decoys(&mut rng, real, 16, &[]).unwrap();
        assert_eq!(ring.len(), 16);
        assert_eq!(ring[pos], real);
        for pair in ring.windows(2) {
            assert!(pair[0] < pair[1], "ring must be strictly ascending");
        }
    }

    #[test]
    fn ring_respects_exclusions() {
        let picker = GammaPicker::new(flat_offsets(2_000, 25)).unwrap();
        let mut rng = StdRng::seed_from_u64(104);
        let real = 40_000;
        // Exclude a band of recent outputs.
        let exclude: Vec<u64> = (49_000..49_900).collect();
        let (ring, _) = picker
            .select_decoys(&mut rng, real, 11, &exclude)
            .unwrap();
        for idx in &ring {
            assert!(*idx == real || !exclude.contains(idx));
        }
    }

    #[test]
    fn impossible_ring_errors_out() {
        // Tiny chain: 11 usable outputs cannot fill a 16-ring reliably
        // once most are excluded.
        let picker = GammaPicker::new(flat_offsets(12, 1)).unwrap();
        let exclude: Vec<u64> = (0..2).collect();
        let mut rng = StdRng::seed_from_u64(105);
        let result = picker.select_decoys(&mut rng, 1, 16, &exclude);
        assert!(result.is_err());
    }
}
