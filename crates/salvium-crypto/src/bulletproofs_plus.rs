//! Bulletproofs+ aggregated range proofs.
//!
//! Proves every committed amount lies in [0, 2⁶⁴) with a proof of
//! 6 scalars + 3 + 2·log₂(64·m) points. Verification collapses to one
//! multiscalar multiplication; batch verification sums the collapsed
//! equations under per-proof weights drawn from each proof's transcript.
//!
//! All prover points are stored ⅛-scaled and re-multiplied by 8 on the
//! verifier side, matching the wire convention of the rest of RingCT.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand::{CryptoRng, RngCore};
use std::sync::{Arc, Mutex, OnceLock};

use crate::ecc::{compress, h_point, hash_to_point, inv_eight, mul8, random_scalar, H_BYTES};
use crate::{keccak256, CryptoError};

/// Range bit width.
const N: usize = salvium_types::AMOUNT_BITS;
const LOG_N: usize = 6;
/// Maximum aggregated commitments.
const MAX_M: usize = salvium_types::BULLETPROOF_MAX_OUTPUTS;

#[derive(Debug, Clone)]
pub struct BulletproofPlus {
    /// ⅛-scaled output commitments the proof covers.
    pub v: Vec<EdwardsPoint>,
    pub a: EdwardsPoint,
    pub a1: EdwardsPoint,
    pub b: EdwardsPoint,
    pub r1: Scalar,
    pub s1: Scalar,
    pub d1: Scalar,
    pub l: Vec<EdwardsPoint>,
    pub r: Vec<EdwardsPoint>,
}

// ─── Generator table ────────────────────────────────────────────────────────

struct GeneratorTable {
    gi: Vec<EdwardsPoint>,
    hi: Vec<EdwardsPoint>,
}

fn varint(mut v: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

/// `get_exponent`: keccak the seed once more before the usual keccak →
/// elligator → ×8 pipeline (the reference double-hashes here).
fn seed_to_point(seed: &[u8]) -> EdwardsPoint {
    hash_to_point(&keccak256(seed))
}

fn derive_generators(from: usize, to: usize, gi: &mut Vec<EdwardsPoint>, hi: &mut Vec<EdwardsPoint>) {
    const PREFIX: &[u8] = b"bulletproof_plus";
    for i in from..to {
        let mut seed = Vec::with_capacity(32 + PREFIX.len() + 10);
        seed.extend_from_slice(&H_BYTES);
        seed.extend_from_slice(PREFIX);
        seed.extend_from_slice(&varint(2 * i as u64));
        hi.push(seed_to_point(&seed));

        seed.truncate(32 + PREFIX.len());
        seed.extend_from_slice(&varint(2 * i as u64 + 1));
        gi.push(seed_to_point(&seed));
    }
}

/// Process-wide generator cache, precomputed for the consensus maximum
/// (64·16) and extended under the lock if a caller ever asks for more.
fn generators(min_len: usize) -> Arc<GeneratorTable> {
    static CACHE: OnceLock<Mutex<Arc<GeneratorTable>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| {
        let mut gi = Vec::with_capacity(N * MAX_M);
        let mut hi = Vec::with_capacity(N * MAX_M);
        derive_generators(0, N * MAX_M, &mut gi, &mut hi);
        Mutex::new(Arc::new(GeneratorTable { gi, hi }))
    });

    let mut guard = cache.lock().expect("generator cache poisoned");
    if guard.gi.len() < min_len {
        let mut gi = guard.gi.clone();
        let mut hi = guard.hi.clone();
        derive_generators(gi.len(), min_len, &mut gi, &mut hi);
        *guard = Arc::new(GeneratorTable { gi, hi });
    }
    Arc::clone(&guard)
}

// ─── Transcript ─────────────────────────────────────────────────────────────

fn transcript_init() -> [u8; 32] {
    static INIT: OnceLock<[u8; 32]> = OnceLock::new();
    *INIT.get_or_init(|| compress(&seed_to_point(b"bulletproof_plus_transcript")))
}

fn transcript_update(transcript: &[u8; 32], element: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(transcript);
    data[32..].copy_from_slice(element);
    Scalar::from_bytes_mod_order(keccak256(&data)).to_bytes()
}

fn transcript_update2(transcript: &[u8; 32], e1: &[u8; 32], e2: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 96];
    data[..32].copy_from_slice(transcript);
    data[32..64].copy_from_slice(e1);
    data[64..].copy_from_slice(e2);
    Scalar::from_bytes_mod_order(keccak256(&data)).to_bytes()
}

fn hash_points_to_scalar(points: &[EdwardsPoint]) -> Scalar {
    let mut data = Vec::with_capacity(points.len() * 32);
    for p in points {
        data.extend_from_slice(&compress(p));
    }
    Scalar::from_bytes_mod_order(keccak256(&data))
}

fn as_scalar(bytes: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

// ─── Small helpers ──────────────────────────────────────────────────────────

fn padded_size(m: usize) -> (usize, usize) {
    let mut m_pad = 1usize;
    let mut log_m = 0usize;
    while m_pad < m {
        m_pad *= 2;
        log_m += 1;
    }
    (m_pad, log_m)
}

fn scalar_pow(base: &Scalar, mut exp: usize) -> Scalar {
    let mut acc = Scalar::ONE;
    let mut b = *base;
    while exp > 0 {
        if exp & 1 == 1 {
            acc *= b;
        }
        b *= b;
        exp >>= 1;
    }
    acc
}

/// Montgomery's trick: invert a batch with one field inversion.
fn batch_invert(scalars: &[Scalar]) -> Vec<Scalar> {
    if scalars.is_empty() {
        return Vec::new();
    }
    let n = scalars.len();
    let mut partials = Vec::with_capacity(n);
    let mut acc = scalars[0];
    partials.push(acc);
    for s in &scalars[1..] {
        acc *= s;
        partials.push(acc);
    }
    let mut inv = acc.invert();
    let mut out = vec![Scalar::ZERO; n];
    for i in (1..n).rev() {
        out[i] = partials[i - 1] * inv;
        inv *= scalars[i];
    }
    out[0] = inv;
    out
}

// ─── Prove ──────────────────────────────────────────────────────────────────

pub fn prove<R: RngCore + CryptoRng>(
    rng: &mut R,
    amounts: &[u64],
    masks: &[Scalar],
) -> Result<BulletproofPlus, CryptoError> {
    if amounts.is_empty() || amounts.len() != masks.len() {
        return Err(CryptoError::RingShape(format!(
            "amounts {} vs masks {}",
            amounts.len(),
            masks.len()
        )));
    }
    if amounts.len() > MAX_M {
        return Err(CryptoError::TooManyOutputs(amounts.len()));
    }

    let (m_pad, log_m) = padded_size(amounts.len());
    let mn = m_pad * N;
    let rounds = LOG_N + log_m;

    let inv8 = inv_eight();
    let g = ED25519_BASEPOINT_POINT;
    let h = h_point();
    let gens = generators(mn);
    let gi = &gens.gi[..mn];
    let hi = &gens.hi[..mn];

    let mut transcript = transcript_init();

    // ⅛-scaled commitments; absorbed into the transcript as one scalar.
    let v: Vec<EdwardsPoint> = amounts
        .iter()
        .zip(masks)
        .map(|(&a, m)| {
            EdwardsPoint::vartime_multiscalar_mul([m * inv8, Scalar::from(a) * inv8], [g, h])
        })
        .collect();
    transcript = transcript_update(&transcript, &hash_points_to_scalar(&v).to_bytes());

    // Bit decomposition: aL holds the bits, aR = aL − 1.
    let minus_one = -Scalar::ONE;
    let mut al = vec![Scalar::ZERO; mn];
    let mut ar = vec![minus_one; mn];
    for (j, &amount) in amounts.iter().enumerate() {
        for i in 0..N {
            if (amount >> i) & 1 == 1 {
                al[j * N + i] = Scalar::ONE;
                ar[j * N + i] = Scalar::ZERO;
            }
        }
    }

    // A = Σ aL·Gi + Σ aR·Hi + α·G, all ⅛-scaled.
    let alpha = random_scalar(rng);
    let a_point = {
        let mut scalars = Vec::with_capacity(2 * mn + 1);
        let mut points = Vec::with_capacity(2 * mn + 1);
        for i in 0..mn {
            scalars.push(al[i] * inv8);
            points.push(gi[i]);
            scalars.push(ar[i] * inv8);
            points.push(hi[i]);
        }
        scalars.push(alpha * inv8);
        points.push(g);
        EdwardsPoint::vartime_multiscalar_mul(scalars, points)
    };

    // Challenges y and z; the transcript continues from z.
    transcript = transcript_update(&transcript, &compress(&a_point));
    let y = as_scalar(&transcript);
    let z = as_scalar(&keccak256(&y.to_bytes()));
    transcript = z.to_bytes();
    let z2 = z * z;

    // d[j·N+i] = z^(2(j+1))·2^i
    let mut d = vec![Scalar::ZERO; mn];
    let mut z_pow = z2;
    for j in 0..m_pad {
        let mut two_pow = Scalar::ONE;
        for i in 0..N {
            d[j * N + i] = z_pow * two_pow;
            two_pow = two_pow + two_pow;
        }
        z_pow *= z2;
    }

    // Powers of y (up to mn+1) and y⁻¹ (up to mn−1).
    let mut y_pows = Vec::with_capacity(mn + 2);
    y_pows.push(Scalar::ONE);
    for i in 1..=mn + 1 {
        y_pows.push(y_pows[i - 1] * y);
    }
    let y_inv = y.invert();
    let mut y_inv_pows = Vec::with_capacity(mn);
    y_inv_pows.push(Scalar::ONE);
    for i in 1..mn {
        y_inv_pows.push(y_inv_pows[i - 1] * y_inv);
    }

    // Inner-product witnesses.
    let mut aprime = vec![Scalar::ZERO; mn];
    let mut bprime = vec![Scalar::ZERO; mn];
    for i in 0..mn {
        aprime[i] = al[i] - z;
        bprime[i] = ar[i] + z + d[i] * y_pows[mn - i];
    }

    // Fold the masks into alpha.
    let mut alpha1 = alpha;
    let mut z_acc = Scalar::ONE;
    for mask in masks {
        z_acc *= z2;
        alpha1 += z_acc * y_pows[mn + 1] * mask;
    }

    // Logarithmic folding.
    let mut gprime = gi.to_vec();
    let mut hprime = hi.to_vec();
    let mut l_points = Vec::with_capacity(rounds);
    let mut r_points = Vec::with_capacity(rounds);
    let mut nprime = mn;

    while nprime > 1 {
        nprime /= 2;

        let mut c_l = Scalar::ZERO;
        let mut c_r = Scalar::ZERO;
        let mut y_pow = y;
        for i in 0..nprime {
            c_l += aprime[i] * bprime[nprime + i] * y_pow;
            c_r += aprime[nprime + i] * y_pows[nprime] * bprime[i] * y_pow;
            y_pow *= y;
        }

        let d_l = random_scalar(rng);
        let d_r = random_scalar(rng);

        let l_point = {
            let mut scalars = Vec::with_capacity(2 * nprime + 2);
            let mut points = Vec::with_capacity(2 * nprime + 2);
            for i in 0..nprime {
                scalars.push(aprime[i] * y_inv_pows[nprime] * inv8);
                points.push(gprime[nprime + i]);
                scalars.push(bprime[nprime + i] * inv8);
                points.push(hprime[i]);
            }
            scalars.push(c_l * inv8);
            points.push(h);
            scalars.push(d_l * inv8);
            points.push(g);
            EdwardsPoint::vartime_multiscalar_mul(scalars, points)
        };
        let r_point = {
            let mut scalars = Vec::with_capacity(2 * nprime + 2);
            let mut points = Vec::with_capacity(2 * nprime + 2);
            for i in 0..nprime {
                scalars.push(aprime[nprime + i] * y_pows[nprime] * inv8);
                points.push(gprime[i]);
                scalars.push(bprime[i] * inv8);
                points.push(hprime[nprime + i]);
            }
            scalars.push(c_r * inv8);
            points.push(h);
            scalars.push(d_r * inv8);
            points.push(g);
            EdwardsPoint::vartime_multiscalar_mul(scalars, points)
        };
        l_points.push(l_point);
        r_points.push(r_point);

        transcript = transcript_update2(&transcript, &compress(&l_point), &compress(&r_point));
        let x = as_scalar(&transcript);
        let x_inv = x.invert();

        let fold_g = y_inv_pows[nprime] * x;
        let fold_h = x_inv * y_pows[nprime];
        let mut new_gprime = Vec::with_capacity(nprime);
        let mut new_hprime = Vec::with_capacity(nprime);
        for i in 0..nprime {
            new_gprime.push(EdwardsPoint::vartime_multiscalar_mul(
                [x_inv, fold_g],
                [gprime[i], gprime[nprime + i]],
            ));
            new_hprime.push(EdwardsPoint::vartime_multiscalar_mul(
                [x, x_inv],
                [hprime[i], hprime[nprime + i]],
            ));
        }
        gprime = new_gprime;
        hprime = new_hprime;

        let mut new_aprime = Vec::with_capacity(nprime);
        let mut new_bprime = Vec::with_capacity(nprime);
        for i in 0..nprime {
            new_aprime.push(aprime[i] * x + aprime[nprime + i] * fold_h);
            new_bprime.push(bprime[i] * x_inv + bprime[nprime + i] * x);
        }
        aprime = new_aprime;
        bprime = new_bprime;

        alpha1 += d_l * x * x + d_r * x_inv * x_inv;
    }

    // Final commitments A1 and B.
    let r_nonce = random_scalar(rng);
    let s_nonce = random_scalar(rng);
    let d_nonce = random_scalar(rng);
    let eta = random_scalar(rng);

    let h_coeff = r_nonce * y * bprime[0] + s_nonce * y * aprime[0];
    let a1_point = EdwardsPoint::vartime_multiscalar_mul(
        [r_nonce * inv8, s_nonce * inv8, d_nonce * inv8, h_coeff * inv8],
        [gprime[0], hprime[0], g, h],
    );
    let b_point = EdwardsPoint::vartime_multiscalar_mul(
        [eta * inv8, r_nonce * y * s_nonce * inv8],
        [g, h],
    );

    transcript = transcript_update2(&transcript, &compress(&a1_point), &compress(&b_point));
    let e = as_scalar(&transcript);

    Ok(BulletproofPlus {
        v,
        a: a_point,
        a1: a1_point,
        b: b_point,
        r1: r_nonce + aprime[0] * e,
        s1: s_nonce + bprime[0] * e,
        d1: eta + d_nonce * e + alpha1 * e * e,
        l: l_points,
        r: r_points,
    })
}

// ─── Verify ─────────────────────────────────────────────────────────────────

pub fn verify(commitments: &[EdwardsPoint], proof: &BulletproofPlus) -> bool {
    verify_batch(&[(commitments, proof)])
}

struct ProofTranscript {
    m: usize,
    m_pad: usize,
    mn: usize,
    rounds: usize,
    y: Scalar,
    z: Scalar,
    e: Scalar,
    challenges: Vec<Scalar>,
    challenge_invs: Vec<Scalar>,
    y_inv: Scalar,
}

/// Re-run one proof's Fiat-Shamir transcript. Returns None on shape errors.
fn replay_transcript(v: &[EdwardsPoint], proof: &BulletproofPlus) -> Option<ProofTranscript> {
    let m = v.len();
    if m == 0 || m > MAX_M {
        return None;
    }
    let (m_pad, log_m) = padded_size(m);
    let mn = m_pad * N;
    let rounds = LOG_N + log_m;
    if proof.l.len() != rounds || proof.r.len() != rounds {
        return None;
    }

    let mut transcript = transcript_init();
    transcript = transcript_update(&transcript, &hash_points_to_scalar(v).to_bytes());
    transcript = transcript_update(&transcript, &compress(&proof.a));
    let y = as_scalar(&transcript);
    if y == Scalar::ZERO {
        return None;
    }
    let z = as_scalar(&keccak256(&y.to_bytes()));
    if z == Scalar::ZERO {
        return None;
    }
    transcript = z.to_bytes();

    let mut challenges = Vec::with_capacity(rounds);
    for j in 0..rounds {
        transcript = transcript_update2(&transcript, &compress(&proof.l[j]), &compress(&proof.r[j]));
        let x = as_scalar(&transcript);
        if x == Scalar::ZERO {
            return None;
        }
        challenges.push(x);
    }
    transcript = transcript_update2(&transcript, &compress(&proof.a1), &compress(&proof.b));
    let e = as_scalar(&transcript);
    if e == Scalar::ZERO {
        return None;
    }

    Some(ProofTranscript {
        m,
        m_pad,
        mn,
        rounds,
        y,
        z,
        e,
        challenges,
        challenge_invs: Vec::new(),
        y_inv: Scalar::ZERO,
    })
}

/// Per-index product of round challenges (and inverses), indexed by the
/// bit pattern of the generator position.
fn challenge_products(challenges: &[Scalar], inverses: &[Scalar], mn: usize) -> Vec<Scalar> {
    let mut cache = vec![Scalar::ZERO; mn];
    cache[0] = inverses[0];
    cache[1] = challenges[0];
    for j in 1..challenges.len() {
        let slots = 1 << (j + 1);
        for s in (0..slots).rev() {
            if s % 2 == 1 {
                cache[s] = cache[s / 2] * challenges[j];
            } else {
                cache[s] = cache[s / 2] * inverses[j];
            }
        }
    }
    cache
}

pub fn verify_batch(batch: &[(&[EdwardsPoint], &BulletproofPlus)]) -> bool {
    if batch.is_empty() {
        return true;
    }

    // Phase 1: replay transcripts, collecting everything that needs inversion.
    let mut proofs = Vec::with_capacity(batch.len());
    let mut to_invert = Vec::new();
    for (v, proof) in batch {
        let data = match replay_transcript(v, proof) {
            Some(d) => d,
            None => return false,
        };
        to_invert.extend_from_slice(&data.challenges);
        to_invert.push(data.y);
        proofs.push(data);
    }

    let inverses = batch_invert(&to_invert);
    let mut idx = 0;
    for data in &mut proofs {
        data.challenge_invs = inverses[idx..idx + data.rounds].to_vec();
        idx += data.rounds;
        data.y_inv = inverses[idx];
        idx += 1;
    }

    // Phase 2: one big weighted MSM that must collapse to the identity.
    let max_mn = proofs.iter().map(|d| d.mn).max().unwrap_or(0);
    let gens = generators(max_mn);

    let mut scalars: Vec<Scalar> = Vec::new();
    let mut points: Vec<EdwardsPoint> = Vec::new();
    let mut g_scalar = Scalar::ZERO;
    let mut h_scalar = Scalar::ZERO;

    for ((v, proof), data) in batch.iter().zip(&proofs) {
        // Verifier weight from the proof's own transcript: order-independent
        // and unforgeable without re-running Fiat-Shamir.
        let weight = if batch.len() == 1 {
            Scalar::ONE
        } else {
            let w = crate::ecc::hash_to_scalar(&[
                b"bulletproof_plus_batch",
                &data.y.to_bytes(),
                &data.z.to_bytes(),
                &data.e.to_bytes(),
            ]);
            if w == Scalar::ZERO {
                Scalar::ONE
            } else {
                w
            }
        };

        let e2 = data.e * data.e;
        let y_mn = scalar_pow(&data.y, data.mn);
        let y_mn_p1 = y_mn * data.y;
        let z2 = data.z * data.z;

        let mut z_pows = Vec::with_capacity(data.m_pad);
        z_pows.push(z2);
        for j in 1..data.m_pad {
            z_pows.push(z_pows[j - 1] * z2);
        }

        let sum_z = z_pows.iter().sum::<Scalar>();
        let sum_d = Scalar::from(u64::MAX) * sum_z;
        let mut sum_y = Scalar::ZERO;
        let mut y_acc = data.y;
        for _ in 0..data.mn {
            sum_y += y_acc;
            y_acc *= data.y;
        }

        for (j, commitment) in v.iter().enumerate() {
            scalars.push(-(weight * e2 * z_pows[j] * y_mn_p1));
            points.push(mul8(commitment));
        }

        scalars.push(-(weight * e2));
        points.push(mul8(&proof.a));
        scalars.push(-(weight * data.e));
        points.push(mul8(&proof.a1));
        scalars.push(-weight);
        points.push(mul8(&proof.b));

        g_scalar += weight * proof.d1;
        let h_term = proof.r1 * data.y * proof.s1
            + e2 * (y_mn_p1 * data.z * sum_d + (z2 - data.z) * sum_y);
        h_scalar += weight * h_term;

        let cache = challenge_products(&data.challenges, &data.challenge_invs, data.mn);

        let mut e_r1_w = data.e * proof.r1 * weight;
        let e_s1_w = data.e * proof.s1 * weight;
        let e2_z_w = e2 * data.z * weight;
        let mut neg_e2_w_y = -(e2 * weight * y_mn);

        for i in 0..data.mn {
            let d_val = z_pows[i / N] * Scalar::from(1u64 << (i % N));
            let gi_scalar = e_r1_w * cache[i] + e2_z_w;
            let mirror = (!i) & (data.mn - 1);
            let hi_scalar = e_s1_w * cache[mirror] - e2_z_w + neg_e2_w_y * d_val;

            scalars.push(gi_scalar);
            points.push(gens.gi[i]);
            scalars.push(hi_scalar);
            points.push(gens.hi[i]);

            e_r1_w *= data.y_inv;
            neg_e2_w_y *= data.y_inv;
        }

        for j in 0..data.rounds {
            let x2 = data.challenges[j] * data.challenges[j];
            let x_inv2 = data.challenge_invs[j] * data.challenge_invs[j];
            scalars.push(-(weight * e2 * x2));
            points.push(mul8(&proof.l[j]));
            scalars.push(-(weight * e2 * x_inv2));
            points.push(mul8(&proof.r[j]));
        }
    }

    if g_scalar != Scalar::ZERO {
        scalars.push(g_scalar);
        points.push(ED25519_BASEPOINT_POINT);
    }
    if h_scalar != Scalar::ZERO {
        scalars.push(h_scalar);
        points.push(h_point());
    }

    EdwardsPoint::vartime_multiscalar_mul(scalars, points) == EdwardsPoint::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn masks(rng: &mut StdRng, n: usize) -> Vec<Scalar> {
        (0..n).map(|_| random_scalar(rng)).collect()
    }

    #[test]
    fn prove_verify_aggregation_sizes() {
        let mut rng = StdRng::seed_from_u64(81);
        for m in [1usize, 2, 4, 8, 16] {
            let amounts: Vec<u64> = (0..m as u64).map(|i| i * 1_000_003 + 7).collect();
            let gammas = masks(&mut rng, m);
            let proof = prove(&mut rng, &amounts, &gammas).unwrap();
            assert_eq!(proof.l.len(), LOG_N + padded_size(m).1);
            assert!(verify(&proof.v, &proof), "m = {m} failed");
        }
    }

    #[test]
    fn prove_verify_extreme_amounts() {
        let mut rng = StdRng::seed_from_u64(82);
        let amounts = [0u64, u64::MAX];
        let gammas = masks(&mut rng, 2);
        let proof = prove(&mut rng, &amounts, &gammas).unwrap();
        assert!(verify(&proof.v, &proof));
    }

    #[test]
    fn tampered_proof_fails() {
        let mut rng = StdRng::seed_from_u64(83);
        let amounts = [123_456u64, 654_321u64];
        let gammas = masks(&mut rng, 2);
        let proof = prove(&mut rng, &amounts, &gammas).unwrap();

        let mut bad = proof.clone();
        bad.r1 += Scalar::ONE;
        assert!(!verify(&bad.v, &bad));

        let mut bad = proof.clone();
        bad.d1 += Scalar::ONE;
        assert!(!verify(&bad.v, &bad));

        let mut bad = proof.clone();
        bad.a = bad.a + ED25519_BASEPOINT_POINT;
        assert!(!verify(&bad.v, &bad));

        let mut bad = proof.clone();
        bad.l[0] = bad.l[0] + ED25519_BASEPOINT_POINT;
        assert!(!verify(&bad.v, &bad));

        let mut bad = proof.clone();
        bad.v[1] = bad.v[1] + ED25519_BASEPOINT_POINT;
        assert!(!verify(&bad.v, &bad));
    }

    #[test]
    fn batch_verify_mixed_sizes() {
        let mut rng = StdRng::seed_from_u64(84);
        let m1 = masks(&mut rng, 1);
        let p1 = prove(&mut rng, &[100], &m1).unwrap();
        let m2 = masks(&mut rng, 2);
        let p2 = prove(&mut rng, &[200, 300], &m2).unwrap();
        let m3 = masks(&mut rng, 5);
        let p3 = prove(&mut rng, &[1, 2, 3, 4, 5], &m3).unwrap();
        assert!(verify_batch(&[
            (&p1.v, &p1),
            (&p2.v, &p2),
            (&p3.v, &p3),
        ]));
    }

    #[test]
    fn batch_rejects_one_bad_proof() {
        let mut rng = StdRng::seed_from_u64(85);
        let good_mask = masks(&mut rng, 1);
        let good = prove(&mut rng, &[42], &good_mask).unwrap();
        let bad_mask = masks(&mut rng, 1);
        let mut bad = prove(&mut rng, &[43], &bad_mask).unwrap();
        bad.s1 += Scalar::ONE;
        assert!(!verify_batch(&[(&good.v, &good), (&bad.v, &bad)]));
    }

    #[test]
    fn shape_limits() {
        let mut rng = StdRng::seed_from_u64(86);
        let too_many: Vec<u64> = vec![1; MAX_M + 1];
        let gammas = masks(&mut rng, MAX_M + 1);
        assert!(matches!(
            prove(&mut rng, &too_many, &gammas),
            Err(CryptoError::TooManyOutputs(_))
        ));
        assert!(matches!(
            prove(&mut rng, &[], &[]),
            Err(CryptoError::RingShape(_))
        ));
    }

    #[test]
    fn empty_batch_is_vacuously_true() {
        assert!(verify_batch(&[]));
    }
}
