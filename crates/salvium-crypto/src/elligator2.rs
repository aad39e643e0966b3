//! The CryptoNote Elligator-2 map: 32-byte field element → curve point.
//!
//! Port of `ge_fromfe_frombytes_vartime` from the reference crypto-ops.c.
//! The output is NOT cofactor-cleared; `ecc::hash_to_point` multiplies by 8.
//!
//! curve25519-dalek does not expose its field type, so the mod-p arithmetic
//! (p = 2²⁵⁵ − 19) lives here on 4×u64 limbs. All of it is variable-time,
//! which is fine: inputs are public hashes.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use std::sync::OnceLock;

/// Field element mod p = 2²⁵⁵ − 19, little-endian u64 limbs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Fe([u64; 4]);

const P: Fe = Fe([
    0xFFFF_FFFF_FFFF_FFED,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// Montgomery curve coefficient A = 486662.
const A: Fe = Fe([486662, 0, 0, 0]);

impl Fe {
    const ZERO: Fe = Fe([0, 0, 0, 0]);
    const ONE: Fe = Fe([1, 0, 0, 0]);

    fn from_bytes(bytes: &[u8; 32]) -> Fe {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            *limb = u64::from_le_bytes(chunk);
        }
        Fe(limbs).reduced()
    }

    fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    fn is_zero(self) -> bool {
        self.0 == [0; 4]
    }

    fn is_odd(self) -> bool {
        self.0[0] & 1 == 1
    }

    fn geq(self, other: &Fe) -> bool {
        for i in (0..4).rev() {
            if self.0[i] != other.0[i] {
                return self.0[i] > other.0[i];
            }
        }
        true
    }

    fn add_raw(self, other: &Fe) -> (Fe, bool) {
        let mut limbs = [0u64; 4];
        let mut carry = 0u128;
        for i in 0..4 {
            let sum = self.0[i] as u128 + other.0[i] as u128 + carry;
            limbs[i] = sum as u64;
            carry = sum >> 64;
        }
        (Fe(limbs), carry != 0)
    }

    fn sub_raw(self, other: &Fe) -> Fe {
        let mut limbs = [0u64; 4];
        let mut borrow = 0u64;
        for i in 0..4 {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow);
            limbs[i] = d2;
            borrow = (b1 as u64) + (b2 as u64);
        }
        Fe(limbs)
    }

    fn reduced(self) -> Fe {
        let mut r = self;
        while r.geq(&P) {
            r = r.sub_raw(&P);
        }
        r
    }

    fn add(self, other: &Fe) -> Fe {
        // Both operands < p < 2²⁵⁵, so the raw sum never carries out.
        let (sum, _) = self.add_raw(other);
        sum.reduced()
    }

    fn sub(self, other: &Fe) -> Fe {
        if self.geq(other) {
            self.sub_raw(other)
        } else {
            let (lifted, _) = self.add_raw(&P);
            lifted.sub_raw(other).reduced()
        }
    }

    fn neg(self) -> Fe {
        if self.is_zero() {
            Fe::ZERO
        } else {
            P.sub_raw(&self)
        }
    }

    fn mul(self, other: &Fe) -> Fe {
        // Schoolbook 256×256 → 512, then fold twice using 2²⁵⁶ ≡ 38 (mod p).
        let mut prod = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let t = self.0[i] as u128 * other.0[j] as u128 + prod[i + j] as u128 + carry;
                prod[i + j] = t as u64;
                carry = t >> 64;
            }
            prod[i + 4] = carry as u64;
        }

        let lo = Fe([prod[0], prod[1], prod[2], prod[3]]);
        let hi = Fe([prod[4], prod[5], prod[6], prod[7]]);
        let (folded, carried) = lo.add_raw(&hi.mul_small(38));
        let folded = if carried {
            let (f, _) = folded.add_raw(&Fe([38, 0, 0, 0]));
            f
        } else {
            folded
        };
        folded.reduced()
    }

    fn mul_small(self, k: u64) -> Fe {
        let mut limbs = [0u64; 4];
        let mut carry = 0u128;
        for i in 0..4 {
            let t = self.0[i] as u128 * k as u128 + carry;
            limbs[i] = t as u64;
            carry = t >> 64;
        }
        let mut r = Fe(limbs);
        if carry > 0 {
            let (f, _) = r.add_raw(&Fe([carry as u64 * 38, 0, 0, 0]));
            r = f;
        }
        r.reduced()
    }

    fn square(self) -> Fe {
        self.mul(&self)
    }

    fn pow(self, exp: &Fe) -> Fe {
        let mut acc = Fe::ONE;
        let mut base = self;
        for limb in exp.0 {
            let mut bits = limb;
            for _ in 0..64 {
                if bits & 1 == 1 {
                    acc = acc.mul(&base);
                }
                base = base.square();
                bits >>= 1;
            }
        }
        acc
    }

    /// a⁻¹ = a^(p−2).
    fn invert(self) -> Fe {
        const P_MINUS_2: Fe = Fe([
            0xFFFF_FFFF_FFFF_FFEB,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x7FFF_FFFF_FFFF_FFFF,
        ]);
        self.pow(&P_MINUS_2)
    }

    /// x^((p−5)/8) = x^(2²⁵² − 3).
    fn pow_p58(self) -> Fe {
        const EXP: Fe = Fe([
            0xFFFF_FFFF_FFFF_FFFD,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ]);
        self.pow(&EXP)
    }

    /// Square root when one exists: candidate a^((p+3)/8), corrected by
    /// √−1 when the candidate squares to −a.
    fn sqrt(self) -> Option<Fe> {
        if self.is_zero() {
            return Some(Fe::ZERO);
        }
        const EXP: Fe = Fe([
            0xFFFF_FFFF_FFFF_FFFE,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ]);
        let candidate = self.pow(&EXP);
        if candidate.square() == self {
            return Some(candidate);
        }
        let adjusted = candidate.mul(&sqrt_m1());
        if adjusted.square() == self {
            return Some(adjusted);
        }
        None
    }
}

/// √−1 mod p.
fn sqrt_m1() -> Fe {
    Fe::from_bytes(&[
        0xb0, 0xa0, 0x0e, 0x4a, 0x27, 0x1b, 0xee, 0xc4,
        0x78, 0xe4, 0x2f, 0xad, 0x06, 0x18, 0x43, 0x2f,
        0xa7, 0xd7, 0xfb, 0x3d, 0x99, 0x00, 0x4d, 0x2b,
        0x0b, 0xdf, 0xc1, 0x4f, 0x80, 0x24, 0x83, 0x2b,
    ])
}

/// The four fixed roots the reference implementation calls fe_fffb1..4:
/// (±2·A·(A+2))^½ and (±√−1·A·(A+2))^½.
struct BranchRoots {
    fffb1: Fe,
    fffb2: Fe,
    fffb3: Fe,
    fffb4: Fe,
}

fn branch_roots() -> &'static BranchRoots {
    static ROOTS: OnceLock<BranchRoots> = OnceLock::new();
    ROOTS.get_or_init(|| {
        let a_ap2 = A.mul(&A.add(&Fe([2, 0, 0, 0])));
        let two_a_ap2 = a_ap2.add(&a_ap2);
        let sqm1_a_ap2 = sqrt_m1().mul(&a_ap2);
        BranchRoots {
            fffb1: two_a_ap2.neg().sqrt().expect("-2A(A+2) is a square"),
            fffb2: two_a_ap2.sqrt().expect("2A(A+2) is a square"),
            fffb3: sqm1_a_ap2.neg().sqrt().expect("-sqrt(-1)A(A+2) is a square"),
            fffb4: sqm1_a_ap2.sqrt().expect("sqrt(-1)A(A+2) is a square"),
        }
    })
}

/// The Elligator-2 map. Input is a 32-byte hash, loaded little-endian and
/// reduced mod p; output is a point on the curve (not cofactor-cleared).
pub fn ge_fromfe_frombytes_vartime(hash: &[u8; 32]) -> EdwardsPoint {
    let roots = branch_roots();
    let u = Fe::from_bytes(hash);

    // v = 2u², w = 2u² + 1, x = w² − 2A²u²
    let u2 = u.square();
    let v = u2.add(&u2);
    let w = v.add(&Fe::ONE);
    let neg_2a2_u2 = A.square().mul(&v).neg();
    let mut x = w.square().add(&neg_2a2_u2);

    // r_x = (w/x)^((p+3)/8) via w·x³·(w·x⁷)^((p−5)/8)
    let x2 = x.square();
    let x3 = x2.mul(&x);
    let x7 = x2.square().mul(&x3);
    let mut r_x = w.mul(&x3).mul(&w.mul(&x7).pow_p58());

    let mut y = r_x.square().mul(&x);
    let mut z = A.neg();
    let sign;

    if w.sub(&y).is_zero() {
        // y == w: the positive branch with the 2A(A+2) root.
        r_x = r_x.mul(&roots.fffb2).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else if w.add(&y).is_zero() {
        // y == -w
        r_x = r_x.mul(&roots.fffb1).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else {
        // Negative branch: twist x by sqrt(-1) and retry.
        x = x.mul(&sqrt_m1());
        y = r_x.square().mul(&x);
        if w.sub(&y).is_zero() {
            r_x = r_x.mul(&roots.fffb4);
        } else {
            r_x = r_x.mul(&roots.fffb3);
        }
        // z stays -A
        sign = true;
    }

    if r_x.is_odd() != sign {
        r_x = r_x.neg();
    }

    // Projective (X : Y : Z) = (r_x·(z+w) : z−w : z+w), then compress the
    // affine point in the Ed25519 sign-bit format dalek understands.
    let z_coord = z.add(&w);
    let y_coord = z.sub(&w);
    let z_inv = z_coord.invert();
    let affine_x = r_x; // X/Z = r_x·Z/Z
    let affine_y = y_coord.mul(&z_inv);

    let mut compressed = affine_y.to_bytes();
    if affine_x.is_odd() {
        compressed[31] |= 0x80;
    }
    CompressedEdwardsY(compressed)
        .decompress()
        .expect("elligator2 output lies on the curve")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fe_add_sub_round_trip() {
        let a = Fe::from_bytes(&[0x11; 32]);
        let b = Fe::from_bytes(&[0x07; 32]);
        assert_eq!(a.add(&b).sub(&b), a);
        assert_eq!(a.sub(&b).add(&b), a);
    }

    #[test]
    fn fe_mul_inverse() {
        let a = Fe::from_bytes(&[0x35; 32]);
        assert_eq!(a.mul(&a.invert()), Fe::ONE);
    }

    #[test]
    fn fe_neg_is_additive_inverse() {
        let a = Fe::from_bytes(&[0x42; 32]);
        assert!(a.add(&a.neg()).is_zero());
        assert_eq!(Fe::ZERO.neg(), Fe::ZERO);
    }

    #[test]
    fn sqrt_m1_squares_to_minus_one() {
        assert_eq!(sqrt_m1().square(), Fe::ONE.neg());
    }

    #[test]
    fn branch_roots_square_back() {
        let roots = branch_roots();
        let a_ap2 = A.mul(&A.add(&Fe([2, 0, 0, 0])));
        let two = a_ap2.add(&a_ap2);
        assert_eq!(roots.fffb2.square(), two);
        assert_eq!(roots.fffb1.square(), two.neg());
        assert_eq!(roots.fffb4.square(), sqrt_m1().mul(&a_ap2));
        assert_eq!(roots.fffb3.square(), sqrt_m1().mul(&a_ap2).neg());
    }

    #[test]
    fn map_is_deterministic_and_on_curve() {
        let p1 = ge_fromfe_frombytes_vartime(&[0x01; 32]);
        let p2 = ge_fromfe_frombytes_vartime(&[0x01; 32]);
        assert_eq!(p1, p2);
        // Distinct inputs land on distinct points.
        let q = ge_fromfe_frombytes_vartime(&[0x02; 32]);
        assert_ne!(p1, q);
    }

    #[test]
    fn map_of_zero_is_defined() {
        // u = 0 hits the y == w branch; must not panic.
        let _ = ge_fromfe_frombytes_vartime(&[0u8; 32]);
    }
}
