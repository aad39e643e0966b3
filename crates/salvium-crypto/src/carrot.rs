//! CARROT enote derivation: the post-fork addressing/output scheme.
//!
//! Covers the account key hierarchy, the sender-side enote pipeline
//! (ephemeral keys, contextualized shared secret, one-time extensions over
//! G and T, 3-byte view tags, anchor/amount/payment-id encryption, special
//! self-send anchors) and the receiver-side scan.
//!
//! Every hash is a keyed Blake2b over a fixed transcript
//! `[domain_len] ‖ domain ‖ data…`, with the relevant secret as the key.

use curve25519_dalek::constants::X25519_BASEPOINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand::{CryptoRng, RngCore};

use crate::commitment::commit;
use crate::ecc::{compress, decompress, g_point, scalar_mult_base, t_point};
use crate::{blake2b, blake2b_keyed, CryptoError};

// ─── Domain separators (config.h) ───────────────────────────────────────────

const DOMAIN_PROVE_SPEND_KEY: &[u8] = b"Carrot prove-spend key";
const DOMAIN_VIEW_BALANCE_SECRET: &[u8] = b"Carrot view-balance secret";
const DOMAIN_GENERATE_IMAGE_KEY: &[u8] = b"Carrot generate-image key";
const DOMAIN_INCOMING_VIEW_KEY: &[u8] = b"Carrot incoming view key";
const DOMAIN_GENERATE_ADDRESS_SECRET: &[u8] = b"Carrot generate-address secret";

const DOMAIN_EPHEMERAL_PRIVKEY: &[u8] = b"Carrot sending key normal";
const DOMAIN_SENDER_RECEIVER_SECRET: &[u8] = b"Carrot sender-receiver secret";
const DOMAIN_VIEW_TAG: &[u8] = b"Carrot view tag";
const DOMAIN_COMMITMENT_MASK: &[u8] = b"Carrot commitment mask";
const DOMAIN_EXTENSION_G: &[u8] = b"Carrot key extension G";
const DOMAIN_EXTENSION_T: &[u8] = b"Carrot key extension T";
const DOMAIN_ENCRYPTION_MASK_ANCHOR: &[u8] = b"Carrot encryption mask anchor";
const DOMAIN_ENCRYPTION_MASK_AMOUNT: &[u8] = b"Carrot encryption mask a";
const DOMAIN_ENCRYPTION_MASK_PAYMENT_ID: &[u8] = b"Carrot encryption mask pid";
const DOMAIN_SPECIAL_ANCHOR: &[u8] = b"Carrot janus anchor special";

/// Input-context prefix bytes.
const CONTEXT_RINGCT: u8 = b'R';
const CONTEXT_COINBASE: u8 = b'C';

// ─── Transcript + hash helpers ──────────────────────────────────────────────

/// `[domain_len] ‖ domain ‖ data…` (SpFixedTranscript).
fn transcript(domain: &[u8], data: &[&[u8]]) -> Vec<u8> {
    let total = 1 + domain.len() + data.iter().map(|d| d.len()).sum::<usize>();
    let mut buf = Vec::with_capacity(total);
    buf.push(domain.len() as u8);
    buf.extend_from_slice(domain);
    for d in data {
        buf.extend_from_slice(d);
    }
    buf
}

/// `H_32`: keyed Blake2b, 32-byte output.
fn hash_32(domain: &[u8], data: &[&[u8]], key: &[u8]) -> [u8; 32] {
    let t = transcript(domain, data);
    let h = if key.is_empty() { blake2b(&t, 32) } else { blake2b_keyed(&t, 32, key) };
    let mut out = [0u8; 32];
    out.copy_from_slice(&h);
    out
}

/// `H_n`: keyed Blake2b, 64-byte output, wide-reduced to a scalar.
fn hash_scalar(domain: &[u8], data: &[&[u8]], key: &[u8]) -> Scalar {
    let t = transcript(domain, data);
    let h = if key.is_empty() { blake2b(&t, 64) } else { blake2b_keyed(&t, 64, key) };
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&h);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Short keyed Blake2b for XOR keystreams and tags.
fn hash_n<const N: usize>(domain: &[u8], data: &[&[u8]], key: &[u8]) -> [u8; N] {
    let t = transcript(domain, data);
    let h = blake2b_keyed(&t, N, key);
    let mut out = [0u8; N];
    out.copy_from_slice(&h);
    out
}

// ─── Account key hierarchy ──────────────────────────────────────────────────

/// The CARROT account keys derived from a 32-byte master secret.
#[derive(Clone)]
pub struct AccountKeys {
    /// `k_ps`, the prove-spend scalar over T.
    pub prove_spend_key: Scalar,
    /// `s_vb`, root of all view-side derivations.
    pub view_balance_secret: [u8; 32],
    /// `k_gi`, the generate-image scalar over G.
    pub generate_image_key: Scalar,
    /// `k_vi`, the incoming view key.
    pub view_incoming_key: Scalar,
    /// `s_ga`, used for subaddress index derivation.
    pub generate_address_secret: [u8; 32],
    /// `K_s = k_gi·G + k_ps·T`.
    pub account_spend_pubkey: [u8; 32],
    /// `K^0_v = k_vi·G`, the main-address view pubkey.
    pub primary_view_pubkey: [u8; 32],
    /// `K_v = k_vi·K_s`, used for subaddress view keys.
    pub account_view_pubkey: [u8; 32],
}

/// Derive the full account hierarchy from the master secret.
pub fn derive_account_keys(master_secret: &[u8; 32]) -> AccountKeys {
    let prove_spend_key = hash_scalar(DOMAIN_PROVE_SPEND_KEY, &[], master_secret);
    let view_balance_secret = hash_32(DOMAIN_VIEW_BALANCE_SECRET, &[], master_secret);
    let generate_image_key = hash_scalar(DOMAIN_GENERATE_IMAGE_KEY, &[], &view_balance_secret);
    let view_incoming_key = hash_scalar(DOMAIN_INCOMING_VIEW_KEY, &[], &view_balance_secret);
    let generate_address_secret =
        hash_32(DOMAIN_GENERATE_ADDRESS_SECRET, &[], &view_balance_secret);

    let account_spend = EdwardsPoint::vartime_multiscalar_mul(
        [generate_image_key, prove_spend_key],
        [g_point(), t_point()],
    );
    let primary_view = scalar_mult_base(&view_incoming_key);
    let account_view = view_incoming_key * account_spend;

    AccountKeys {
        prove_spend_key,
        view_balance_secret,
        generate_image_key,
        view_incoming_key,
        generate_address_secret,
        account_spend_pubkey: compress(&account_spend),
        primary_view_pubkey: compress(&primary_view),
        account_view_pubkey: compress(&account_view),
    }
}

// ─── Input context ──────────────────────────────────────────────────────────

/// 33-byte context for RingCT transactions: `'R' ‖ first_key_image`.
pub fn input_context_rct(first_key_image: &[u8; 32]) -> [u8; 33] {
    let mut ctx = [0u8; 33];
    ctx[0] = CONTEXT_RINGCT;
    ctx[1..].copy_from_slice(first_key_image);
    ctx
}

/// 33-byte context for coinbase outputs: `'C' ‖ height_le ‖ zeros`.
pub fn input_context_coinbase(block_height: u64) -> [u8; 33] {
    let mut ctx = [0u8; 33];
    ctx[0] = CONTEXT_COINBASE;
    ctx[1..9].copy_from_slice(&block_height.to_le_bytes());
    ctx
}

// ─── Enote types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnoteType {
    Payment = 0,
    Change = 1,
    SelfSpend = 2,
}

impl EnoteType {
    fn all() -> [EnoteType; 3] {
        [Self::Payment, Self::Change, Self::SelfSpend]
    }
}

/// Address a CARROT enote is sent to.
#[derive(Debug, Clone)]
pub struct CarrotDestination {
    pub spend_pubkey: [u8; 32],
    pub view_pubkey: [u8; 32],
    pub is_subaddress: bool,
    pub payment_id: [u8; 8],
}

/// A fully derived CARROT enote, ready for the transaction builder.
#[derive(Debug, Clone)]
pub struct CarrotEnote {
    /// `K_o = K_s + k_g·G + k_t·T`.
    pub onetime_address: [u8; 32],
    /// `C_a = k_a·G + a·H`.
    pub amount_commitment: [u8; 32],
    /// The blinding factor `k_a`, kept by the sender for balancing.
    pub amount_blinding: Scalar,
    pub encrypted_amount: [u8; 8],
    pub view_tag: [u8; 3],
    pub encrypted_anchor: [u8; 16],
    pub encrypted_payment_id: [u8; 8],
    /// `D_e`, the X25519 ephemeral pubkey shared via tx-extra.
    pub ephemeral_pubkey: [u8; 32],
    /// `s_ctx`, the contextualized sender-receiver secret. Kept by the
    /// sender as the per-output amount key; never serialized.
    pub shared_secret: [u8; 32],
}

/// The per-transaction ephemeral key pair `(d_e, D_e)`. One is derived
/// from the first destination and shared by every output.
#[derive(Clone)]
pub struct EphemeralKey {
    pub secret: Scalar,
    pub pubkey: [u8; 32],
}

/// Derive `d_e` from an anchor and the first destination, and `D_e` from
/// the destination kind (X25519 base vs subaddress spend key).
pub fn derive_ephemeral_key(
    anchor: &[u8; 16],
    input_context: &[u8; 33],
    destination: &CarrotDestination,
) -> Result<EphemeralKey, CryptoError> {
    let secret = hash_scalar(
        DOMAIN_EPHEMERAL_PRIVKEY,
        &[
            anchor,
            input_context,
            &destination.spend_pubkey,
            &destination.payment_id,
        ],
        &[],
    );
    let pubkey = if destination.is_subaddress {
        x25519(&secret, &convert_point_e(&destination.spend_pubkey)?)
    } else {
        x25519(&secret, &X25519_BASEPOINT)
    };
    Ok(EphemeralKey { secret, pubkey })
}

// ─── X25519 plumbing ────────────────────────────────────────────────────────

/// Edwards pubkey → Montgomery u-coordinate (the CARROT `ConvertPointE`).
fn convert_point_e(edwards_bytes: &[u8; 32]) -> Result<MontgomeryPoint, CryptoError> {
    Ok(decompress(edwards_bytes)?.to_montgomery())
}

fn x25519(scalar: &Scalar, point: &MontgomeryPoint) -> [u8; 32] {
    (point * scalar).to_bytes()
}

// ─── Sender side ────────────────────────────────────────────────────────────

/// Fresh 16-byte janus anchor.
pub fn random_anchor<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 16] {
    let mut anchor = [0u8; 16];
    rng.fill_bytes(&mut anchor);
    anchor
}

/// Build one CARROT enote.
///
/// Normal sends derive everything from a random `anchor`. When
/// `special_view_key` is supplied (self-sends: the change output of a
/// transaction the wallet signs itself), the broadcast anchor is replaced
/// by the special anchor bound to the view-incoming key, letting the
/// receiver recognize its own change without the full wallet.
pub fn build_enote(
    destination: &CarrotDestination,
    amount: u64,
    input_context: &[u8; 33],
    enote_type: EnoteType,
    anchor: [u8; 16],
    special_view_key: Option<&Scalar>,
) -> Result<CarrotEnote, CryptoError> {
    let ephemeral = derive_ephemeral_key(&anchor, input_context, destination)?;
    build_enote_with_ephemeral(
        &ephemeral,
        destination,
        amount,
        input_context,
        enote_type,
        anchor,
        special_view_key,
    )
}

/// Build an enote under an already-derived ephemeral key. Transactions
/// carry a single `D_e`, so every output after the first reuses the key
/// pair derived from the first destination.
#[allow(clippy::too_many_arguments)]
pub fn build_enote_with_ephemeral(
    ephemeral: &EphemeralKey,
    destination: &CarrotDestination,
    amount: u64,
    input_context: &[u8; 33],
    enote_type: EnoteType,
    anchor: [u8; 16],
    special_view_key: Option<&Scalar>,
) -> Result<CarrotEnote, CryptoError> {
    let k_s = &destination.spend_pubkey;
    let k_s_point = decompress(k_s)?;
    let d_e_pub = ephemeral.pubkey;

    // s_sr = d_e · ConvertPointE(K_v), then contextualized.
    let s_sr = x25519(&ephemeral.secret, &convert_point_e(&destination.view_pubkey)?);
    let s_ctx = hash_32(
        DOMAIN_SENDER_RECEIVER_SECRET,
        &[&d_e_pub, input_context],
        &s_sr,
    );

    let (enote, _extensions) = derive_enote_body(
        &s_ctx, &s_sr, k_s, &k_s_point, amount, enote_type, input_context, &d_e_pub,
    );

    // Encrypt the anchor: the special one for self-sends, the random one
    // otherwise. The keystream is bound to K_o so every output differs.
    let clear_anchor = match special_view_key {
        Some(k_vi) => special_anchor(&d_e_pub, input_context, &enote.onetime_address, k_vi),
        None => anchor,
    };
    let anchor_mask: [u8; 16] = hash_n(
        DOMAIN_ENCRYPTION_MASK_ANCHOR,
        &[&enote.onetime_address],
        &s_ctx,
    );
    let mut encrypted_anchor = [0u8; 16];
    for i in 0..16 {
        encrypted_anchor[i] = clear_anchor[i] ^ anchor_mask[i];
    }

    let pid_mask: [u8; 8] = hash_n(
        DOMAIN_ENCRYPTION_MASK_PAYMENT_ID,
        &[&enote.onetime_address],
        &s_ctx,
    );
    let mut encrypted_payment_id = [0u8; 8];
    for i in 0..8 {
        encrypted_payment_id[i] = destination.payment_id[i] ^ pid_mask[i];
    }

    Ok(CarrotEnote {
        encrypted_anchor,
        encrypted_payment_id,
        ..enote
    })
}

/// Everything derivable from `s_ctx` alone.
#[allow(clippy::too_many_arguments)]
fn derive_enote_body(
    s_ctx: &[u8; 32],
    s_sr: &[u8; 32],
    k_s: &[u8; 32],
    k_s_point: &EdwardsPoint,
    amount: u64,
    enote_type: EnoteType,
    input_context: &[u8; 33],
    d_e_pub: &[u8; 32],
) -> (CarrotEnote, (Scalar, Scalar)) {
    // k_a = H_n("commitment mask", amount ‖ K_s ‖ type)
    let amount_le = amount.to_le_bytes();
    let type_byte = [enote_type as u8];
    let amount_blinding = hash_scalar(
        DOMAIN_COMMITMENT_MASK,
        &[&amount_le, k_s, &type_byte],
        s_ctx,
    );
    let amount_commitment = compress(&commit(amount, &amount_blinding));

    // One-time extensions over both generators.
    let k_g = hash_scalar(DOMAIN_EXTENSION_G, &[&amount_commitment], s_ctx);
    let k_t = hash_scalar(DOMAIN_EXTENSION_T, &[&amount_commitment], s_ctx);
    let ext = EdwardsPoint::vartime_multiscalar_mul([k_g, k_t], [g_point(), t_point()]);
    let onetime_address = compress(&(k_s_point + ext));

    // 3-byte view tag, keyed by the *uncontextualized* secret.
    let view_tag: [u8; 3] = hash_n(
        DOMAIN_VIEW_TAG,
        &[input_context, &onetime_address],
        s_sr,
    );

    let amount_mask: [u8; 8] = hash_n(
        DOMAIN_ENCRYPTION_MASK_AMOUNT,
        &[&onetime_address],
        s_ctx,
    );
    let mut encrypted_amount = [0u8; 8];
    for i in 0..8 {
        encrypted_amount[i] = amount_le[i] ^ amount_mask[i];
    }

    (
        CarrotEnote {
            onetime_address,
            amount_commitment,
            amount_blinding,
            encrypted_amount,
            view_tag,
            encrypted_anchor: [0u8; 16],
            encrypted_payment_id: [0u8; 8],
            ephemeral_pubkey: *d_e_pub,
            shared_secret: *s_ctx,
        },
        (k_g, k_t),
    )
}

/// Self-send anchor: `H_16("janus anchor special", D_e ‖ ctx ‖ K_o)` keyed
/// by the view-incoming key.
pub fn special_anchor(
    d_e_pub: &[u8; 32],
    input_context: &[u8; 33],
    onetime_address: &[u8; 32],
    view_incoming_key: &Scalar,
) -> [u8; 16] {
    hash_n(
        DOMAIN_SPECIAL_ANCHOR,
        &[d_e_pub, input_context, onetime_address],
        &view_incoming_key.to_bytes(),
    )
}

// ─── Receiver side ──────────────────────────────────────────────────────────

/// Wire fields of a received CARROT enote.
#[derive(Debug, Clone)]
pub struct ReceivedEnote {
    pub onetime_address: [u8; 32],
    pub amount_commitment: [u8; 32],
    pub encrypted_amount: [u8; 8],
    pub view_tag: [u8; 3],
    pub encrypted_anchor: [u8; 16],
    pub encrypted_payment_id: Option<[u8; 8]>,
    /// `D_e` from tx-extra.
    pub ephemeral_pubkey: [u8; 32],
}

/// Successful scan: the enote is ours.
#[derive(Debug, Clone)]
pub struct CarrotScanResult {
    pub amount: u64,
    pub amount_blinding: Scalar,
    pub enote_type: EnoteType,
    pub payment_id: [u8; 8],
    /// The address-level spend pubkey the enote pays (for subaddress lookup).
    pub address_spend_pubkey: [u8; 32],
    /// `s_ctx`, needed later to derive the one-time spend keys.
    pub shared_secret: [u8; 32],
}

/// Scan one enote with the incoming view key.
///
/// Returns `None` on any mismatch: wrong view tag, commitment that opens
/// to none of the enote types, one-time address not built on `K_s`, or a
/// failed janus check (neither the normal anchor re-derivation nor the
/// special anchor matches).
pub fn scan_enote(
    enote: &ReceivedEnote,
    input_context: &[u8; 33],
    view_incoming_key: &Scalar,
    account_spend_pubkey: &[u8; 32],
) -> Option<CarrotScanResult> {
    // s_sr from our side of the ECDH.
    let d_e_point = MontgomeryPoint(enote.ephemeral_pubkey);
    let s_sr = x25519(view_incoming_key, &d_e_point);

    // View-tag fast reject.
    let expected_tag: [u8; 3] = hash_n(
        DOMAIN_VIEW_TAG,
        &[input_context, &enote.onetime_address],
        &s_sr,
    );
    if expected_tag != enote.view_tag {
        return None;
    }

    let s_ctx = hash_32(
        DOMAIN_SENDER_RECEIVER_SECRET,
        &[&enote.ephemeral_pubkey, input_context],
        &s_sr,
    );

    // Decrypt the amount.
    let amount_mask: [u8; 8] = hash_n(
        DOMAIN_ENCRYPTION_MASK_AMOUNT,
        &[&enote.onetime_address],
        &s_ctx,
    );
    let mut clear = [0u8; 8];
    for i in 0..8 {
        clear[i] = enote.encrypted_amount[i] ^ amount_mask[i];
    }
    let amount = u64::from_le_bytes(clear);

    // The commitment doubles as a checksum over (amount, enote type).
    let amount_le = amount.to_le_bytes();
    let mut matched: Option<(EnoteType, Scalar)> = None;
    for ty in EnoteType::all() {
        let type_byte = [ty as u8];
        let mask = hash_scalar(
            DOMAIN_COMMITMENT_MASK,
            &[&amount_le, account_spend_pubkey, &type_byte],
            &s_ctx,
        );
        if compress(&commit(amount, &mask)) == enote.amount_commitment {
            matched = Some((ty, mask));
            break;
        }
    }
    let (enote_type, amount_blinding) = matched?;

    // Reverse the one-time extensions to find the paid address.
    let k_g = hash_scalar(DOMAIN_EXTENSION_G, &[&enote.amount_commitment], &s_ctx);
    let k_t = hash_scalar(DOMAIN_EXTENSION_T, &[&enote.amount_commitment], &s_ctx);
    let ko_point = decompress(&enote.onetime_address).ok()?;
    let ext = EdwardsPoint::vartime_multiscalar_mul([k_g, k_t], [g_point(), t_point()]);
    let address_spend_pubkey = compress(&(ko_point - ext));
    if address_spend_pubkey != *account_spend_pubkey {
        return None;
    }

    // Decrypt the anchor and payment id.
    let anchor_mask: [u8; 16] = hash_n(
        DOMAIN_ENCRYPTION_MASK_ANCHOR,
        &[&enote.onetime_address],
        &s_ctx,
    );
    let mut anchor = [0u8; 16];
    for i in 0..16 {
        anchor[i] = enote.encrypted_anchor[i] ^ anchor_mask[i];
    }

    let mut payment_id = [0u8; 8];
    if let Some(enc_pid) = enote.encrypted_payment_id {
        let pid_mask: [u8; 8] = hash_n(
            DOMAIN_ENCRYPTION_MASK_PAYMENT_ID,
            &[&enote.onetime_address],
            &s_ctx,
        );
        for i in 0..8 {
            payment_id[i] = enc_pid[i] ^ pid_mask[i];
        }
    }

    // Janus protection: the anchor must re-derive D_e, or be the special
    // self-send anchor.
    let janus_ok = verify_normal_anchor(
        &anchor,
        input_context,
        &address_spend_pubkey,
        &payment_id,
        &enote.ephemeral_pubkey,
    ) || anchor
        == special_anchor(
            &enote.ephemeral_pubkey,
            input_context,
            &enote.onetime_address,
            view_incoming_key,
        );
    if !janus_ok {
        return None;
    }

    Some(CarrotScanResult {
        amount,
        amount_blinding,
        enote_type,
        payment_id,
        address_spend_pubkey,
        shared_secret: s_ctx,
    })
}

/// Re-derive `d_e` from a decrypted anchor and check it reproduces `D_e`
/// against either the main-address base or the subaddress spend key.
fn verify_normal_anchor(
    anchor: &[u8; 16],
    input_context: &[u8; 33],
    address_spend_pubkey: &[u8; 32],
    payment_id: &[u8; 8],
    d_e_pub: &[u8; 32],
) -> bool {
    let d_e = hash_scalar(
        DOMAIN_EPHEMERAL_PRIVKEY,
        &[anchor, input_context, address_spend_pubkey, payment_id],
        &[],
    );
    if x25519(&d_e, &X25519_BASEPOINT) == *d_e_pub {
        return true;
    }
    match convert_point_e(address_spend_pubkey) {
        Ok(mont) => x25519(&d_e, &mont) == *d_e_pub,
        Err(_) => false,
    }
}

/// The spend secret of a received enote for the TCLSAG twin key:
/// `x = k_gi + k_g`, `y = k_ps + k_t`. Exposed for the signer.
pub fn onetime_secret_keys(
    account: &AccountKeys,
    amount_commitment: &[u8; 32],
    s_ctx: &[u8; 32],
) -> (Scalar, Scalar) {
    let k_g = hash_scalar(DOMAIN_EXTENSION_G, &[amount_commitment], s_ctx);
    let k_t = hash_scalar(DOMAIN_EXTENSION_T, &[amount_commitment], s_ctx);
    (account.generate_image_key + k_g, account.prove_spend_key + k_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_account(seed: u8) -> AccountKeys {
        derive_account_keys(&[seed; 32])
    }

    #[test]
    fn account_keys_deterministic_and_distinct() {
        let a = test_account(0x42);
        let b = test_account(0x42);
        assert_eq!(a.account_spend_pubkey, b.account_spend_pubkey);
        assert_eq!(a.view_incoming_key, b.view_incoming_key);
        assert_ne!(a.account_spend_pubkey, a.primary_view_pubkey);
        assert_ne!(a.prove_spend_key, a.generate_image_key);
    }

    #[test]
    fn input_context_layout() {
        let ctx = input_context_rct(&[0xAA; 32]);
        assert_eq!(ctx[0], b'R');
        assert_eq!(&ctx[1..], &[0xAA; 32]);

        let ctx = input_context_coinbase(12_345);
        assert_eq!(ctx[0], b'C');
        assert_eq!(u64::from_le_bytes(ctx[1..9].try_into().unwrap()), 12_345);
        assert!(ctx[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn enote_round_trip_payment() {
        let mut rng = StdRng::seed_from_u64(51);
        let receiver = test_account(0x10);
        let dest = CarrotDestination {
            spend_pubkey: receiver.account_spend_pubkey,
            view_pubkey: receiver.primary_view_pubkey,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        let ctx = input_context_rct(&[0x77; 32]);
        let anchor = random_anchor(&mut rng);
        let enote = build_enote(&dest, 1_000_000_007, &ctx, EnoteType::Payment, anchor, None)
            .unwrap();

        assert_eq!(enote.view_tag.len(), 3);

        let received = ReceivedEnote {
            onetime_address: enote.onetime_address,
            amount_commitment: enote.amount_commitment,
            encrypted_amount: enote.encrypted_amount,
            view_tag: enote.view_tag,
            encrypted_anchor: enote.encrypted_anchor,
            encrypted_payment_id: Some(enote.encrypted_payment_id),
            ephemeral_pubkey: enote.ephemeral_pubkey,
        };
        let scan = scan_enote(
            &received,
            &ctx,
            &receiver.view_incoming_key,
            &receiver.account_spend_pubkey,
        )
        .expect("own enote must scan");
        assert_eq!(scan.amount, 1_000_000_007);
        assert_eq!(scan.enote_type, EnoteType::Payment);
        assert_eq!(scan.amount_blinding, enote.amount_blinding);
        assert_eq!(scan.address_spend_pubkey, receiver.account_spend_pubkey);
    }

    #[test]
    fn enote_special_anchor_self_send() {
        let mut rng = StdRng::seed_from_u64(52);
        let wallet = test_account(0x20);
        let dest = CarrotDestination {
            spend_pubkey: wallet.account_spend_pubkey,
            view_pubkey: wallet.primary_view_pubkey,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        let ctx = input_context_rct(&[0x88; 32]);
        let anchor = random_anchor(&mut rng);
        let enote = build_enote(
            &dest,
            555_000,
            &ctx,
            EnoteType::Change,
            anchor,
            Some(&wallet.view_incoming_key),
        )
        .unwrap();

        let received = ReceivedEnote {
            onetime_address: enote.onetime_address,
            amount_commitment: enote.amount_commitment,
            encrypted_amount: enote.encrypted_amount,
            view_tag: enote.view_tag,
            encrypted_anchor: enote.encrypted_anchor,
            encrypted_payment_id: None,
            ephemeral_pubkey: enote.ephemeral_pubkey,
        };
        let scan = scan_enote(
            &received,
            &ctx,
            &wallet.view_incoming_key,
            &wallet.account_spend_pubkey,
        )
        .expect("change must scan via the special anchor");
        assert_eq!(scan.enote_type, EnoteType::Change);
        assert_eq!(scan.amount, 555_000);
    }

    #[test]
    fn foreign_enote_rejected() {
        let mut rng = StdRng::seed_from_u64(53);
        let receiver = test_account(0x30);
        let stranger = test_account(0x31);
        let dest = CarrotDestination {
            spend_pubkey: receiver.account_spend_pubkey,
            view_pubkey: receiver.primary_view_pubkey,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        let ctx = input_context_rct(&[0x99; 32]);
        let enote = build_enote(
            &dest,
            1,
            &ctx,
            EnoteType::Payment,
            random_anchor(&mut rng),
            None,
        )
        .unwrap();
        let received = ReceivedEnote {
            onetime_address: enote.onetime_address,
            amount_commitment: enote.amount_commitment,
            encrypted_amount: enote.encrypted_amount,
            view_tag: enote.view_tag,
            encrypted_anchor: enote.encrypted_anchor,
            encrypted_payment_id: None,
            ephemeral_pubkey: enote.ephemeral_pubkey,
        };
        assert!(scan_enote(
            &received,
            &ctx,
            &stranger.view_incoming_key,
            &stranger.account_spend_pubkey,
        )
        .is_none());
    }

    #[test]
    fn tampered_view_tag_rejected() {
        let mut rng = StdRng::seed_from_u64(54);
        let receiver = test_account(0x40);
        let dest = CarrotDestination {
            spend_pubkey: receiver.account_spend_pubkey,
            view_pubkey: receiver.primary_view_pubkey,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        let ctx = input_context_coinbase(500);
        let enote = build_enote(
            &dest,
            10,
            &ctx,
            EnoteType::Payment,
            random_anchor(&mut rng),
            None,
        )
        .unwrap();
        let mut received = ReceivedEnote {
            onetime_address: enote.onetime_address,
            amount_commitment: enote.amount_commitment,
            encrypted_amount: enote.encrypted_amount,
            view_tag: enote.view_tag,
            encrypted_anchor: enote.encrypted_anchor,
            encrypted_payment_id: None,
            ephemeral_pubkey: enote.ephemeral_pubkey,
        };
        received.view_tag[0] ^= 0x01;
        assert!(scan_enote(
            &received,
            &ctx,
            &receiver.view_incoming_key,
            &receiver.account_spend_pubkey,
        )
        .is_none());
    }

    #[test]
    fn onetime_secret_opens_onetime_address() {
        // x·G + y·T must equal K_o for an enote paid to the main address.
        let mut rng = StdRng::seed_from_u64(55);
        let wallet = test_account(0x50);
        let dest = CarrotDestination {
            spend_pubkey: wallet.account_spend_pubkey,
            view_pubkey: wallet.primary_view_pubkey,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        let ctx = input_context_rct(&[0x12; 32]);
        let enote = build_enote(
            &dest,
            9_999,
            &ctx,
            EnoteType::Payment,
            random_anchor(&mut rng),
            None,
        )
        .unwrap();

        // Reconstruct s_ctx the way the scanner does.
        let s_sr = x25519(
            &wallet.view_incoming_key,
            &MontgomeryPoint(enote.ephemeral_pubkey),
        );
        let s_ctx = hash_32(
            DOMAIN_SENDER_RECEIVER_SECRET,
            &[&enote.ephemeral_pubkey, &ctx],
            &s_sr,
        );
        let (x, y) = onetime_secret_keys(&wallet, &enote.amount_commitment, &s_ctx);
        let rebuilt = EdwardsPoint::vartime_multiscalar_mul([x, y], [g_point(), t_point()]);
        assert_eq!(compress(&rebuilt), enote.onetime_address);
    }
}
