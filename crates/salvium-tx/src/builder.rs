//! Transaction builder: turns owned one-time outputs plus destinations
//! into an unsigned transaction ready for `sign::sign_transaction`.
//!
//! Orchestration order matters: key images first (the CARROT input
//! context binds to the lowest-sorting one), then output derivation, then
//! the enote/input sorts, and only then the prefix assembly. The whole
//! build is atomic; any failure leaves nothing behind.

use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};

use salvium_crypto::carrot::{self, CarrotDestination, EnoteType};
use salvium_crypto::ecc::{
    compress, decompress, generate_key_image, hash_to_scalar, random_scalar, scalar_mult_base,
    sc_invert,
};
use salvium_crypto::{cn_keys, commitment};
use salvium_types::consensus::{rct_type_for_hf, tx_version_for_hf};
use salvium_types::{RctType, TxType};

use crate::fee::{estimate_tx_fee, FeePriority};
use crate::types::*;
use crate::TxError;

/// A recipient of funds.
#[derive(Debug, Clone)]
pub struct Destination {
    pub spend_pubkey: [u8; 32],
    pub view_pubkey: [u8; 32],
    pub amount: u64,
    pub asset_type: String,
    pub payment_id: [u8; 8],
    pub is_subaddress: bool,
}

/// An owned output prepared for spending, with its ring fetched by the
/// caller (the engine does no I/O).
#[derive(Clone)]
pub struct PreparedInput {
    pub secret_key: Scalar,
    /// T-component of the one-time key for CARROT-era outputs; `None`
    /// for legacy outputs (signed with y = 0 under TCLSAG).
    pub secret_key_y: Option<Scalar>,
    pub public_key: [u8; 32],
    pub amount: u64,
    pub mask: Scalar,
    pub asset_type: String,
    pub ring: Vec<[u8; 32]>,
    pub ring_commitments: Vec<[u8; 32]>,
    /// Absolute global indices, strictly ascending.
    pub ring_indices: Vec<u64>,
    pub real_index: usize,
}

impl PreparedInput {
    pub fn key_image(&self) -> [u8; 32] {
        generate_key_image(&self.public_key, &self.secret_key)
    }

    fn check_shape(&self, index: usize) -> Result<(), TxError> {
        let n = self.ring.len();
        if self.ring_commitments.len() != n || self.ring_indices.len() != n {
            return Err(TxError::RingShape(format!(
                "input {index}: ring {} / commitments {} / indices {}",
                n,
                self.ring_commitments.len(),
                self.ring_indices.len()
            )));
        }
        if self.real_index >= n {
            return Err(TxError::RingShape(format!(
                "input {index}: real index {} outside ring of {n}",
                self.real_index
            )));
        }
        if self.ring[self.real_index] != self.public_key {
            return Err(TxError::RingShape(format!(
                "input {index}: ring member at real index is not the spent key"
            )));
        }
        for pair in self.ring_indices.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TxError::RingShape(format!(
                    "input {index}: ring indices not strictly ascending"
                )));
            }
        }
        Ok(())
    }
}

/// Built but unsigned transaction: the prefix plus all the secret-side
/// data the signer needs. Secrets never reach the serialized form.
pub struct UnsignedTransaction {
    pub prefix: TxPrefix,
    pub output_amounts: Vec<u64>,
    pub output_masks: Vec<Scalar>,
    pub output_commitments: Vec<[u8; 32]>,
    pub encrypted_amounts: Vec<[u8; 8]>,
    /// Inputs sorted the way the prefix lists them (key image descending).
    pub inputs: Vec<PreparedInput>,
    pub rct_type: RctType,
    pub fee: u64,
    /// Post-sort position of the change output, if one exists.
    pub change_index: Option<usize>,
}

pub struct TransactionBuilder {
    inputs: Vec<PreparedInput>,
    destinations: Vec<Destination>,
    change_spend_pubkey: Option<[u8; 32]>,
    change_view_pubkey: Option<[u8; 32]>,
    /// Sender view secret: return-address blinding and legacy return keys.
    view_secret_key: Option<Scalar>,
    /// View-incoming key: marks the change enote with the special anchor.
    change_view_incoming_key: Option<Scalar>,
    audit_disclosure: Option<([u8; 32], [u8; 32])>,
    tx_type: TxType,
    hf_version: u8,
    fee: Option<u64>,
    priority: FeePriority,
    base_reward: u64,
    unlock_time: u64,
    source_asset_type: String,
    destination_asset_type: String,
    amount_burnt: u64,
    amount_slippage_limit: u64,
}

impl TransactionBuilder {
    pub fn new(hf_version: u8) -> Self {
        Self {
            inputs: Vec::new(),
            destinations: Vec::new(),
            change_spend_pubkey: None,
            change_view_pubkey: None,
            view_secret_key: None,
            change_view_incoming_key: None,
            audit_disclosure: None,
            tx_type: TxType::Transfer,
            hf_version,
            fee: None,
            priority: FeePriority::Normal,
            base_reward: 0,
            unlock_time: 0,
            source_asset_type: "SAL".into(),
            destination_asset_type: "SAL".into(),
            amount_burnt: 0,
            amount_slippage_limit: 0,
        }
    }

    pub fn add_input(mut self, input: PreparedInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_inputs(mut self, inputs: impl IntoIterator<Item = PreparedInput>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn add_destination(mut self, dest: Destination) -> Self {
        self.destinations.push(dest);
        self
    }

    pub fn change_address(mut self, spend_pubkey: [u8; 32], view_pubkey: [u8; 32]) -> Self {
        self.change_spend_pubkey = Some(spend_pubkey);
        self.change_view_pubkey = Some(view_pubkey);
        self
    }

    pub fn view_secret_key(mut self, key: Scalar) -> Self {
        self.view_secret_key = Some(key);
        self
    }

    pub fn change_view_incoming_key(mut self, key: Scalar) -> Self {
        self.change_view_incoming_key = Some(key);
        self
    }

    pub fn tx_type(mut self, t: TxType) -> Self {
        self.tx_type = t;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn priority(mut self, priority: FeePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn base_reward(mut self, reward: u64) -> Self {
        self.base_reward = reward;
        self
    }

    pub fn unlock_time(mut self, t: u64) -> Self {
        self.unlock_time = t;
        self
    }

    pub fn asset_types(mut self, source: &str, destination: &str) -> Self {
        self.source_asset_type = source.into();
        self.destination_asset_type = destination.into();
        self
    }

    pub fn amount_burnt(mut self, amount: u64) -> Self {
        self.amount_burnt = amount;
        self
    }

    pub fn slippage_limit(mut self, limit: u64) -> Self {
        self.amount_slippage_limit = limit;
        self
    }

    pub fn audit_disclosure(mut self, view_secret: [u8; 32], spend_pubkey: [u8; 32]) -> Self {
        self.audit_disclosure = Some((view_secret, spend_pubkey));
        self
    }

    // ── Specialized entry points ───────────────────────────────────────────

    /// STAKE: value moves through amount_burnt; the only output is change
    /// back to the staker; unlock covers the lock period.
    pub fn stake(amount: u64, lock_period: u64, hf_version: u8) -> Self {
        Self::new(hf_version)
            .tx_type(TxType::Stake)
            .amount_burnt(amount)
            .unlock_time(lock_period)
    }

    /// BURN: destination asset is the burn sink.
    pub fn burn(amount: u64, source_asset: &str, hf_version: u8) -> Self {
        Self::new(hf_version)
            .tx_type(TxType::Burn)
            .amount_burnt(amount)
            .asset_types(source_asset, "BURN")
    }

    /// CONVERT between circulating assets, value via amount_burnt.
    pub fn convert(
        amount: u64,
        source_asset: &str,
        dest_asset: &str,
        slippage_limit: u64,
        hf_version: u8,
    ) -> Self {
        Self::new(hf_version)
            .tx_type(TxType::Convert)
            .amount_burnt(amount)
            .asset_types(source_asset, dest_asset)
            .slippage_limit(slippage_limit)
    }

    /// AUDIT: inputs must sum to exactly amount + fee, no outputs.
    pub fn audit(amount: u64, unlock_height: u64, hf_version: u8) -> Self {
        Self::new(hf_version)
            .tx_type(TxType::Audit)
            .amount_burnt(amount)
            .unlock_time(unlock_height)
    }

    // ── Build ──────────────────────────────────────────────────────────────

    pub fn build<R: RngCore + CryptoRng>(
        mut self,
        rng: &mut R,
    ) -> Result<UnsignedTransaction, TxError> {
        if self.inputs.is_empty() {
            return Err(TxError::InvalidInput("no inputs".into()));
        }
        if self.destinations.is_empty() && self.amount_burnt == 0 {
            return Err(TxError::InvalidInput("no destinations".into()));
        }
        let ring_size = self.inputs[0].ring.len();
        for (i, input) in self.inputs.iter().enumerate() {
            input.check_shape(i)?;
            if input.ring.len() != ring_size {
                return Err(TxError::RingShape(format!(
                    "input {i}: ring size {} differs from {}",
                    input.ring.len(),
                    ring_size
                )));
            }
        }

        let total_in = self
            .inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.amount))
            .ok_or(TxError::Overflow)?;
        let total_out = self
            .destinations
            .iter()
            .try_fold(0u64, |acc, d| acc.checked_add(d.amount))
            .ok_or(TxError::Overflow)?;

        let version = u64::from(tx_version_for_hf(self.hf_version));
        let rct_type = rct_type_for_hf(self.hf_version);
        let use_carrot = rct_type == RctType::SalviumOne;

        let fee = match self.fee {
            Some(fee) => fee,
            None => {
                let out_type = if use_carrot {
                    salvium_types::OutputTarget::CarrotV1
                } else {
                    salvium_types::OutputTarget::TaggedKey
                };
                estimate_tx_fee(
                    self.inputs.len(),
                    self.destinations.len() + 1,
                    ring_size,
                    rct_type.uses_tclsag(),
                    out_type,
                    self.base_reward,
                    self.hf_version,
                    self.priority,
                )
            }
        };

        let needed = total_out
            .checked_add(fee)
            .and_then(|v| v.checked_add(self.amount_burnt))
            .ok_or(TxError::Overflow)?;
        if total_in < needed {
            return Err(TxError::InsufficientFunds {
                need: needed,
                have: total_in,
            });
        }
        let change_amount = total_in - needed;
        // STAKE always carries its change slot, even when it closes to zero.
        let emit_change = change_amount > 0 || self.tx_type == TxType::Stake;

        // Key images, then the prefix input order: key image descending.
        let inputs = std::mem::take(&mut self.inputs);
        let mut keyed: Vec<([u8; 32], PreparedInput)> =
            inputs.into_iter().map(|i| (i.key_image(), i)).collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        let key_images: Vec<[u8; 32]> = keyed.iter().map(|(ki, _)| *ki).collect();
        let sorted_inputs: Vec<PreparedInput> = keyed.into_iter().map(|(_, i)| i).collect();

        let input_context = carrot::input_context_rct(&key_images[0]);

        // ── Output derivation ─────────────────────────────────────────────
        let mut built: Vec<BuiltOutput> = Vec::new();
        let mut extra = Vec::new();

        if use_carrot {
            self.derive_carrot_outputs(
                rng,
                &input_context,
                change_amount,
                emit_change,
                &mut built,
                &mut extra,
            )?;
        } else {
            self.derive_legacy_outputs(rng, change_amount, emit_change, &mut built, &mut extra)?;
        }
        let change_built_index = if emit_change && !built.is_empty() {
            Some(built.len() - 1)
        } else {
            None
        };

        if let Some((view, spend)) = &self.audit_disclosure {
            extra_push_audit_disclosure(&mut extra, view, spend);
        }

        // Enote-sort rule: outputs ascending by one-time key; every
        // parallel vector follows the permutation.
        let mut order: Vec<usize> = (0..built.len()).collect();
        order.sort_by(|&a, &b| built[a].output.key().cmp(built[b].output.key()));
        let change_index =
            change_built_index.map(|old| order.iter().position(|&o| o == old).unwrap());

        let mut outputs = Vec::with_capacity(order.len());
        let mut output_amounts = Vec::with_capacity(order.len());
        let mut output_masks = Vec::with_capacity(order.len());
        let mut output_commitments = Vec::with_capacity(order.len());
        let mut encrypted_amounts = Vec::with_capacity(order.len());
        let mut amount_keys = Vec::with_capacity(order.len());
        for &i in &order {
            let b = built[i].clone();
            outputs.push(b.output);
            output_amounts.push(b.amount);
            output_masks.push(b.mask);
            output_commitments.push(b.commitment);
            encrypted_amounts.push(b.encrypted_amount);
            amount_keys.push(b.amount_key);
        }

        // ── Prefix trailer ────────────────────────────────────────────────
        let extension = self.build_extension(
            rng,
            version,
            &input_context,
            &outputs,
            &amount_keys,
            change_index,
        )?;

        // ── Prefix inputs ─────────────────────────────────────────────────
        let tx_inputs: Vec<TxInput> = sorted_inputs
            .iter()
            .zip(&key_images)
            .map(|(input, ki)| TxInput::Key {
                amount: 0,
                asset_type: input.asset_type.clone(),
                key_offsets: absolute_to_relative(&input.ring_indices),
                key_image: *ki,
            })
            .collect();

        let prefix = TxPrefix {
            version,
            unlock_time: self.unlock_time,
            tx_type: self.tx_type,
            amount_burnt: self.amount_burnt,
            source_asset_type: self.source_asset_type,
            destination_asset_type: self.destination_asset_type,
            amount_slippage_limit: self.amount_slippage_limit,
            inputs: tx_inputs,
            outputs,
            extra,
            extension,
        };

        Ok(UnsignedTransaction {
            prefix,
            output_amounts,
            output_masks,
            output_commitments,
            encrypted_amounts,
            inputs: sorted_inputs,
            rct_type,
            fee,
            change_index,
        })
    }

    fn derive_carrot_outputs<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        input_context: &[u8; 33],
        change_amount: u64,
        emit_change: bool,
        built: &mut Vec<BuiltOutput>,
        extra: &mut Vec<u8>,
    ) -> Result<(), TxError> {
        if self.destinations.is_empty() && !emit_change {
            // AUDIT: no outputs at all, hence no ephemeral key either.
            return Ok(());
        }

        // The shared D_e comes from the first destination, or from the
        // change address for stake/burn flows with no destinations.
        let anchor = carrot::random_anchor(rng);
        let lead = match self.destinations.first() {
            Some(d) => CarrotDestination {
                spend_pubkey: d.spend_pubkey,
                view_pubkey: d.view_pubkey,
                is_subaddress: d.is_subaddress,
                payment_id: d.payment_id,
            },
            None => self.change_destination(0)?.1,
        };
        let ephemeral = carrot::derive_ephemeral_key(&anchor, input_context, &lead)?;
        extra_push_tx_pubkey(extra, &ephemeral.pubkey);

        for dest in &self.destinations {
            let cd = CarrotDestination {
                spend_pubkey: dest.spend_pubkey,
                view_pubkey: dest.view_pubkey,
                is_subaddress: dest.is_subaddress,
                payment_id: dest.payment_id,
            };
            let enote = carrot::build_enote_with_ephemeral(
                &ephemeral,
                &cd,
                dest.amount,
                input_context,
                EnoteType::Payment,
                anchor,
                None,
            )?;
            built.push(BuiltOutput::from_enote(enote, dest.amount, &dest.asset_type));
        }

        if emit_change {
            let (_, change_dest) = self.change_destination(change_amount)?;
            let enote_type = if self.destinations.is_empty() {
                EnoteType::SelfSpend
            } else {
                EnoteType::Change
            };
            let enote = carrot::build_enote_with_ephemeral(
                &ephemeral,
                &change_dest,
                change_amount,
                input_context,
                enote_type,
                anchor,
                self.change_view_incoming_key.as_ref(),
            )?;
            built.push(BuiltOutput::from_enote(
                enote,
                change_amount,
                &self.source_asset_type,
            ));
        }
        Ok(())
    }

    fn derive_legacy_outputs<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        change_amount: u64,
        emit_change: bool,
        built: &mut Vec<BuiltOutput>,
        extra: &mut Vec<u8>,
    ) -> Result<(), TxError> {
        if self.destinations.is_empty() && !emit_change {
            return Ok(());
        }
        let tx_secret = random_scalar(rng);

        // Subaddress destinations flip the tx pubkey to r·D_sub.
        let tx_pubkey = match self.destinations.iter().find(|d| d.is_subaddress) {
            Some(sub) => compress(&(tx_secret * decompress(&sub.spend_pubkey)?)),
            None => compress(&scalar_mult_base(&tx_secret)),
        };
        extra_push_tx_pubkey(extra, &tx_pubkey);

        let mut all: Vec<(Destination, u64)> = self
            .destinations
            .iter()
            .map(|d| (d.clone(), d.amount))
            .collect();
        if emit_change {
            let (dest, _) = self.change_destination(change_amount)?;
            all.push((dest, change_amount));
        }

        for (index, (dest, amount)) in all.iter().enumerate() {
            let index = index as u64;
            let derivation = cn_keys::generate_key_derivation(&dest.view_pubkey, &tx_secret)?;
            let shared = cn_keys::derivation_to_scalar(&derivation, index);
            let key = cn_keys::derive_public_key(&derivation, index, &dest.spend_pubkey)?;
            let view_tag = cn_keys::derive_view_tag(&derivation, index);
            let mask = commitment::gen_commitment_mask(&shared.to_bytes());
            let enc_amount = commitment::ecdh_encode_amount(*amount, &shared.to_bytes());
            let commitment = compress(&commitment::commit(*amount, &mask));

            built.push(BuiltOutput {
                output: TxOutput::TaggedKey {
                    amount: 0,
                    key,
                    asset_type: dest.asset_type.clone(),
                    view_tag,
                },
                amount: *amount,
                mask,
                commitment,
                encrypted_amount: enc_amount,
                amount_key: shared.to_bytes(),
            });
        }
        Ok(())
    }

    /// The change "destination", reusing the legacy Destination shape.
    fn change_destination(&self, amount: u64) -> Result<(Destination, CarrotDestination), TxError> {
        let spend = self
            .change_spend_pubkey
            .ok_or_else(|| TxError::InvalidInput("change address required".into()))?;
        let view = self
            .change_view_pubkey
            .ok_or_else(|| TxError::InvalidInput("change address required".into()))?;
        let dest = Destination {
            spend_pubkey: spend,
            view_pubkey: view,
            amount,
            asset_type: self.source_asset_type.clone(),
            payment_id: [0u8; 8],
            is_subaddress: false,
        };
        let cd = CarrotDestination {
            spend_pubkey: spend,
            view_pubkey: view,
            is_subaddress: false,
            payment_id: [0u8; 8],
        };
        Ok((dest, cd))
    }

    /// Version/type-conditional prefix trailer.
    fn build_extension<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        version: u64,
        input_context: &[u8; 33],
        outputs: &[TxOutput],
        amount_keys: &[[u8; 32]],
        change_index: Option<usize>,
    ) -> Result<PrefixExtension, TxError> {
        if version < 3 || self.tx_type.is_coinbase() {
            return Ok(PrefixExtension::None);
        }
        match self.tx_type {
            TxType::Transfer => {
                self.return_address_list(outputs, amount_keys, change_index)
            }
            TxType::Stake | TxType::Audit if version >= 4 => {
                let (_, change_dest) = self.change_destination(0)?;
                let anchor = carrot::random_anchor(rng);
                let enote = carrot::build_enote(
                    &change_dest,
                    0,
                    input_context,
                    EnoteType::Change,
                    anchor,
                    self.change_view_incoming_key.as_ref(),
                )?;
                Ok(PrefixExtension::Protocol(ProtocolTxData {
                    version: 1,
                    return_address: enote.onetime_address,
                    return_pubkey: enote.ephemeral_pubkey,
                    return_view_tag: enote.view_tag,
                    return_anchor_enc: enote.encrypted_anchor,
                }))
            }
            _ => self.legacy_return(rng, outputs, change_index),
        }
    }

    /// Blinded per-output return points:
    /// `F_i = y_i⁻¹·(a·K_o_change)` with `y_i = H_s("RETURN\0\0" ‖ amount_key_i)`,
    /// plus the XOR-masked change index byte.
    fn return_address_list(
        &self,
        outputs: &[TxOutput],
        amount_keys: &[[u8; 32]],
        change_index: Option<usize>,
    ) -> Result<PrefixExtension, TxError> {
        let blinded_change = match (change_index, &self.view_secret_key) {
            (Some(idx), Some(view_secret)) => {
                let change_key = decompress(outputs[idx].key())?;
                Some((idx as u8, view_secret * change_key))
            }
            _ => None,
        };

        let mut addresses = Vec::with_capacity(outputs.len());
        let mut change_mask = Vec::with_capacity(outputs.len());
        for amount_key in amount_keys {
            let pad = salvium_crypto::keccak256_multi(&[b"CHG_IDX\0", amount_key])[0];
            match &blinded_change {
                Some((idx, target)) => {
                    let y = hash_to_scalar(&[b"RETURN\0\0", amount_key]);
                    let y_inv = sc_invert(&y).map_err(TxError::from)?;
                    addresses.push(compress(&(y_inv * target)));
                    change_mask.push(idx ^ pad);
                }
                None => {
                    addresses.push([0u8; 32]);
                    change_mask.push(pad);
                }
            }
        }
        Ok(PrefixExtension::ReturnAddressList {
            addresses,
            change_mask,
        })
    }

    /// Pre-CARROT return address pair for stake/burn/convert/audit:
    /// a one-time key on the change output under a fresh tx key.
    fn legacy_return<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        outputs: &[TxOutput],
        change_index: Option<usize>,
    ) -> Result<PrefixExtension, TxError> {
        let change_key = change_index
            .map(|i| *outputs[i].key())
            .or_else(|| outputs.first().map(|o| *o.key()));
        let (change_key, view_secret) = match (change_key, &self.view_secret_key) {
            (Some(k), Some(v)) => (k, v),
            _ => {
                return Ok(PrefixExtension::LegacyReturn {
                    return_address: [0u8; 32],
                    return_pubkey: [0u8; 32],
                })
            }
        };

        let s = random_scalar(rng);
        let return_pubkey = compress(&(s * decompress(&change_key)?));
        let derivation = cn_keys::generate_key_derivation(&return_pubkey, view_secret)?;
        let return_address = cn_keys::derive_public_key(&derivation, 0, &change_key)?;
        Ok(PrefixExtension::LegacyReturn {
            return_address,
            return_pubkey,
        })
    }
}

#[derive(Clone)]
struct BuiltOutput {
    output: TxOutput,
    amount: u64,
    mask: Scalar,
    commitment: [u8; 32],
    encrypted_amount: [u8; 8],
    /// Per-output shared secret, feeding the return-address blinding.
    amount_key: [u8; 32],
}

impl BuiltOutput {
    fn from_enote(enote: carrot::CarrotEnote, amount: u64, asset_type: &str) -> Self {
        Self {
            output: TxOutput::CarrotV1 {
                amount: 0,
                key: enote.onetime_address,
                asset_type: asset_type.to_string(),
                view_tag: enote.view_tag,
                encrypted_anchor: enote.encrypted_anchor,
            },
            amount,
            mask: enote.amount_blinding,
            commitment: enote.amount_commitment,
            encrypted_amount: enote.encrypted_amount,
            amount_key: enote.shared_secret,
        }
    }
}

/// `[10, 50, 80]` → `[10, 40, 30]`.
pub fn absolute_to_relative(indices: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(indices.len());
    let mut prev = 0;
    for (i, &abs) in indices.iter().enumerate() {
        out.push(if i == 0 { abs } else { abs - prev });
        prev = abs;
    }
    out
}

/// Inverse of `absolute_to_relative`.
pub fn relative_to_absolute(offsets: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(offsets.len());
    let mut acc = 0u64;
    for &off in offsets {
        acc += off;
        out.push(acc);
    }
    out
}
