//! End-to-end transaction flows: build → sign → serialize → validate,
//! across the legacy and CARROT eras and the special transaction
//! families.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{Identity, VartimeMultiscalarMul};
use rand::rngs::StdRng;
use rand::SeedableRng;

use salvium_crypto::carrot;
use salvium_crypto::commitment;
use salvium_crypto::ecc::{
    compress, decompress, g_point, h_point, random_scalar, scalar_mult_base, t_point,
};
use salvium_tx::fee::FeePriority;
use salvium_tx::hash::tx_hash;
use salvium_tx::serialize::{parse_transaction, serialize_transaction};
use salvium_tx::types::extra_find_tx_pubkey;
use salvium_tx::validate::IssueKind;
use salvium_tx::{
    sign_transaction, validate_transaction, Destination, MixRing, PreparedInput, StakeEvent,
    StakeLedger, StakeStatus, Transaction, TransactionBuilder, TxInput, TxOutput,
    ValidationContext,
};
use salvium_types::{HfVersion, TxType};

const LEGACY_HF: u8 = 2;
const AUDIT_HF: u8 = 6;
const CARROT_HF: u8 = HfVersion::CARROT;

/// An owned legacy output: one-time key on G only.
fn legacy_input(rng: &mut StdRng, amount: u64, ring_size: usize) -> PreparedInput {
    let secret = random_scalar(rng);
    let public_key = compress(&scalar_mult_base(&secret));
    let mask = random_scalar(rng);
    build_input(rng, secret, None, public_key, amount, mask, ring_size)
}

/// An owned CARROT output: twin key over G and T.
fn carrot_input(rng: &mut StdRng, amount: u64, ring_size: usize) -> PreparedInput {
    let x = random_scalar(rng);
    let y = random_scalar(rng);
    let public_key = compress(&EdwardsPoint::vartime_multiscalar_mul(
        [x, y],
        [g_point(), t_point()],
    ));
    let mask = random_scalar(rng);
    build_input(rng, x, Some(y), public_key, amount, mask, ring_size)
}

fn build_input(
    rng: &mut StdRng,
    secret_key: Scalar,
    secret_key_y: Option<Scalar>,
    public_key: [u8; 32],
    amount: u64,
    mask: Scalar,
    ring_size: usize,
) -> PreparedInput {
    let commitment = compress(&commitment::commit(amount, &mask));
    let mut ring = Vec::with_capacity(ring_size);
    let mut ring_commitments = Vec::with_capacity(ring_size);
    for _ in 0..ring_size - 1 {
        let dx = random_scalar(rng);
        let dy = random_scalar(rng);
        ring.push(compress(&EdwardsPoint::vartime_multiscalar_mul(
            [dx, dy],
            [g_point(), t_point()],
        )));
        ring_commitments.push(compress(&commitment::commit(amount, &random_scalar(rng))));
    }
    let real_index = ring_size / 3;
    ring.insert(real_index, public_key);
    ring_commitments.insert(real_index, commitment);
    PreparedInput {
        secret_key,
        secret_key_y,
        public_key,
        amount,
        mask,
        asset_type: "SAL".into(),
        ring,
        ring_commitments,
        ring_indices: (0..ring_size as u64).map(|i| 1_000 + i * 17).collect(),
        real_index,
    }
}

fn carrot_destination(account: &carrot::AccountKeys, amount: u64) -> Destination {
    Destination {
        spend_pubkey: account.account_spend_pubkey,
        view_pubkey: account.primary_view_pubkey,
        amount,
        asset_type: "SAL".into(),
        payment_id: [0u8; 8],
        is_subaddress: false,
    }
}

fn mix_rings(inputs: &[PreparedInput]) -> Vec<MixRing> {
    inputs
        .iter()
        .map(|i| MixRing {
            keys: i.ring.clone(),
            commitments: i.ring_commitments.clone(),
        })
        .collect()
}

/// Σ pseudoOuts − Σ outPk must equal (fee + amount_burnt)·H once the
/// identity p_r is subtracted.
fn assert_balanced(tx: &Transaction) {
    let rct = tx.rct.as_ref().unwrap();
    let mut pseudo = EdwardsPoint::identity();
    for po in &rct.pseudo_outs {
        pseudo += decompress(po).unwrap();
    }
    let mut outs = EdwardsPoint::identity();
    for pk in &rct.out_pk {
        outs += decompress(pk).unwrap();
    }
    let p_r = decompress(&rct.p_r).unwrap();
    let declared = Scalar::from(rct.txn_fee + tx.prefix.amount_burnt);
    assert_eq!(pseudo, p_r + outs + declared * h_point());
}

// ─── Scenario: legacy transfer ──────────────────────────────────────────────

#[test]
fn legacy_transfer_full_flow() {
    let mut rng = StdRng::seed_from_u64(1001);
    let receiver_spend = random_scalar(&mut rng);
    let receiver_view = random_scalar(&mut rng);
    let sender_view = random_scalar(&mut rng);
    let change_spend = compress(&scalar_mult_base(&random_scalar(&mut rng)));
    let change_view = compress(&scalar_mult_base(&random_scalar(&mut rng)));

    let inputs = vec![
        legacy_input(&mut rng, 1_000_000_000, 11),
        legacy_input(&mut rng, 500_000_000, 11),
    ];
    let rings_by_image = {
        let mut pairs: Vec<([u8; 32], &PreparedInput)> =
            inputs.iter().map(|i| (i.key_image(), i)).collect();
        pairs.sort_by(|a, b| b.0.cmp(&a.0));
        pairs
            .into_iter()
            .map(|(_, i)| MixRing {
                keys: i.ring.clone(),
                commitments: i.ring_commitments.clone(),
            })
            .collect::<Vec<_>>()
    };

    let dest = Destination {
        spend_pubkey: compress(&scalar_mult_base(&receiver_spend)),
        view_pubkey: compress(&scalar_mult_base(&receiver_view)),
        amount: 1_200_000_000,
        asset_type: "SAL".into(),
        payment_id: [0u8; 8],
        is_subaddress: false,
    };

    let unsigned = TransactionBuilder::new(LEGACY_HF)
        .add_inputs(inputs)
        .add_destination(dest)
        .change_address(change_spend, change_view)
        .view_secret_key(sender_view)
        .priority(FeePriority::Low)
        .build(&mut rng)
        .unwrap();
    let fee = unsigned.fee;
    assert_eq!(
        unsigned.output_amounts.iter().sum::<u64>(),
        1_500_000_000 - fee,
        "outputs must absorb everything but the fee"
    );

    let tx = sign_transaction(&mut rng, unsigned).unwrap();
    let rct = tx.rct.as_ref().unwrap();

    // Two CLSAGs of ring 11, one aggregated proof over both outputs.
    assert_eq!(rct.clsags.len(), 2);
    assert!(rct.tclsags.is_empty());
    assert!(rct.clsags.iter().all(|c| c.s.len() == 11));
    assert_eq!(rct.bulletproofs_plus.len(), 1);
    assert_eq!(rct.out_pk.len(), 2);
    assert_eq!(rct.pseudo_outs.len(), 2);
    assert_balanced(&tx);
    assert_eq!(tx_hash(&tx).unwrap().len(), 32);

    let ctx = ValidationContext {
        hf_version: LEGACY_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings_by_image,
    };
    let report = validate_transaction(&tx, &ctx);
    assert!(report.valid, "issues: {:?}", report.errors);
}

// ─── Scenario: tampering is caught with a precise index ─────────────────────

#[test]
fn tampered_clsag_reports_single_signature_failure() {
    let mut rng = StdRng::seed_from_u64(1002);
    let sender_view = random_scalar(&mut rng);
    let change_spend = compress(&scalar_mult_base(&random_scalar(&mut rng)));
    let change_view = compress(&scalar_mult_base(&random_scalar(&mut rng)));
    let inputs = vec![
        legacy_input(&mut rng, 1_000_000_000, 11),
        legacy_input(&mut rng, 500_000_000, 11),
    ];
    let mut pairs: Vec<([u8; 32], PreparedInput)> =
        inputs.iter().map(|i| (i.key_image(), i.clone())).collect();
    pairs.sort_by(|a, b| b.0.cmp(&a.0));
    let rings: Vec<MixRing> = pairs
        .iter()
        .map(|(_, i)| MixRing {
            keys: i.ring.clone(),
            commitments: i.ring_commitments.clone(),
        })
        .collect();

    let dest = Destination {
        spend_pubkey: compress(&scalar_mult_base(&random_scalar(&mut rng))),
        view_pubkey: compress(&scalar_mult_base(&random_scalar(&mut rng))),
        amount: 900_000_000,
        asset_type: "SAL".into(),
        payment_id: [0u8; 8],
        is_subaddress: false,
    };
    let unsigned = TransactionBuilder::new(LEGACY_HF)
        .add_inputs(inputs)
        .add_destination(dest)
        .change_address(change_spend, change_view)
        .view_secret_key(sender_view)
        .priority(FeePriority::Low)
        .build(&mut rng)
        .unwrap();
    let mut tx = sign_transaction(&mut rng, unsigned).unwrap();

    tx.rct.as_mut().unwrap().clsags[0].c1[0] ^= 0x01;

    let ctx = ValidationContext {
        hf_version: LEGACY_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    let report = validate_transaction(&tx, &ctx);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1, "issues: {:?}", report.errors);
    assert_eq!(report.errors[0].kind, IssueKind::SignatureFailure);
    assert!(report.errors[0].message.contains("input 0"));
}

// ─── Scenario: CARROT transfer ──────────────────────────────────────────────

#[test]
fn carrot_transfer_full_flow() {
    let mut rng = StdRng::seed_from_u64(1003);
    let receiver = carrot::derive_account_keys(&[0x21; 32]);
    let sender = carrot::derive_account_keys(&[0x22; 32]);

    let inputs = vec![
        carrot_input(&mut rng, 1_000_000_000, 16),
        carrot_input(&mut rng, 500_000_000, 16),
    ];
    let mut pairs: Vec<([u8; 32], PreparedInput)> =
        inputs.iter().map(|i| (i.key_image(), i.clone())).collect();
    pairs.sort_by(|a, b| b.0.cmp(&a.0));
    let rings: Vec<MixRing> = pairs
        .iter()
        .map(|(_, i)| MixRing {
            keys: i.ring.clone(),
            commitments: i.ring_commitments.clone(),
        })
        .collect();

    let unsigned = TransactionBuilder::new(CARROT_HF)
        .add_inputs(inputs)
        .add_destination(carrot_destination(&receiver, 1_200_000_000))
        .change_address(sender.account_spend_pubkey, sender.primary_view_pubkey)
        .view_secret_key(sender.view_incoming_key)
        .change_view_incoming_key(sender.view_incoming_key)
        .priority(FeePriority::Low)
        .build(&mut rng)
        .unwrap();
    let change_index = unsigned.change_index.unwrap();
    let tx = sign_transaction(&mut rng, unsigned).unwrap();
    let rct = tx.rct.as_ref().unwrap();

    // TCLSAG signatures with live sy responses.
    assert_eq!(rct.tclsags.len(), 2);
    assert!(rct.clsags.is_empty());
    assert!(rct
        .tclsags
        .iter()
        .all(|sig| sig.sx.len() == 16 && sig.sy.len() == 16));
    assert!(rct
        .tclsags
        .iter()
        .all(|sig| sig.sy.iter().any(|s| *s != [0u8; 32])));

    // One shared D_e in extra; outputs sorted by one-time key.
    let d_e = extra_find_tx_pubkey(&tx.prefix.extra).expect("ephemeral pubkey present");
    assert_ne!(d_e, [0u8; 32]);
    let keys: Vec<&[u8; 32]> = tx.prefix.outputs.iter().map(|o| o.key()).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    for output in &tx.prefix.outputs {
        match output {
            TxOutput::CarrotV1 { view_tag, .. } => assert_eq!(view_tag.len(), 3),
            other => panic!("non-carrot output after the fork: {other:?}"),
        }
    }

    assert_balanced(&tx);

    // Byte-exact serialize → parse round trip.
    let bytes = serialize_transaction(&tx).unwrap();
    let parsed = parse_transaction(&bytes).unwrap();
    assert_eq!(parsed, tx);
    assert_eq!(serialize_transaction(&parsed).unwrap(), bytes);

    // The receiver finds the payment; the sender recognizes its change
    // through the special anchor alone.
    let first_key_image = tx.prefix.inputs[0].key_image().unwrap();
    let input_context = carrot::input_context_rct(first_key_image);
    let mut found_payment = false;
    let mut found_change = false;
    for (i, output) in tx.prefix.outputs.iter().enumerate() {
        let TxOutput::CarrotV1 {
            key,
            view_tag,
            encrypted_anchor,
            ..
        } = output
        else {
            unreachable!()
        };
        let enote = carrot::ReceivedEnote {
            onetime_address: *key,
            amount_commitment: rct.out_pk[i],
            encrypted_amount: rct.ecdh_info[i],
            view_tag: *view_tag,
            encrypted_anchor: *encrypted_anchor,
            encrypted_payment_id: None,
            ephemeral_pubkey: d_e,
        };
        if let Some(scan) = carrot::scan_enote(
            &enote,
            &input_context,
            &receiver.view_incoming_key,
            &receiver.account_spend_pubkey,
        ) {
            assert_eq!(scan.amount, 1_200_000_000);
            assert_eq!(scan.enote_type, carrot::EnoteType::Payment);
            found_payment = true;
        }
        if let Some(scan) = carrot::scan_enote(
            &enote,
            &input_context,
            &sender.view_incoming_key,
            &sender.account_spend_pubkey,
        ) {
            assert_eq!(i, change_index);
            assert_eq!(scan.enote_type, carrot::EnoteType::Change);
            found_change = true;
        }
    }
    assert!(found_payment, "receiver must find the payment enote");
    assert!(found_change, "sender must find its change enote");

    let ctx = ValidationContext {
        hf_version: CARROT_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    let report = validate_transaction(&tx, &ctx);
    assert!(report.valid, "issues: {:?}", report.errors);
}

// ─── Scenario: stake ────────────────────────────────────────────────────────

#[test]
fn stake_full_flow_and_ledger() {
    let mut rng = StdRng::seed_from_u64(1004);
    let staker = carrot::derive_account_keys(&[0x31; 32]);

    let input = carrot_input(&mut rng, 100_000_000_000, 16);
    let rings = mix_rings(std::slice::from_ref(&input));

    let lock_period = salvium_types::consensus::stake_lock_period(salvium_types::Network::Mainnet);
    let fee = salvium_tx::fee::estimate_tx_fee(
        1,
        1,
        16,
        true,
        salvium_types::OutputTarget::CarrotV1,
        0,
        CARROT_HF,
        FeePriority::Low,
    );
    let stake_amount = 100_000_000_000 - fee;

    let unsigned = TransactionBuilder::stake(stake_amount, lock_period, CARROT_HF)
        .add_input(input)
        .change_address(staker.account_spend_pubkey, staker.primary_view_pubkey)
        .view_secret_key(staker.view_incoming_key)
        .change_view_incoming_key(staker.view_incoming_key)
        .fee(fee)
        .build(&mut rng)
        .unwrap();
    let tx = sign_transaction(&mut rng, unsigned).unwrap();

    assert_eq!(tx.prefix.tx_type, TxType::Stake);
    assert_eq!(tx.prefix.amount_burnt, stake_amount);
    assert_eq!(tx.prefix.outputs.len(), 1);
    assert_eq!(tx.prefix.unlock_time, lock_period);
    assert!(matches!(
        tx.prefix.extension,
        salvium_tx::PrefixExtension::Protocol(_)
    ));
    assert_balanced(&tx);

    let ctx = ValidationContext {
        hf_version: CARROT_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    let report = validate_transaction(&tx, &ctx);
    assert!(report.valid, "issues: {:?}", report.errors);

    // Ledger lifecycle: record the stake, match the protocol payout.
    let stake_height = 700_123;
    let event = StakeEvent::from_transaction(&tx, stake_height)
        .unwrap()
        .expect("stake tx emits an event");
    assert_eq!(event.amount_staked, stake_amount);

    let mut ledger = StakeLedger::new();
    ledger.record_stake(&event);
    assert_eq!(ledger.get_stakes(Some(StakeStatus::Locked)).len(), 1);

    let payout = Transaction {
        prefix: salvium_tx::TxPrefix {
            version: 4,
            unlock_time: 0,
            tx_type: TxType::Protocol,
            amount_burnt: 0,
            source_asset_type: "SAL".into(),
            destination_asset_type: "SAL".into(),
            amount_slippage_limit: 0,
            inputs: vec![TxInput::Gen {
                height: stake_height + lock_period,
            }],
            outputs: vec![TxOutput::CarrotV1 {
                amount: stake_amount + 42,
                key: event.change_output_key,
                asset_type: "SAL".into(),
                view_tag: [0, 0, 0],
                encrypted_anchor: [0u8; 16],
            }],
            extra: Vec::new(),
            extension: salvium_tx::PrefixExtension::None,
        },
        rct: None,
    };
    let return_event = ledger
        .match_protocol_return(&payout, stake_height + lock_period)
        .unwrap()
        .expect("payout must match the tracked stake");
    assert_eq!(return_event.return_amount, stake_amount + 42);
    assert!(ledger.mark_stake_returned(&return_event));
    assert_eq!(
        ledger.get_stake(&event.stake_tx_hash).unwrap().status,
        StakeStatus::Returned
    );
}

// ─── Scenario: burn ─────────────────────────────────────────────────────────

#[test]
fn burn_full_flow_and_asset_rules() {
    let mut rng = StdRng::seed_from_u64(1005);
    let wallet = carrot::derive_account_keys(&[0x41; 32]);

    let input = carrot_input(&mut rng, 10_000_000_000, 16);
    let rings = mix_rings(std::slice::from_ref(&input));

    let burn_amount = 3_000_000_000;
    let unsigned = TransactionBuilder::burn(burn_amount, "SAL", CARROT_HF)
        .add_input(input)
        .change_address(wallet.account_spend_pubkey, wallet.primary_view_pubkey)
        .view_secret_key(wallet.view_incoming_key)
        .change_view_incoming_key(wallet.view_incoming_key)
        .priority(FeePriority::Low)
        .build(&mut rng)
        .unwrap();
    let tx = sign_transaction(&mut rng, unsigned).unwrap();

    assert_eq!(tx.prefix.tx_type, TxType::Burn);
    assert_eq!(tx.prefix.amount_burnt, burn_amount);
    assert_eq!(tx.prefix.destination_asset_type, "BURN");
    assert_eq!(tx.prefix.outputs.len(), 1, "single change output");
    assert_balanced(&tx);

    let ctx = ValidationContext {
        hf_version: CARROT_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    assert!(validate_transaction(&tx, &ctx).valid);

    // Re-pointing the destination asset breaks the BURN rule.
    let mut bad = tx.clone();
    bad.prefix.destination_asset_type = "SAL".into();
    let report = validate_transaction(&bad, &ctx);
    assert!(!report.valid);
    assert!(report.has(IssueKind::ForkViolation));
}

// ─── Scenario: audit ────────────────────────────────────────────────────────

#[test]
fn audit_full_flow_and_fork_gating() {
    let mut rng = StdRng::seed_from_u64(1006);
    let wallet_view = random_scalar(&mut rng);
    let wallet_spend = compress(&scalar_mult_base(&random_scalar(&mut rng)));

    let fee = salvium_tx::fee::estimate_tx_fee(
        1,
        1,
        11,
        false,
        salvium_types::OutputTarget::TaggedKey,
        0,
        AUDIT_HF,
        FeePriority::Low,
    );
    let audit_amount = 5_000_000_000;
    let input = legacy_input(&mut rng, audit_amount + fee, 11);
    let rings = mix_rings(std::slice::from_ref(&input));

    let unsigned = TransactionBuilder::audit(audit_amount, 500_000, AUDIT_HF)
        .add_input(input)
        .change_address(wallet_spend, compress(&scalar_mult_base(&wallet_view)))
        .view_secret_key(wallet_view)
        .audit_disclosure(wallet_view.to_bytes(), wallet_spend)
        .fee(fee)
        .build(&mut rng)
        .unwrap();
    let tx = sign_transaction(&mut rng, unsigned).unwrap();

    assert_eq!(tx.prefix.tx_type, TxType::Audit);
    assert!(tx.prefix.outputs.is_empty(), "audit spends everything");
    assert_eq!(tx.prefix.unlock_time, 500_000);
    assert!(tx.rct.as_ref().unwrap().bulletproofs_plus.is_empty());
    assert_balanced(&tx);

    let ctx = ValidationContext {
        hf_version: AUDIT_HF,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    let report = validate_transaction(&tx, &ctx);
    assert!(report.valid, "issues: {:?}", report.errors);

    // Outside the audit forks the same transaction is illegal.
    let ctx_outside = ValidationContext {
        hf_version: 7,
        block_height: None,
        base_reward: 0,
        mix_rings: &rings,
    };
    let report = validate_transaction(&tx, &ctx_outside);
    assert!(!report.valid);
    assert!(report.has(IssueKind::ForkViolation));
}
