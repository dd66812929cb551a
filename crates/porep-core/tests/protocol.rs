//! Properties of the validator state machine over arbitrary statements.

use porep_core::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Accepts a proof iff it is `statement id ‖ challenge content`.
struct ConcatVerifier;

impl SealVerifier for ConcatVerifier {
    fn verify_seal(info: &SealVerifyInfo<'_>) -> Result<bool, BackendError> {
        let mut expected = info.randomness.as_bytes().to_vec();
        expected.extend_from_slice(info.interactive_randomness.as_bytes());
        Ok(info.proof == expected.as_slice())
    }
}

fn answer(chal: &Challenge) -> Proof {
    let mut bytes = chal.statement_id.as_bytes().to_vec();
    bytes.extend_from_slice(chal.content.as_bytes());
    Proof::new(bytes)
}

prop_compose! {
    fn arb_statement()(
        id in any::<[u8; 32]>().prop_filter("non-zero id", |b| b.iter().any(|&x| x != 0)),
        sector_number in any::<u64>(),
        miner_id in any::<u64>(),
        sealed in any::<[u8; 32]>(),
        unsealed in any::<[u8; 32]>(),
        piece in any::<[u8; 32]>(),
        shift in 7u32..=11,
    ) -> Statement {
        Statement {
            id: StatementId::new(id),
            sector_number,
            proof_type: ProofType::StackedDrg2KiBV1,
            sealed_cid: Cid::new(CommitmentKind::Sealed, sealed),
            unsealed_cid: Cid::new(CommitmentKind::Unsealed, unsealed),
            pieces: vec![PieceInfo { size: 1u64 << shift, piece_cid: Cid::new(CommitmentKind::Piece, piece) }],
            miner_id,
        }
    }
}

proptest! {
    #[test]
    fn challenge_references_live_statement(st in arb_statement(), seed in any::<u64>()) {
        let mut v = Validator::new();
        let id = st.id;
        v.handle_statement(st).unwrap();
        let chal = v.generate_challenge_with(&mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(chal.statement_id, id);
    }

    #[test]
    fn consistent_answers_always_verify(st in arb_statement(), seed in any::<u64>()) {
        let mut v = Validator::new();
        v.handle_statement(st).unwrap();
        let chal = *v.generate_challenge_with(&mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert!(v.verify_proof::<ConcatVerifier>(&answer(&chal)).unwrap());
    }

    #[test]
    fn answers_to_replaced_challenges_are_rejected(st in arb_statement(), seed in any::<u64>()) {
        let mut v = Validator::new();
        v.handle_statement(st).unwrap();
        let stale = *v.generate_challenge_with(&mut StdRng::seed_from_u64(seed)).unwrap();
        v.generate_challenge_with(&mut StdRng::seed_from_u64(seed.wrapping_add(1))).unwrap();
        prop_assert!(!v.verify_proof::<ConcatVerifier>(&answer(&stale)).unwrap());
    }
}

#[test]
fn verify_on_empty_validator_is_a_precondition_violation() {
    let mut v = Validator::new();
    let err = v.verify_proof::<ConcatVerifier>(&Proof::new(vec![0; 64])).unwrap_err();
    assert!(err.is_precondition());
}
