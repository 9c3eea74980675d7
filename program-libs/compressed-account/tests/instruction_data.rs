use borsh::{BorshDeserialize, BorshSerialize};
use rand::{rngs::StdRng, Rng, SeedableRng};
use zkc_compressed_account::{
    compressed_account::{
        OutputCompressedAccountWithPackedContext, PackedCompressedAccountWithMerkleContext,
        PackedMerkleContext,
    },
    instruction_data::{CompressedProof, InstructionDataInvoke, NewAddressParamsPacked},
    CompressedAccount, CompressedAccountData, FieldElement, Pubkey,
};

/// Tests:
/// 1. account with address and data serializes positionally
/// 2. new address params are 36 bytes
/// 3. full invoke survives serialization
/// 4. randomized lamport conservation

fn account(lamports: u64) -> CompressedAccount {
    CompressedAccount::new(Pubkey::new_unique(), lamports)
}

#[test]
fn test_account_layout() {
    let mut account = account(7);
    account.address = Some(FieldElement::new([3u8; 32]).unwrap());
    account.data = Some(CompressedAccountData {
        discriminator: [1u8; 8],
        data: vec![9, 9],
        data_hash: [4u8; 32],
    });
    let bytes = account.try_to_vec().unwrap();
    assert_eq!(bytes.len(), 32 + 8 + 1 + 32 + 1 + 8 + 4 + 2 + 32);
    assert_eq!(&bytes[..32], account.owner.as_bytes());
    assert_eq!(&bytes[32..40], &7u64.to_le_bytes());
    assert_eq!(bytes[40], 1);
    assert_eq!(&bytes[41..73], &[3u8; 32]);
    assert_eq!(bytes[73], 1);
    assert_eq!(&bytes[82..86], &2u32.to_le_bytes());
}

#[test]
fn test_new_address_params_layout() {
    let params = NewAddressParamsPacked {
        seed: [5u8; 32],
        address_queue_account_index: 1,
        address_merkle_tree_account_index: 0,
        address_merkle_tree_root_index: 300,
    };
    let bytes = params.try_to_vec().unwrap();
    assert_eq!(bytes.len(), 36);
    assert_eq!(&bytes[32..], &[1, 0, 44, 1]);
}

#[test]
fn test_invoke_deserializes_to_same_value() {
    let inputs = InstructionDataInvoke {
        proof: Some(CompressedProof {
            a: [1u8; 32],
            b: [2u8; 64],
            c: [3u8; 32],
        }),
        input_compressed_accounts_with_merkle_context: vec![
            PackedCompressedAccountWithMerkleContext {
                compressed_account: account(10),
                merkle_context: PackedMerkleContext {
                    merkle_tree_pubkey_index: 2,
                    queue_pubkey_index: 3,
                    leaf_index: 17,
                    prove_by_index: true,
                },
                root_index: 0,
                read_only: false,
            },
        ],
        output_compressed_accounts: vec![OutputCompressedAccountWithPackedContext {
            compressed_account: account(4),
            merkle_tree_index: 2,
        }],
        relay_fee: None,
        new_address_params: vec![NewAddressParamsPacked::default()],
        compress_or_decompress_lamports: Some(6),
        is_compress: false,
    };
    let bytes = inputs.try_to_vec().unwrap();
    assert_eq!(InstructionDataInvoke::try_from_slice(&bytes).unwrap(), inputs);
    assert!(inputs.is_balanced());
}

#[test]
fn test_random_balance() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..1000 {
        let input_values: Vec<u64> = (0..rng.gen_range(0..5))
            .map(|_| rng.gen_range(0..1_000_000))
            .collect();
        let total: u64 = input_values.iter().sum();
        let decompress = rng.gen_range(0..=total);
        let inputs = InstructionDataInvoke {
            input_compressed_accounts_with_merkle_context: input_values
                .iter()
                .map(|lamports| PackedCompressedAccountWithMerkleContext {
                    compressed_account: account(*lamports),
                    ..Default::default()
                })
                .collect(),
            output_compressed_accounts: vec![OutputCompressedAccountWithPackedContext {
                compressed_account: account(total - decompress),
                merkle_tree_index: 0,
            }],
            compress_or_decompress_lamports: Some(decompress),
            ..Default::default()
        };
        assert!(inputs.is_balanced());

        let mut off_by_one = inputs.clone();
        off_by_one.output_compressed_accounts[0].compressed_account.lamports += 1;
        assert!(!off_by_one.is_balanced());
    }
}
