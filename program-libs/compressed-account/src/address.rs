use crate::{keccak_hashv, CompressedAccountError, FieldElement, Pubkey};

/// Seeds accepted by [`derive_address_seed`], the program id takes one of
/// sixteen hash inputs.
pub const MAX_SEEDS: usize = 15;

const HASH_TO_FIELD_SIZE_SEED: u8 = u8::MAX;

/// Derives a single address seed for a compressed account from multiple
/// `seeds` and the owning `program_id`.
pub fn derive_address_seed(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<[u8; 32], CompressedAccountError> {
    if seeds.len() > MAX_SEEDS {
        return Err(CompressedAccountError::InvalidSeeds);
    }
    let mut inputs: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
    inputs.push(program_id.as_bytes().as_slice());
    inputs.extend_from_slice(seeds);

    let mut seed = keccak_hashv(&inputs);
    // Truncates to 31 bytes so that value is less than bn254 Fr modulo
    // field size.
    seed[0] = 0;
    Ok(seed)
}

/// Derives the address of a compressed account from its seed and the address
/// tree it is created in.
pub fn derive_address_from_seed(address_seed: &[u8; 32], address_tree: &Pubkey) -> FieldElement {
    let mut address = keccak_hashv(&[
        address_tree.as_bytes().as_slice(),
        address_seed.as_slice(),
        [HASH_TO_FIELD_SIZE_SEED].as_slice(),
    ]);
    address[0] = 0;
    // A zeroed top byte is always below the modulus.
    FieldElement::new(address).unwrap_or(FieldElement::ZERO)
}

/// Derives an address from seeds, returns the address and its seed.
pub fn derive_address(
    seeds: &[&[u8]],
    address_tree: &Pubkey,
    program_id: &Pubkey,
) -> Result<(FieldElement, [u8; 32]), CompressedAccountError> {
    let address_seed = derive_address_seed(seeds, program_id)?;
    let address = derive_address_from_seed(&address_seed, address_tree);
    Ok((address, address_seed))
}

#[cfg(test)]
mod tests {
    use solana_pubkey::pubkey;

    use super::*;

    const PROGRAM_ID: solana_pubkey::Pubkey =
        pubkey!("7yucc7fL3JGbyMwg4neUaenNSdySS39hbAk89Ao3t1Hz");

    #[test]
    fn test_derive_address_seed() {
        let program_id = Pubkey::from(PROGRAM_ID);

        let address_seed = derive_address_seed(&[b"foo", b"bar"], &program_id).unwrap();
        assert_eq!(
            address_seed,
            [
                0, 246, 150, 3, 192, 95, 53, 123, 56, 139, 206, 179, 253, 133, 115, 103, 120, 155,
                251, 72, 250, 47, 117, 217, 118, 59, 174, 207, 49, 101, 201, 110
            ]
        );

        let address_seed = derive_address_seed(&[b"ayy", b"lmao"], &program_id).unwrap();
        assert_eq!(
            address_seed,
            [
                0, 202, 44, 25, 221, 74, 144, 92, 69, 168, 38, 19, 206, 208, 29, 162, 53, 27, 120,
                214, 152, 116, 15, 107, 212, 168, 33, 121, 187, 10, 76, 233
            ]
        );
    }

    #[test]
    fn test_derive_address() {
        let program_id = Pubkey::from(PROGRAM_ID);
        let address_tree = Pubkey::new_from_array([0; 32]);

        let (address, _) = derive_address(&[b"foo", b"bar"], &address_tree, &program_id).unwrap();
        assert_eq!(
            address.to_bytes(),
            [
                0, 141, 60, 24, 250, 156, 15, 250, 237, 196, 171, 243, 182, 10, 8, 66, 147, 57, 27,
                209, 222, 86, 109, 234, 161, 219, 142, 43, 121, 104, 16, 63,
            ]
        );
        assert_eq!(
            address.to_base58(),
            "139uhyyBtEh4e1CBDJ68ooK5nCeWoncZf9HPyAfRrukA"
        );

        let (address, _) =
            derive_address(&[b"ayy", b"lmao"], &address_tree, &program_id).unwrap();
        assert_eq!(
            address.to_base58(),
            "12bhHm6PQjbNmEn3Yu1Gq9k7XwVn2rZpzYokmLwbFazN"
        );
    }

    #[test]
    fn test_too_many_seeds() {
        let seeds = [b"a".as_slice(); MAX_SEEDS + 1];
        assert_eq!(
            derive_address_seed(&seeds, &Pubkey::new_unique()),
            Err(CompressedAccountError::InvalidSeeds)
        );
        assert!(derive_address_seed(&seeds[..MAX_SEEDS], &Pubkey::new_unique()).is_ok());
    }
}
