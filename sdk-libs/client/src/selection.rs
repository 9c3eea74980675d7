//! Selection of compressed accounts to spend for a requested amount.

use std::collections::HashSet;

use solana_pubkey::Pubkey;
use tracing::{trace, warn};
use zkc_compressed_account::{CompressedLeaf, FieldElement};

use crate::{
    error::ClientError,
    indexer::{Indexer, IndexerRpcConfig, PaginatedOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionConfig {
    /// Accounts requested per indexer page, the indexer default if `None`.
    pub page_limit: Option<u16>,
    /// Stop paging after this many pages.
    pub max_pages: Option<usize>,
}

/// Accounts chosen to cover an amount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub accounts: Vec<CompressedLeaf>,
    pub total: u64,
    /// `total - target`, becomes a change account if non-zero.
    pub change: u64,
}

impl Selection {
    pub fn hashes(&self) -> Vec<[u8; 32]> {
        self.accounts
            .iter()
            .map(|account| account.hash.to_bytes())
            .collect()
    }
}

/// Order in which candidate accounts are consumed.
pub trait SelectionPolicy: Send + Sync {
    fn order(&self, candidates: &mut [&CompressedLeaf]);
}

/// Largest accounts first, ties broken by ascending hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescendingGreedy;

impl SelectionPolicy for DescendingGreedy {
    fn order(&self, candidates: &mut [&CompressedLeaf]) {
        candidates.sort_by(|a, b| {
            b.lamports()
                .cmp(&a.lamports())
                .then_with(|| a.hash.cmp(&b.hash))
        });
    }
}

/// Accounts that can be spent: non-zero, writable, first occurrence of each hash.
fn spendable(leaves: &[CompressedLeaf]) -> Vec<&CompressedLeaf> {
    let mut seen: HashSet<FieldElement> = HashSet::with_capacity(leaves.len());
    leaves
        .iter()
        .filter(|leaf| leaf.lamports() > 0 && !leaf.read_only)
        .filter(|leaf| seen.insert(leaf.hash))
        .collect()
}

pub fn select_accounts_for_amount(
    leaves: &[CompressedLeaf],
    target: u64,
) -> Result<Selection, ClientError> {
    select_with_policy(&DescendingGreedy, leaves, target)
}

pub fn select_with_policy<P: SelectionPolicy + ?Sized>(
    policy: &P,
    leaves: &[CompressedLeaf],
    target: u64,
) -> Result<Selection, ClientError> {
    if target == 0 {
        return Ok(Selection::default());
    }
    let mut candidates = spendable(leaves);
    let available: u128 = candidates
        .iter()
        .map(|leaf| u128::from(leaf.lamports()))
        .sum();
    if available < u128::from(target) {
        return Err(ClientError::InsufficientBalance {
            required: target,
            available: u64::try_from(available).unwrap_or(u64::MAX),
        });
    }

    policy.order(&mut candidates);
    let mut accounts = Vec::new();
    let mut total: u64 = 0;
    for leaf in candidates {
        if total >= target {
            break;
        }
        total = total
            .checked_add(leaf.lamports())
            .ok_or(ClientError::EncodingOverflow {
                field: "selected lamports",
                value: leaf.lamports(),
            })?;
        accounts.push(leaf.clone());
    }
    Ok(Selection {
        accounts,
        total,
        change: total - target,
    })
}

/// Loads the accounts of `owner` page by page and selects among them.
///
/// Paging stops as soon as the loaded spendable balance covers `target`.
/// Hitting `max_pages` before that fails with `InvalidParameters`, since the
/// holder's full balance is unknown.
pub async fn fetch_and_select<I, P>(
    indexer: &I,
    owner: &Pubkey,
    target: u64,
    config: &SelectionConfig,
    rpc_config: Option<IndexerRpcConfig>,
    policy: &P,
) -> Result<Selection, ClientError>
where
    I: Indexer + ?Sized,
    P: SelectionPolicy + ?Sized,
{
    if target == 0 {
        return Ok(Selection::default());
    }
    let mut leaves: Vec<CompressedLeaf> = Vec::new();
    let mut counted: HashSet<FieldElement> = HashSet::new();
    let mut loaded: u128 = 0;
    let mut cursor = None;
    let mut pages = 0usize;
    loop {
        let response = indexer
            .get_compressed_accounts_by_owner(
                owner,
                Some(PaginatedOptions::new(cursor, config.page_limit)),
                rpc_config,
            )
            .await?;
        pages += 1;
        trace!(
            "page {} for owner {}: {} accounts at slot {}",
            pages,
            owner,
            response.value.items.len(),
            response.context.slot
        );
        for leaf in response.value.items {
            if Pubkey::from(leaf.account.owner) != *owner {
                warn!("Indexer returned account {} of another owner", leaf.hash);
                continue;
            }
            if leaf.lamports() > 0 && !leaf.read_only && counted.insert(leaf.hash) {
                loaded += u128::from(leaf.lamports());
            }
            leaves.push(leaf);
        }
        cursor = response.value.cursor;
        if loaded >= u128::from(target) || cursor.is_none() {
            break;
        }
        if config.max_pages.is_some_and(|max| pages >= max) {
            // More accounts exist, so the loaded total is not the balance.
            return Err(ClientError::InvalidParameters(format!(
                "page limit of {} reached after loading {} of {} lamports",
                pages, loaded, target
            )));
        }
    }
    select_with_policy(policy, &leaves, target)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use zkc_compressed_account::{CompressedAccount, Pubkey as WirePubkey, TreeInfo, TreeType};

    use super::*;

    fn leaves_with_values(values: &[u64]) -> Vec<CompressedLeaf> {
        let owner = WirePubkey::new_unique();
        let tree_info = TreeInfo::new(
            WirePubkey::new_unique(),
            WirePubkey::new_unique(),
            TreeType::StateV1,
        );
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                CompressedLeaf::new(CompressedAccount::new(owner, *value), tree_info, i as u32)
                    .unwrap()
            })
            .collect()
    }

    fn values(selection: &Selection) -> Vec<u64> {
        selection.accounts.iter().map(|a| a.lamports()).collect()
    }

    #[test]
    fn test_prefers_largest_account() {
        let leaves = leaves_with_values(&[5, 3, 2]);
        let selection = select_accounts_for_amount(&leaves, 4).unwrap();
        assert_eq!(values(&selection), vec![5]);
        assert_eq!(selection.total, 5);
        assert_eq!(selection.change, 1);
    }

    #[test]
    fn test_accumulates_until_covered() {
        let leaves = leaves_with_values(&[2, 5, 3]);
        let selection = select_accounts_for_amount(&leaves, 7).unwrap();
        assert_eq!(values(&selection), vec![5, 3]);
        assert_eq!(selection.change, 1);
    }

    #[test]
    fn test_zero_target_selects_nothing() {
        let leaves = leaves_with_values(&[5, 3, 2]);
        let selection = select_accounts_for_amount(&leaves, 0).unwrap();
        assert!(selection.accounts.is_empty());
        assert_eq!(selection.change, 0);
        let selection = select_accounts_for_amount(&[], 0).unwrap();
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn test_insufficient_balance() {
        let leaves = leaves_with_values(&[1, 2, 3]);
        assert!(matches!(
            select_accounts_for_amount(&leaves, 10),
            Err(ClientError::InsufficientBalance {
                required: 10,
                available: 6
            })
        ));
    }

    #[test]
    fn test_skips_read_only_zero_and_duplicates() {
        let mut leaves = leaves_with_values(&[0, 4, 9]);
        leaves[2].read_only = true;
        leaves.push(leaves[1].clone());
        assert!(matches!(
            select_accounts_for_amount(&leaves, 5),
            Err(ClientError::InsufficientBalance {
                required: 5,
                available: 4
            })
        ));
        let selection = select_accounts_for_amount(&leaves, 4).unwrap();
        assert_eq!(values(&selection), vec![4]);
    }

    #[test]
    fn test_ties_are_broken_by_hash() {
        let leaves = leaves_with_values(&[3, 3, 3]);
        let selection = select_accounts_for_amount(&leaves, 3).unwrap();
        let smallest = leaves.iter().map(|leaf| leaf.hash).min().unwrap();
        assert_eq!(selection.accounts[0].hash, smallest);

        let mut reversed = leaves.clone();
        reversed.reverse();
        assert_eq!(select_accounts_for_amount(&reversed, 3).unwrap(), selection);
    }

    #[test]
    fn test_random_selection_covers_target() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let len = rng.gen_range(1..12);
            let values: Vec<u64> = (0..len).map(|_| rng.gen_range(0..1_000)).collect();
            let total: u64 = values.iter().sum();
            let leaves = leaves_with_values(&values);
            let target = rng.gen_range(0..=total);
            let selection = select_accounts_for_amount(&leaves, target).unwrap();
            assert!(selection.total >= target);
            assert_eq!(selection.total - target, selection.change);
            assert_eq!(
                selection.total,
                selection.accounts.iter().map(|a| a.lamports()).sum::<u64>()
            );
            // Dropping the smallest selected account must leave the target uncovered.
            if let Some(smallest) = selection.accounts.iter().map(|a| a.lamports()).min() {
                assert!(selection.total - smallest < target);
            }
        }
    }
}
