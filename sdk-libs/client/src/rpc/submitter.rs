use async_trait::async_trait;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use tracing::{debug, warn};

use super::SubmitError;
use crate::{error::ClientError, operation::AssembledInstruction};

/// Signs and broadcasts assembled instructions.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Returns a submission identifier once the ledger accepted the
    /// transaction.
    async fn submit_instruction(
        &self,
        instruction: &Instruction,
        signers: &[Pubkey],
    ) -> Result<String, SubmitError>;
}

pub async fn submit<S: Submitter + ?Sized>(
    submitter: &S,
    assembled: &AssembledInstruction,
) -> Result<String, ClientError> {
    debug!(
        "submitting {:?} with {} inputs and {} accounts",
        assembled.kind,
        assembled.inputs.len(),
        assembled.instruction.accounts.len()
    );
    match submitter
        .submit_instruction(&assembled.instruction, &assembled.signers)
        .await
    {
        Ok(signature) => Ok(signature),
        Err(err) => {
            warn!("Submission of {:?} failed: {}", assembled.kind, err);
            Err(err.into())
        }
    }
}
