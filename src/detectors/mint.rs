//! Token mint: transfers out of the zero address on a known token.

use tracing::debug;

use super::ClassifyError;
use crate::constants::BURN_ADDRESS;
use crate::decoder::{DecodedEvent, DecodedLog};
use crate::ledger::LedgerTx;

pub async fn detect(logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    for log in logs {
        let DecodedEvent::Transfer { from, value, .. } = log.event else {
            continue;
        };
        if from != BURN_ADDRESS {
            continue;
        }
        let Some(mut record) = ledger.token_by_address(log.address).await? else {
            continue;
        };
        record.minted_amount = record.minted_amount.saturating_add(value);
        debug!(token = %format!("{:#x}", record.address), %value, "mint");
        ledger.save(record, None);
    }
    Ok(())
}
