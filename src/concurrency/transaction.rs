use crate::common::config::TxnId;

/// Opaque transaction handle threaded through index operations for future
/// lock-manager integration. The hash table never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    txn_id: TxnId,
}

impl Transaction {
    pub fn new(txn_id: TxnId) -> Self {
        Self { txn_id }
    }

    pub fn get_txn_id(&self) -> TxnId {
        self.txn_id
    }
}
