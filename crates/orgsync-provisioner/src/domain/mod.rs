pub(crate) mod membership;
pub(crate) mod random;
pub(crate) mod reconciliation;
