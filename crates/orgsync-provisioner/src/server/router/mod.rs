pub(crate) mod provision;
