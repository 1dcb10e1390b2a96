pub mod chains;
pub mod eblocks;
pub mod entries;
pub mod entries_eblocks;
pub mod queue;
pub mod users_chains;
