pub mod lock_owner;
pub mod state_record;

pub use lock_owner::LockOwner;
pub use state_record::StateRecord;
