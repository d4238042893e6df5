mod bulk;
mod list;
mod sweep;

pub use bulk::{cancel_revoke_all, revoke_all};
pub use list::list;
pub use sweep::sweep;
