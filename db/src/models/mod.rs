pub mod certificate;
pub mod lifecycle;
pub mod record_id;
pub mod rule;
pub mod validation_record;

pub use certificate::*;
pub use lifecycle::*;
pub use record_id::*;
pub use rule::*;
pub use validation_record::*;
