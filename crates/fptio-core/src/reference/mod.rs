//! Entity reference parsing and formatting.
//!
//! Two reference shapes share the `fpt://` prefix:
//! - `fpt://asset/{type}/{id}` - database records (e.g. `PublishedFile`)
//! - `fpt://workfile/{template}/{field}/...` - on-disk workfiles built
//!   from a path template and its ordered field values

mod codec;
mod spec;

pub use codec::{REFERENCE_PREFIX, decode, encode, is_reference};
pub use spec::{DatabaseReference, EntityKind, EntityReference, ReferenceError, WorkfileReference};
