pub use mod_index_core::{keys, listing, pagination, reconcile, record, resolve, store, sweep};
