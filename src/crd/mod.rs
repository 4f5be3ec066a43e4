//! Resource types admitted by the webhook.
//!
//! - `Setting`: Rancher's cluster-scoped `management.cattle.io/v3` configuration object

mod setting;

pub use setting::*;
