//! nimbus-im: server-side SDK for the Nimbus cloud messaging platform
//!
//! Wraps the platform's two wire conventions behind one client: the legacy
//! form-encoded endpoints signed through SHA-1 headers, and the REST `/v2`
//! endpoints used by the ultra group subsystem. Construct a [`NimbusClient`]
//! once, clone it across tasks, and call the async operation methods grouped
//! by domain module ([`conversation`], [`ultragroup`], [`sensitive`]).
//!
//! ```no_run
//! use nimbus_im::{ConversationType, NimbusClient};
//!
//! # async fn example() -> nimbus_im::Result<()> {
//! let client = NimbusClient::new("app-key", "app-secret")?;
//! client
//!     .mute_conversation(ConversationType::Group, "u1", "g1", None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod conversation;
pub mod error;
pub mod protocol;
mod response;
pub mod sensitive;
pub mod ultragroup;

#[cfg(test)]
mod test_support;

pub use client::{
    ClientOptions, NimbusClient, DEFAULT_API_BASE, DEFAULT_SMS_BASE, DEFAULT_TIMEOUT_SECS,
};
pub use conversation::{ConversationType, PushNotificationLevel};
pub use error::{NimbusError, Result, CODE_INVALID_PARAMETER};
pub use protocol::{Protocol, RequestId};
pub use sensitive::{SensitiveWord, MAX_WORD_BATCH};
pub use ultragroup::{
    MessageExpansionItem, PushExt, UltraGroupChannel, UltraGroupInfo, UltraGroupMember,
    UltraGroupMessage, UltraGroupPublish, MAX_EXPANSION_KEYS, MAX_PUBLISH_GROUP_TARGETS,
};
