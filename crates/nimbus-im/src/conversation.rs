//! Conversation mute and push-notification level operations.
//!
//! All endpoints here speak the legacy protocol. The `requestId` form
//! parameter of this endpoint family carries the acting user id, not a
//! correlation token.

use serde::Deserialize;

use crate::client::NimbusClient;
use crate::error::{require, NimbusError, Result};
use crate::protocol::ApiCall;
use crate::response;

/// Conversation categories understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationType {
    Private = 1,
    Discussion = 2,
    Group = 3,
    Chatroom = 4,
    CustomerService = 5,
    System = 6,
    UltraGroup = 10,
}

impl ConversationType {
    /// Wire code of this conversation type.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Types accepted by the notification-level endpoints.
    fn accepts_push_level(self) -> bool {
        matches!(
            self,
            Self::Private | Self::Group | Self::System | Self::UltraGroup
        )
    }
}

/// Push notification levels a conversation can be set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushNotificationLevel {
    /// Every message notifies.
    All = -1,
    NotSet = 0,
    /// Only messages mentioning the user notify.
    MentionOnly = 1,
    /// Only messages mentioning specific users notify.
    MentionUsers = 2,
    /// Only messages mentioning everyone notify.
    MentionAll = 4,
    /// No message notifies.
    Blocked = 5,
}

impl PushNotificationLevel {
    /// Wire code of this level.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a reported code back to the enum. Codes the platform does not
    /// document map to `NotSet`.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::All,
            1 => Self::MentionOnly,
            2 => Self::MentionUsers,
            4 => Self::MentionAll,
            5 => Self::Blocked,
            _ => Self::NotSet,
        }
    }
}

/// Both the mute and the level endpoints report through `isMuted`.
#[derive(Debug, Default, Deserialize)]
struct NotificationStatus {
    #[serde(
        default,
        rename = "isMuted",
        deserialize_with = "crate::response::lenient_i64"
    )]
    is_muted: i64,
}

impl NimbusClient {
    /// Stops push delivery for one conversation of `user_id`.
    pub async fn mute_conversation(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
    ) -> Result<()> {
        self.set_conversation_mute(conversation_type, user_id, target_id, bus_channel, true)
            .await
    }

    /// Restores push delivery for one conversation of `user_id`.
    pub async fn unmute_conversation(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
    ) -> Result<()> {
        self.set_conversation_mute(conversation_type, user_id, target_id, bus_channel, false)
            .await
    }

    async fn set_conversation_mute(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
        muted: bool,
    ) -> Result<()> {
        require("user_id", user_id)?;
        require("target_id", target_id)?;
        let call = ApiCall::legacy("conversation/notification/set")
            .param("requestId", user_id)
            .param("conversationType", conversation_type.code().to_string())
            .param("targetId", target_id)
            .param("isMuted", if muted { "1" } else { "0" })
            .param_opt("busChannel", bus_channel);
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Whether push delivery is muted for one conversation of `user_id`.
    pub async fn is_conversation_muted(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
    ) -> Result<bool> {
        require("user_id", user_id)?;
        require("target_id", target_id)?;
        let call = ApiCall::legacy("conversation/notification/get")
            .param("requestId", user_id)
            .param("conversationType", conversation_type.code().to_string())
            .param("targetId", target_id)
            .param_opt("busChannel", bus_channel);
        let body = self.execute_legacy(call).await?;
        let status: NotificationStatus = response::decode_legacy(&body)?;
        Ok(status.is_muted != 0)
    }

    /// Sets the mute flag together with a notification level for a single
    /// conversation. Only private, group, system and ultra group
    /// conversations carry levels.
    pub async fn set_notification_level(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
        muted: bool,
        level: PushNotificationLevel,
    ) -> Result<()> {
        if !conversation_type.accepts_push_level() {
            return Err(NimbusError::parameter(
                "parameter 'conversation_type' does not support notification levels",
            ));
        }
        require("user_id", user_id)?;
        require("target_id", target_id)?;
        let call = ApiCall::legacy("conversation/notification/set")
            .param("conversationType", conversation_type.code().to_string())
            .param("requestId", user_id)
            .param("targetId", target_id)
            .param("isMuted", if muted { "1" } else { "0" })
            .param("unpushLevel", level.code().to_string())
            .param_opt("busChannel", bus_channel);
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Reads the notification level of a single conversation.
    pub async fn notification_level(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        target_id: &str,
        bus_channel: Option<&str>,
    ) -> Result<PushNotificationLevel> {
        if !conversation_type.accepts_push_level() {
            return Err(NimbusError::parameter(
                "parameter 'conversation_type' does not support notification levels",
            ));
        }
        require("user_id", user_id)?;
        require("target_id", target_id)?;
        let call = ApiCall::legacy("conversation/notification/get")
            .param("conversationType", conversation_type.code().to_string())
            .param("requestId", user_id)
            .param("targetId", target_id)
            .param_opt("busChannel", bus_channel);
        let body = self.execute_legacy(call).await?;
        let status: NotificationStatus = response::decode_legacy(&body)?;
        Ok(PushNotificationLevel::from_code(status.is_muted as i32))
    }

    /// Sets the notification level applied to every conversation of one
    /// type at once.
    pub async fn set_type_notification_level(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
        level: PushNotificationLevel,
    ) -> Result<()> {
        if !conversation_type.accepts_push_level() {
            return Err(NimbusError::parameter(
                "parameter 'conversation_type' does not support notification levels",
            ));
        }
        require("user_id", user_id)?;
        let call = ApiCall::legacy("conversation/type/notification/set")
            .param("conversationType", conversation_type.code().to_string())
            .param("requestId", user_id)
            .param("unpushLevel", level.code().to_string());
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Reads the per-type notification level configured for `user_id`.
    pub async fn type_notification_level(
        &self,
        conversation_type: ConversationType,
        user_id: &str,
    ) -> Result<PushNotificationLevel> {
        if !conversation_type.accepts_push_level() {
            return Err(NimbusError::parameter(
                "parameter 'conversation_type' does not support notification levels",
            ));
        }
        require("user_id", user_id)?;
        let call = ApiCall::legacy("conversation/type/notification/get")
            .param("conversationType", conversation_type.code().to_string())
            .param("requestId", user_id);
        let body = self.execute_legacy(call).await?;
        let status: NotificationStatus = response::decode_legacy(&body)?;
        Ok(PushNotificationLevel::from_code(status.is_muted as i32))
    }
}
