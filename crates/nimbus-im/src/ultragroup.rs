//! Ultra group operations.
//!
//! The group lifecycle, membership and channel endpoints speak the REST
//! protocol and all yield the per-call request identifier. The message
//! expansion and publish endpoints predate the REST surface and still
//! speak the legacy protocol.

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::client::NimbusClient;
use crate::error::{require, NimbusError, Result};
use crate::protocol::{ApiCall, RequestId};
use crate::response;

/// Most group targets a single publish call may address.
pub const MAX_PUBLISH_GROUP_TARGETS: usize = 3;
/// Most expansion entries or keys a single expansion call may carry.
pub const MAX_EXPANSION_KEYS: usize = 100;

/// Group record returned by membership queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UltraGroupInfo {
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub group_id: String,
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub group_name: String,
}

/// Member record. `muted_until` is only populated by muted-member queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UltraGroupMember {
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub id: String,
    #[serde(
        default,
        rename = "time",
        deserialize_with = "crate::response::lenient_string"
    )]
    pub muted_until: String,
}

/// Channel record returned by channel queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UltraGroupChannel {
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub create_time: String,
}

/// One expansion entry attached to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExpansionItem {
    pub key: String,
    pub value: String,
    pub timestamp: i64,
}

/// Message for the REST send endpoint. Serialized as the endpoint's
/// snake_case JSON body; unset optional fields and cleared flags are
/// omitted, except `store_flag` which the endpoint always wants to see.
#[derive(Debug, Clone, Serialize)]
pub struct UltraGroupMessage {
    pub from_user_id: String,
    pub to_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_user_ids: Vec<String>,
    pub object_name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_data: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub include_sender_enable: bool,
    pub store_flag: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub mentioned_flag: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub silence_push: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_channel: Option<String>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl UltraGroupMessage {
    /// A plain stored message; flags start cleared and optional push
    /// fields unset.
    pub fn new(
        from_user_id: impl Into<String>,
        to_group_ids: Vec<String>,
        object_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_group_ids,
            to_user_ids: Vec::new(),
            object_name: object_name.into(),
            content: content.into(),
            push_content: None,
            push_data: None,
            include_sender_enable: false,
            store_flag: false,
            mentioned_flag: false,
            silence_push: false,
            push_ext: None,
            bus_channel: None,
        }
    }
}

/// Push extension settings for the legacy publish endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushExt {
    pub title: String,
    pub template_id: String,
    pub force_show_push_content: i32,
    pub push_configs: Vec<HashMap<String, HashMap<String, String>>>,
}

/// Parameters of the legacy publish endpoint.
#[derive(Debug, Clone)]
pub struct UltraGroupPublish {
    pub from_user_id: String,
    pub to_group_ids: Vec<String>,
    pub object_name: String,
    pub content: String,
    pub push_content: Option<String>,
    pub push_data: Option<String>,
    pub is_persisted: Option<bool>,
    pub is_mentioned: Option<bool>,
    pub content_available: Option<bool>,
    pub bus_channel: Option<String>,
    /// Opt into message expansion; `extra_content` is only sent when set.
    pub expansion: bool,
    pub extra_content: Option<String>,
    pub push_ext: Option<PushExt>,
}

impl UltraGroupPublish {
    pub fn new(
        from_user_id: impl Into<String>,
        to_group_ids: Vec<String>,
        object_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_group_ids,
            object_name: object_name.into(),
            content: content.into(),
            push_content: None,
            push_data: None,
            is_persisted: None,
            is_mentioned: None,
            content_available: None,
            bus_channel: None,
            expansion: false,
            extra_content: None,
            push_ext: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GroupListData {
    #[serde(default, deserialize_with = "crate::response::null_as_default")]
    groups: Vec<UltraGroupInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct UserListData {
    #[serde(default, deserialize_with = "crate::response::null_as_default")]
    users: Vec<UltraGroupMember>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelListData {
    #[serde(default, deserialize_with = "crate::response::null_as_default")]
    channel_list: Vec<UltraGroupChannel>,
}

#[derive(Debug, Default, Deserialize)]
struct MutedStatusData {
    #[serde(default, deserialize_with = "crate::response::lenient_bool")]
    status: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ExpansionContent {
    #[serde(
        default,
        rename = "extraContent",
        deserialize_with = "crate::response::null_as_default"
    )]
    extra_content: HashMap<String, ExpansionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpansionEntry {
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    v: String,
    #[serde(default, deserialize_with = "crate::response::lenient_i64")]
    ts: i64,
}

impl NimbusClient {
    /// Creates an ultra group and places its creator inside.
    pub async fn create_ultra_group(
        &self,
        user_id: &str,
        group_id: &str,
        group_name: &str,
    ) -> Result<RequestId> {
        require("user_id", user_id)?;
        require("group_id", group_id)?;
        require("group_name", group_name)?;
        let call = ApiCall::rest(Method::POST, "/v2/ultragroups").json(json!({
            "user_id": user_id,
            "group_id": group_id,
            "group_name": group_name,
        }));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        info!("created ultra group {} (request {})", group_id, request_id);
        Ok(request_id)
    }

    /// Dismisses an ultra group; its members and channels go with it.
    pub async fn dismiss_ultra_group(&self, group_id: &str) -> Result<RequestId> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::DELETE, format!("/v2/ultragroups/{group_id}"));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        info!("dismissed ultra group {} (request {})", group_id, request_id);
        Ok(request_id)
    }

    /// Adds `user_id` to an ultra group.
    pub async fn join_ultra_group(&self, user_id: &str, group_id: &str) -> Result<RequestId> {
        require("user_id", user_id)?;
        require("group_id", group_id)?;
        let call = ApiCall::rest(
            Method::POST,
            format!("/v2/ultragroups/{group_id}/users/{user_id}"),
        );
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Removes `user_id` from an ultra group.
    pub async fn quit_ultra_group(&self, user_id: &str, group_id: &str) -> Result<RequestId> {
        require("user_id", user_id)?;
        require("group_id", group_id)?;
        let call = ApiCall::rest(
            Method::DELETE,
            format!("/v2/ultragroups/{group_id}/users/{user_id}"),
        );
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Renames an ultra group.
    pub async fn update_ultra_group(&self, group_id: &str, group_name: &str) -> Result<RequestId> {
        require("group_id", group_id)?;
        require("group_name", group_name)?;
        let call = ApiCall::rest(Method::PUT, format!("/v2/ultragroups/{group_id}"))
            .json(json!({ "group_name": group_name }));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Pages through the ultra groups `user_id` belongs to.
    pub async fn user_ultra_groups(
        &self,
        user_id: &str,
        page: u32,
        size: u32,
    ) -> Result<(Vec<UltraGroupInfo>, RequestId)> {
        require("user_id", user_id)?;
        let call = ApiCall::rest(Method::GET, format!("/v2/ultragroups/users/{user_id}/groups"))
            .query("page", page.to_string())
            .query("size", size.to_string());
        let (body, request_id) = self.execute_rest(call).await?;
        let data: GroupListData = response::decode_rest(&body, &request_id)?;
        Ok((data.groups, request_id))
    }

    /// Pages through the members of an ultra group.
    pub async fn ultra_group_members(
        &self,
        group_id: &str,
        page: u32,
        size: u32,
    ) -> Result<(Vec<UltraGroupMember>, RequestId)> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::GET, format!("/v2/ultragroups/{group_id}/users"))
            .query("page", page.to_string())
            .query("size", size.to_string());
        let (body, request_id) = self.execute_rest(call).await?;
        let data: UserListData = response::decode_rest(&body, &request_id)?;
        Ok((data.users, request_id))
    }

    /// Sends a message through the REST send endpoint.
    pub async fn send_ultra_group_message(&self, message: &UltraGroupMessage) -> Result<RequestId> {
        require("from_user_id", &message.from_user_id)?;
        require("object_name", &message.object_name)?;
        if message.to_group_ids.is_empty() {
            return Err(NimbusError::required("to_group_ids"));
        }
        let call = ApiCall::rest(Method::POST, "/v2/message/ultragroup/send")
            .json(serde_json::to_value(message)?);
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Mutes specific members of an ultra group.
    pub async fn add_ultra_group_muted_members(
        &self,
        group_id: &str,
        user_ids: Vec<String>,
    ) -> Result<RequestId> {
        self.member_list_update(Method::POST, "muted-users", group_id, user_ids)
            .await
    }

    /// Lifts the member-level mute from specific members.
    pub async fn remove_ultra_group_muted_members(
        &self,
        group_id: &str,
        user_ids: Vec<String>,
    ) -> Result<RequestId> {
        self.member_list_update(Method::DELETE, "muted-users", group_id, user_ids)
            .await
    }

    /// Members currently muted in an ultra group.
    pub async fn ultra_group_muted_members(
        &self,
        group_id: &str,
    ) -> Result<(Vec<UltraGroupMember>, RequestId)> {
        self.member_list_query("muted-users", group_id).await
    }

    /// Exempts specific members from a group-wide mute.
    pub async fn add_ultra_group_allowed_members(
        &self,
        group_id: &str,
        user_ids: Vec<String>,
    ) -> Result<RequestId> {
        self.member_list_update(Method::POST, "allowed-users", group_id, user_ids)
            .await
    }

    /// Withdraws the group-wide mute exemption from specific members.
    pub async fn remove_ultra_group_allowed_members(
        &self,
        group_id: &str,
        user_ids: Vec<String>,
    ) -> Result<RequestId> {
        self.member_list_update(Method::DELETE, "allowed-users", group_id, user_ids)
            .await
    }

    /// Members exempted from a group-wide mute.
    pub async fn ultra_group_allowed_members(
        &self,
        group_id: &str,
    ) -> Result<(Vec<UltraGroupMember>, RequestId)> {
        self.member_list_query("allowed-users", group_id).await
    }

    async fn member_list_update(
        &self,
        method: Method,
        resource: &str,
        group_id: &str,
        user_ids: Vec<String>,
    ) -> Result<RequestId> {
        require("group_id", group_id)?;
        if user_ids.is_empty() {
            return Err(NimbusError::required("user_ids"));
        }
        let call = ApiCall::rest(method, format!("/v2/ultragroups/{group_id}/{resource}"))
            .json(json!({ "user_ids": user_ids }));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    async fn member_list_query(
        &self,
        resource: &str,
        group_id: &str,
    ) -> Result<(Vec<UltraGroupMember>, RequestId)> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::GET, format!("/v2/ultragroups/{group_id}/{resource}"));
        let (body, request_id) = self.execute_rest(call).await?;
        let data: UserListData = response::decode_rest(&body, &request_id)?;
        Ok((data.users, request_id))
    }

    /// Mutes or unmutes every member of an ultra group at once.
    pub async fn set_ultra_group_muted(&self, group_id: &str, muted: bool) -> Result<RequestId> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::PUT, format!("/v2/ultragroups/{group_id}/muted-status"))
            .json(json!({ "status": muted }));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Whether the whole ultra group is muted.
    pub async fn ultra_group_muted(&self, group_id: &str) -> Result<(bool, RequestId)> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::GET, format!("/v2/ultragroups/{group_id}/muted-status"));
        let (body, request_id) = self.execute_rest(call).await?;
        let data: MutedStatusData = response::decode_rest(&body, &request_id)?;
        Ok((data.status, request_id))
    }

    /// Creates a channel inside an ultra group.
    pub async fn create_ultra_group_channel(
        &self,
        group_id: &str,
        channel_id: &str,
    ) -> Result<RequestId> {
        require("group_id", group_id)?;
        require("channel_id", channel_id)?;
        let call = ApiCall::rest(Method::POST, "/v2/ultragroups/channels").json(json!({
            "group_id": group_id,
            "channel_id": channel_id,
        }));
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Deletes a channel and the messages under it.
    pub async fn delete_ultra_group_channel(
        &self,
        group_id: &str,
        channel_id: &str,
    ) -> Result<RequestId> {
        require("group_id", group_id)?;
        require("channel_id", channel_id)?;
        let call = ApiCall::rest(
            Method::DELETE,
            format!("/v2/ultragroups/{group_id}/channels/{channel_id}"),
        );
        let (body, request_id) = self.execute_rest(call).await?;
        response::rest_ack(&body, &request_id)?;
        Ok(request_id)
    }

    /// Pages through the channels of an ultra group.
    pub async fn ultra_group_channels(
        &self,
        group_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<UltraGroupChannel>, RequestId)> {
        require("group_id", group_id)?;
        let call = ApiCall::rest(Method::GET, format!("/v2/ultragroups/{group_id}/channels"))
            .query("page", page.to_string())
            .query("limit", limit.to_string());
        let (body, request_id) = self.execute_rest(call).await?;
        let data: ChannelListData = response::decode_rest(&body, &request_id)?;
        Ok((data.channel_list, request_id))
    }

    /// Attaches expansion key/value pairs to a delivered message.
    pub async fn set_ultra_group_message_expansion(
        &self,
        group_id: &str,
        user_id: &str,
        message_uid: &str,
        bus_channel: &str,
        extra: &HashMap<String, String>,
    ) -> Result<()> {
        require("group_id", group_id)?;
        require("user_id", user_id)?;
        require("message_uid", message_uid)?;
        require("bus_channel", bus_channel)?;
        if extra.is_empty() {
            return Err(NimbusError::required("extra"));
        }
        if extra.len() > MAX_EXPANSION_KEYS {
            return Err(NimbusError::parameter(format!(
                "parameter 'extra' takes at most {MAX_EXPANSION_KEYS} entries"
            )));
        }
        let call = ApiCall::legacy("ultragroup/message/expansion/set")
            .param("msgUID", message_uid)
            .param("busChannel", bus_channel)
            .param("userId", user_id)
            .param("groupId", group_id)
            .param("extraKeyVal", serde_json::to_string(extra)?);
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Removes expansion keys from a delivered message.
    pub async fn delete_ultra_group_message_expansion(
        &self,
        group_id: &str,
        user_id: &str,
        message_uid: &str,
        bus_channel: &str,
        keys: Vec<String>,
    ) -> Result<()> {
        require("group_id", group_id)?;
        require("user_id", user_id)?;
        require("message_uid", message_uid)?;
        require("bus_channel", bus_channel)?;
        if keys.is_empty() {
            return Err(NimbusError::required("keys"));
        }
        if keys.len() > MAX_EXPANSION_KEYS {
            return Err(NimbusError::parameter(format!(
                "parameter 'keys' takes at most {MAX_EXPANSION_KEYS} entries"
            )));
        }
        let call = ApiCall::legacy("ultragroup/message/expansion/delete")
            .param("msgUID", message_uid)
            .param("busChannel", bus_channel)
            .param("userId", user_id)
            .param("groupId", group_id)
            .param("extraKey", serde_json::to_string(&keys)?);
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Reads the expansion entries attached to a message.
    pub async fn ultra_group_message_expansion(
        &self,
        group_id: &str,
        message_uid: &str,
    ) -> Result<Vec<MessageExpansionItem>> {
        require("group_id", group_id)?;
        require("message_uid", message_uid)?;
        let call = ApiCall::legacy("ultragroup/message/expansion/query")
            .param("msgUID", message_uid)
            .param("groupId", group_id);
        let body = self.execute_legacy(call).await?;
        let content: ExpansionContent = response::decode_legacy(&body)?;
        let items = content
            .extra_content
            .into_iter()
            .map(|(key, entry)| MessageExpansionItem {
                key,
                value: entry.v,
                timestamp: entry.ts,
            })
            .collect();
        Ok(items)
    }

    /// Publishes a message through the legacy endpoint, optionally carrying
    /// expansion content and push extensions.
    pub async fn publish_ultra_group_message(&self, publish: &UltraGroupPublish) -> Result<()> {
        require("from_user_id", &publish.from_user_id)?;
        require("object_name", &publish.object_name)?;
        require("content", &publish.content)?;
        if publish.to_group_ids.is_empty() || publish.to_group_ids.len() > MAX_PUBLISH_GROUP_TARGETS
        {
            return Err(NimbusError::parameter(format!(
                "parameter 'to_group_ids' takes 1 to {MAX_PUBLISH_GROUP_TARGETS} groups"
            )));
        }
        let mut call = ApiCall::legacy("message/ultragroup/publish")
            .param("fromUserId", publish.from_user_id.as_str())
            .param("toGroupIds", serde_json::to_string(&publish.to_group_ids)?)
            .param("objectName", publish.object_name.as_str())
            .param("content", publish.content.as_str())
            .param("expansion", publish.expansion.to_string())
            .param_opt("pushContent", publish.push_content.as_deref())
            .param_opt("pushData", publish.push_data.as_deref());
        if let Some(persisted) = publish.is_persisted {
            call = call.param("isPersisted", if persisted { "1" } else { "0" });
        }
        if let Some(mentioned) = publish.is_mentioned {
            call = call.param("isMentioned", if mentioned { "1" } else { "0" });
        }
        if let Some(available) = publish.content_available {
            call = call.param("contentAvailable", if available { "1" } else { "0" });
        }
        // this endpoint alone spells the channel key in lowercase
        call = call.param_opt("buschannel", publish.bus_channel.as_deref());
        if publish.expansion {
            call = call.param_opt("extraContent", publish.extra_content.as_deref());
        }
        if let Some(push_ext) = &publish.push_ext {
            call = call.param("pushExt", serde_json::to_string(push_ext)?);
        }
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        self, HEADER_REST_NONCE, HEADER_REST_REQUEST_ID, HEADER_REST_SIGNATURE,
        HEADER_REST_TIMESTAMP,
    };
    use crate::error::CODE_INVALID_PARAMETER;
    use crate::test_support::{form_value, header_str, test_client, TEST_APP_SECRET};
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_envelope() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"code": 200}))
    }

    #[tokio::test]
    async fn create_posts_the_json_body_and_returns_the_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let request_id = client
            .create_ultra_group("u1", "g1", "general")
            .await
            .unwrap();
        assert!(!request_id.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            body,
            json!({"user_id": "u1", "group_id": "g1", "group_name": "general"})
        );
        assert_eq!(header_str(request, HEADER_REST_REQUEST_ID), request_id);
        let nonce = header_str(request, HEADER_REST_NONCE);
        let timestamp = header_str(request, HEADER_REST_TIMESTAMP);
        assert_eq!(
            header_str(request, HEADER_REST_SIGNATURE),
            auth::sign(TEST_APP_SECRET, &nonce, &timestamp)
        );
    }

    #[tokio::test]
    async fn create_with_empty_group_name_fails_locally() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        let err = client.create_ultra_group("u1", "g1", "").await.unwrap_err();
        match err {
            NimbusError::InvalidParameter { code, message } => {
                assert_eq!(code, CODE_INVALID_PARAMETER);
                assert!(message.contains("group_name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_calls_hit_the_documented_paths() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/ultragroups/g1"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups/g1/users/u1"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/ultragroups/g1/users/u1"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v2/ultragroups/g1"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.join_ultra_group("u1", "g1").await.unwrap();
        client.quit_ultra_group("u1", "g1").await.unwrap();
        client.update_ultra_group("g1", "renamed").await.unwrap();
        client.dismiss_ultra_group("g1").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 4);
        let update: Value = serde_json::from_slice(&requests[2].body).unwrap();
        assert_eq!(update, json!({"group_name": "renamed"}));
    }

    #[tokio::test]
    async fn group_queries_page_and_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/users/u1/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"groups": [
                    {"group_id": "g1", "group_name": "general"},
                    {"group_id": 2, "group_name": null}
                ]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let (groups, request_id) = client.user_ultra_groups("u1", 1, 20).await.unwrap();
        assert!(!request_id.is_empty());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_id, "g1");
        assert_eq!(groups[0].group_name, "general");
        assert_eq!(groups[1].group_id, "2");
        assert_eq!(groups[1].group_name, "");

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(request.url.query(), Some("page=1&size=20"));
    }

    #[tokio::test]
    async fn member_queries_tolerate_loose_typing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"users": [{"id": 7}, {"id": "u2"}]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let (members, _) = client.ultra_group_members("g1", 1, 50).await.unwrap();
        assert_eq!(members[0].id, "7");
        assert_eq!(members[1].id, "u2");

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(request.url.query(), Some("page=1&size=50"));
    }

    #[tokio::test]
    async fn empty_member_lists_decode_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g1/muted-users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"users": []}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g2/muted-users"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g3/muted-users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"users": null}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let (members, _) = client.ultra_group_muted_members("g1").await.unwrap();
        assert!(members.is_empty());
        let (members, _) = client.ultra_group_muted_members("g2").await.unwrap();
        assert!(members.is_empty());
        let (members, _) = client.ultra_group_muted_members("g3").await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn roster_updates_carry_the_user_id_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups/g1/muted-users"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/ultragroups/g1/allowed-users"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .add_ultra_group_muted_members("g1", vec!["u1".to_string(), "u2".to_string()])
            .await
            .unwrap();
        client
            .remove_ultra_group_allowed_members("g1", vec!["u3".to_string()])
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body, json!({"user_ids": ["u1", "u2"]}));
        let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(body, json!({"user_ids": ["u3"]}));

        let err = client
            .add_ultra_group_muted_members("g1", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NimbusError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn group_mute_status_coerces_strings() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/ultragroups/g1/muted-status"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g1/muted-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"status": "true"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.set_ultra_group_muted("g1", true).await.unwrap();
        let (muted, _) = client.ultra_group_muted("g1").await.unwrap();
        assert!(muted);

        let put: Value =
            serde_json::from_slice(&server.received_requests().await.unwrap()[0].body).unwrap();
        assert_eq!(put, json!({"status": true}));
    }

    #[tokio::test]
    async fn channel_lifecycle_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups/channels"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/ultragroups/g1/channels/c1"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/ultragroups/g1/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"channel_list": [
                    {"channel_id": "c1", "create_time": "2024-05-01 10:00:00"}
                ]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.create_ultra_group_channel("g1", "c1").await.unwrap();
        let (channels, _) = client.ultra_group_channels("g1", 1, 20).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].channel_id, "c1");
        assert_eq!(channels[0].create_time, "2024-05-01 10:00:00");
        client.delete_ultra_group_channel("g1", "c1").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let create: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(create, json!({"group_id": "g1", "channel_id": "c1"}));
        assert_eq!(requests[1].url.query(), Some("page=1&limit=20"));
    }

    #[tokio::test]
    async fn rest_rejections_carry_code_message_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 404, "errorMessage": "not found"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .create_ultra_group("u1", "g1", "general")
            .await
            .unwrap_err();
        let sent_id = header_str(
            &server.received_requests().await.unwrap()[0],
            HEADER_REST_REQUEST_ID,
        );
        match err {
            NimbusError::Api {
                origin,
                code,
                message,
                request_id,
            } => {
                assert_eq!(origin, crate::protocol::Protocol::Rest);
                assert_eq!(code, 404);
                assert_eq!(message, "not found");
                assert_eq!(request_id.as_deref(), Some(sent_id.as_str()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn decode_failures_keep_the_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ultragroups"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .create_ultra_group("u1", "g1", "general")
            .await
            .unwrap_err();
        let sent_id = header_str(
            &server.received_requests().await.unwrap()[0],
            HEADER_REST_REQUEST_ID,
        );
        assert!(matches!(err, NimbusError::Json { .. }));
        assert_eq!(err.request_id(), Some(sent_id.as_str()));
    }

    #[tokio::test]
    async fn send_serializes_optional_fields_only_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/message/ultragroup/send"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let message = UltraGroupMessage::new("u1", vec!["g1".to_string()], "NB:TxtMsg", "hello");
        client.send_ultra_group_message(&message).await.unwrap();

        let body: Value =
            serde_json::from_slice(&server.received_requests().await.unwrap()[0].body).unwrap();
        assert_eq!(
            body,
            json!({
                "from_user_id": "u1",
                "to_group_ids": ["g1"],
                "object_name": "NB:TxtMsg",
                "content": "hello",
                "store_flag": false
            })
        );

        let mut message = message;
        message.include_sender_enable = true;
        message.silence_push = true;
        client.send_ultra_group_message(&message).await.unwrap();

        let body: Value =
            serde_json::from_slice(&server.received_requests().await.unwrap()[1].body).unwrap();
        assert_eq!(
            body,
            json!({
                "from_user_id": "u1",
                "to_group_ids": ["g1"],
                "object_name": "NB:TxtMsg",
                "content": "hello",
                "include_sender_enable": true,
                "store_flag": false,
                "silence_push": true
            })
        );
    }

    #[tokio::test]
    async fn publish_enforces_the_group_target_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/ultragroup/publish.json"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let over = UltraGroupPublish::new(
            "u1",
            vec!["g1".into(), "g2".into(), "g3".into(), "g4".into()],
            "NB:TxtMsg",
            "{\"content\":\"hi\"}",
        );
        let err = client.publish_ultra_group_message(&over).await.unwrap_err();
        match err {
            NimbusError::InvalidParameter { code, .. } => assert_eq!(code, CODE_INVALID_PARAMETER),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(server.received_requests().await.unwrap().is_empty());

        let mut publish = UltraGroupPublish::new(
            "u1",
            vec!["g1".into(), "g2".into(), "g3".into()],
            "NB:TxtMsg",
            "{\"content\":\"hi\"}",
        );
        publish.is_persisted = Some(true);
        publish.bus_channel = Some("ops".to_string());
        client.publish_ultra_group_message(&publish).await.unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(
            form_value(&request.body, "toGroupIds").as_deref(),
            Some(r#"["g1","g2","g3"]"#)
        );
        assert_eq!(
            form_value(&request.body, "isPersisted").as_deref(),
            Some("1")
        );
        assert_eq!(form_value(&request.body, "buschannel").as_deref(), Some("ops"));
        assert_eq!(form_value(&request.body, "busChannel"), None);
        assert_eq!(
            form_value(&request.body, "expansion").as_deref(),
            Some("false")
        );
        assert_eq!(form_value(&request.body, "extraContent"), None);
    }

    #[tokio::test]
    async fn publish_sends_expansion_and_push_ext_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/ultragroup/publish.json"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut publish = UltraGroupPublish::new(
            "u1",
            vec!["g1".into()],
            "NB:TxtMsg",
            "{\"content\":\"hi\"}",
        );
        publish.expansion = true;
        publish.extra_content = Some(r#"{"k":"v"}"#.to_string());
        publish.push_ext = Some(PushExt {
            title: "title".to_string(),
            template_id: "t1".to_string(),
            force_show_push_content: 1,
            push_configs: Vec::new(),
        });
        client.publish_ultra_group_message(&publish).await.unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(
            form_value(&request.body, "expansion").as_deref(),
            Some("true")
        );
        assert_eq!(
            form_value(&request.body, "extraContent").as_deref(),
            Some(r#"{"k":"v"}"#)
        );
        let push_ext: Value =
            serde_json::from_str(&form_value(&request.body, "pushExt").unwrap()).unwrap();
        assert_eq!(
            push_ext,
            json!({
                "title": "title",
                "templateId": "t1",
                "forceShowPushContent": 1,
                "pushConfigs": []
            })
        );
    }

    #[tokio::test]
    async fn expansion_set_enforces_the_key_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ultragroup/message/expansion/set.json"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let over: HashMap<String, String> = (0..=MAX_EXPANSION_KEYS)
            .map(|i| (format!("k{i}"), "v".to_string()))
            .collect();
        let err = client
            .set_ultra_group_message_expansion("g1", "u1", "uid1", "ch1", &over)
            .await
            .unwrap_err();
        assert!(matches!(err, NimbusError::InvalidParameter { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());

        let full: HashMap<String, String> = (0..MAX_EXPANSION_KEYS)
            .map(|i| (format!("k{i}"), "v".to_string()))
            .collect();
        client
            .set_ultra_group_message_expansion("g1", "u1", "uid1", "ch1", &full)
            .await
            .unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(form_value(&request.body, "msgUID").as_deref(), Some("uid1"));
        let sent: HashMap<String, String> =
            serde_json::from_str(&form_value(&request.body, "extraKeyVal").unwrap()).unwrap();
        assert_eq!(sent.len(), MAX_EXPANSION_KEYS);
    }

    #[tokio::test]
    async fn expansion_delete_sends_the_key_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ultragroup/message/expansion/delete.json"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .delete_ultra_group_message_expansion(
                "g1",
                "u1",
                "uid1",
                "ch1",
                vec!["k1".to_string(), "k2".to_string()],
            )
            .await
            .unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        assert_eq!(
            form_value(&request.body, "extraKey").as_deref(),
            Some(r#"["k1","k2"]"#)
        );

        let err = client
            .delete_ultra_group_message_expansion("g1", "u1", "uid1", "ch1", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NimbusError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn expansion_delete_enforces_the_key_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ultragroup/message/expansion/delete.json"))
            .respond_with(ok_envelope())
            .mount(&server)
            .await;

        let client = test_client(&server);
        let over: Vec<String> = (0..=MAX_EXPANSION_KEYS).map(|i| format!("k{i}")).collect();
        let err = client
            .delete_ultra_group_message_expansion("g1", "u1", "uid1", "ch1", over)
            .await
            .unwrap_err();
        assert!(matches!(err, NimbusError::InvalidParameter { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());

        let full: Vec<String> = (0..MAX_EXPANSION_KEYS).map(|i| format!("k{i}")).collect();
        client
            .delete_ultra_group_message_expansion("g1", "u1", "uid1", "ch1", full)
            .await
            .unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        let sent: Vec<String> =
            serde_json::from_str(&form_value(&request.body, "extraKey").unwrap()).unwrap();
        assert_eq!(sent.len(), MAX_EXPANSION_KEYS);
    }

    #[tokio::test]
    async fn expansion_query_flattens_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ultragroup/message/expansion/query.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "extraContent": {"k1": {"v": "v1", "ts": 1700000000123i64}}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let items = client
            .ultra_group_message_expansion("g1", "uid1")
            .await
            .unwrap();
        assert_eq!(
            items,
            vec![MessageExpansionItem {
                key: "k1".to_string(),
                value: "v1".to_string(),
                timestamp: 1700000000123,
            }]
        );
    }
}
