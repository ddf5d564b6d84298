//! Sensitive-word moderation operations (legacy protocol).

use serde::Deserialize;

use crate::client::NimbusClient;
use crate::error::{require, NimbusError, Result};
use crate::protocol::ApiCall;
use crate::response;

/// Most words one batch delete may carry.
pub const MAX_WORD_BATCH: usize = 50;

/// A configured sensitive word.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensitiveWord {
    /// "0" replaces matches, "1" blocks the whole message.
    #[serde(
        default,
        rename = "type",
        deserialize_with = "crate::response::lenient_string"
    )]
    pub word_type: String,
    #[serde(default, deserialize_with = "crate::response::lenient_string")]
    pub word: String,
    #[serde(
        default,
        rename = "replaceWord",
        deserialize_with = "crate::response::lenient_string"
    )]
    pub replace_word: String,
}

#[derive(Debug, Default, Deserialize)]
struct WordListPayload {
    #[serde(default, deserialize_with = "crate::response::null_as_default")]
    words: Vec<SensitiveWord>,
}

impl NimbusClient {
    /// Registers a sensitive word. `Some` replacement rewrites matches in
    /// place; `None` blocks any message containing the word.
    pub async fn add_sensitive_word(&self, word: &str, replacement: Option<&str>) -> Result<()> {
        require("word", word)?;
        if let Some(replacement) = replacement {
            require("replacement", replacement)?;
        }
        let call = ApiCall::legacy("sensitiveword/add")
            .param("word", word)
            .param_opt("replaceWord", replacement);
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }

    /// Lists every configured sensitive word.
    pub async fn sensitive_words(&self) -> Result<Vec<SensitiveWord>> {
        let call = ApiCall::legacy("sensitiveword/list");
        let body = self.execute_legacy(call).await?;
        let payload: WordListPayload = response::decode_legacy(&body)?;
        Ok(payload.words)
    }

    /// Removes up to [`MAX_WORD_BATCH`] sensitive words in one call.
    pub async fn remove_sensitive_words(&self, words: Vec<String>) -> Result<()> {
        if words.is_empty() {
            return Err(NimbusError::required("words"));
        }
        if words.len() > MAX_WORD_BATCH {
            return Err(NimbusError::parameter(format!(
                "parameter 'words' takes at most {MAX_WORD_BATCH} entries"
            )));
        }
        let mut call = ApiCall::legacy("sensitiveword/batch/delete");
        for word in &words {
            call = call.param("words", word.as_str());
        }
        let body = self.execute_legacy(call).await?;
        response::legacy_ack(&body)
    }
}
