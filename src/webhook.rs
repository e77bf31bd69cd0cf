//! Forgejo / Gitea push event payload

use serde::{Deserialize, Deserializer};

use crate::error::Result;

const BRANCH_REF_PREFIX: &str = "refs/heads/";
const SHORT_COMMIT_LEN: usize = 7;

/// Subset of the push event the bridge forwards.
///
/// Every field defaults to empty so partial payloads still decode. Forgejo
/// sends `"head_commit": null` for branch deletions, so nulls decode as empty too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InboundWebhook {
    #[serde(rename = "ref", deserialize_with = "null_as_default")]
    pub git_ref: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repository: Repository,
    #[serde(deserialize_with = "null_as_default")]
    pub head_commit: HeadCommit,
    #[serde(deserialize_with = "null_as_default")]
    pub pusher: Pusher,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Repository {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeadCommit {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pusher {
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
}

impl InboundWebhook {
    /// Parse a raw request body.
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn branch(&self) -> &str {
        branch_from_ref(&self.git_ref)
    }

    pub fn short_commit(&self) -> &str {
        short_commit(&self.head_commit.id)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `refs/heads/main` -> `main`. Tags and other refs pass through untouched.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

/// First seven characters of a commit id, or the whole id if shorter.
pub fn short_commit(id: &str) -> &str {
    match id.char_indices().nth(SHORT_COMMIT_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
