use std::collections::HashSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use persona_common::get_current_timestamp;

use crate::backend::AssetStore;
use crate::character::OwnerKind;
use crate::error::PipelineError;

/// Functional bucket under a character's storage folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Avatar,
    Images,
    Variations,
    Embeddings,
    Generations,
}

impl AssetRole {
    pub const ALL: [AssetRole; 5] = [
        AssetRole::Avatar,
        AssetRole::Images,
        AssetRole::Variations,
        AssetRole::Embeddings,
        AssetRole::Generations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Avatar => "avatar",
            AssetRole::Images => "images",
            AssetRole::Variations => "variations",
            AssetRole::Embeddings => "embeddings",
            AssetRole::Generations => "generations",
        }
    }
}

/// Lowercase and collapse non-alphanumeric runs to one separator.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "character".to_string()
    } else {
        out
    }
}

/// A published image. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAsset {
    /// Backend-side filename the bytes came from.
    pub source_ref: String,
    pub published_url: String,
    /// Full storage key under the owner's folder.
    pub owner_path: String,
    pub seed_used: u32,
    pub role: AssetRole,
    pub created_at: u64,
}

/// Uploads finished images under the deterministic
/// `{owner}/{characters|premade_characters}/{slug}/{role}/{file}` layout.
pub struct AssetPublisher<S: AssetStore> {
    store: S,
    provisioned: Mutex<HashSet<String>>,
}

impl<S: AssetStore> AssetPublisher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            provisioned: Mutex::new(HashSet::new()),
        }
    }

    fn character_root(owner_id: &str, owner_kind: OwnerKind, character_name: &str) -> String {
        format!("{}/{}/{}", owner_id, owner_kind.folder(), slug(character_name))
    }

    /// Drop one placeholder object per role subfolder so the character's
    /// tree exists before the first real upload. Idempotent; memoized per
    /// character for the lifetime of this publisher.
    async fn ensure_folders(&self, root: &str) -> Result<(), PipelineError> {
        {
            let provisioned = self.provisioned.lock().expect("provision set lock poisoned");
            if provisioned.contains(root) {
                return Ok(());
            }
        }

        for role in AssetRole::ALL {
            let key = format!("{}/{}/.keep", root, role.as_str());
            self.store
                .put_object(&key, Vec::new(), "application/octet-stream")
                .await
                .map_err(|e| PipelineError::Publish(format!("folder provisioning failed: {e:#}")))?;
        }

        self.provisioned
            .lock()
            .expect("provision set lock poisoned")
            .insert(root.to_string());
        Ok(())
    }

    /// Single atomic upload; failure surfaces as a publish error with no
    /// partial state.
    pub async fn publish(
        &self,
        data: Vec<u8>,
        source_ref: &str,
        owner_id: &str,
        owner_kind: OwnerKind,
        character_name: &str,
        role: AssetRole,
        seed_used: u32,
    ) -> Result<GeneratedAsset, PipelineError> {
        let root = Self::character_root(owner_id, owner_kind, character_name);
        self.ensure_folders(&root).await?;

        let file_name = source_ref.rsplit('/').next().unwrap_or(source_ref);
        let key = format!("{}/{}/{}", root, role.as_str(), file_name);

        let published_url = self
            .store
            .put_object(&key, data, "image/png")
            .await
            .map_err(|e| PipelineError::Publish(format!("{e:#}")))?;

        tracing::info!("[AssetPublisher::publish] uploaded {key}");

        Ok(GeneratedAsset {
            source_ref: source_ref.to_string(),
            published_url,
            owner_path: key,
            seed_used,
            role,
            created_at: get_current_timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_slug_collapses_non_alphanumeric_runs() {
        assert_eq!(slug("Aria"), "aria");
        assert_eq!(slug("Lady  Von--Dracul!"), "lady_von_dracul");
        assert_eq!(slug("  -- spaced out -- "), "spaced_out");
        assert_eq!(slug("!!!"), "character");
    }

    #[test]
    fn test_slug_keeps_distinct_unicode_names_distinct() {
        assert_eq!(slug("雪"), "雪");
        assert_eq!(slug("Müller Éclair"), "müller_éclair");
        assert_ne!(slug("雪"), slug("月"));
    }

    #[derive(Clone, Default)]
    struct RecordingStore {
        keys: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl AssetStore for RecordingStore {
        async fn put_object(
            &self,
            key: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> anyhow::Result<String> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("https://assets.test/{key}"))
        }
    }

    #[tokio::test]
    async fn test_publish_uses_owner_path_convention() {
        let store = RecordingStore::default();
        let publisher = AssetPublisher::new(store.clone());

        let asset = publisher
            .publish(
                vec![1, 2, 3],
                "aria_abc123_00001_.png",
                "owner-1",
                OwnerKind::User,
                "Aria",
                AssetRole::Avatar,
                42,
            )
            .await
            .unwrap();

        assert_eq!(asset.owner_path, "owner-1/characters/aria/avatar/aria_abc123_00001_.png");
        assert_eq!(
            asset.published_url,
            "https://assets.test/owner-1/characters/aria/avatar/aria_abc123_00001_.png"
        );
        assert_eq!(asset.seed_used, 42);
    }

    #[tokio::test]
    async fn test_folders_provisioned_once_per_character() {
        let store = RecordingStore::default();
        let publisher = AssetPublisher::new(store.clone());

        for _ in 0..2 {
            publisher
                .publish(
                    Vec::new(),
                    "aria_x_00001_.png",
                    "owner-1",
                    OwnerKind::Premade,
                    "Aria",
                    AssetRole::Images,
                    7,
                )
                .await
                .unwrap();
        }

        let keys = store.keys.lock().unwrap();
        let keeps = keys.iter().filter(|k| k.ends_with(".keep")).count();
        assert_eq!(keeps, AssetRole::ALL.len());
        assert!(keys
            .iter()
            .any(|k| k == "owner-1/premade_characters/aria/images/aria_x_00001_.png"));
    }
}
