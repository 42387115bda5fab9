use crate::error::{BannerError, BannerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A promotional content record addressed by feature and tag identifiers.
///
/// This is also the exact value written to the cache, so every field must
/// survive a serde_json round trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Banner {
    pub id: u64,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub title: String,
    pub text: String,
    pub url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tag_ids.contains(&tag_id)
    }

    /// Cache keys this banner fans out to, one per tag.
    pub fn cache_keys(&self) -> impl Iterator<Item = CacheKey> + '_ {
        self.tag_ids
            .iter()
            .map(move |&tag_id| CacheKey::new(self.feature_id, tag_id))
    }
}

/// Body of an admin create or update. Updates replace every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerPayload {
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub title: String,
    pub text: String,
    pub url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl BannerPayload {
    /// Check the payload and drop duplicate tags, keeping first occurrence order.
    pub fn validated(mut self) -> BannerResult<Self> {
        if self.feature_id <= 0 {
            return Err(BannerError::Validation(
                "feature_id must be a positive integer".to_string(),
            ));
        }
        if self.tag_ids.is_empty() {
            return Err(BannerError::Validation(
                "tag_ids must contain at least one tag".to_string(),
            ));
        }
        if self.tag_ids.iter().any(|&t| t <= 0) {
            return Err(BannerError::Validation(
                "tag_ids must be positive integers".to_string(),
            ));
        }
        for (name, value) in [("title", &self.title), ("text", &self.text), ("url", &self.url)] {
            if value.trim().is_empty() {
                return Err(BannerError::Validation(format!("{name} must not be empty")));
            }
        }

        let mut seen = Vec::with_capacity(self.tag_ids.len());
        self.tag_ids.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
        Ok(self)
    }
}

/// Credential used to authorize requests. Never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub id: u64,
    pub token: String,
    pub is_admin: bool,
}

/// Selection criteria for record store reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerFilter {
    pub feature_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub active_only: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl BannerFilter {
    /// Filter for a single `(feature, tag)` lookup.
    pub fn lookup(feature_id: i64, tag_id: i64, active_only: bool) -> Self {
        Self {
            feature_id: Some(feature_id),
            tag_id: Some(tag_id),
            active_only,
            ..Default::default()
        }
    }

    /// Whether a banner passes the predicate part of the filter.
    /// Paging is applied by the store.
    pub fn matches(&self, banner: &Banner) -> bool {
        if let Some(feature_id) = self.feature_id {
            if banner.feature_id != feature_id {
                return false;
            }
        }
        if let Some(tag_id) = self.tag_id {
            if !banner.has_tag(tag_id) {
                return false;
            }
        }
        !self.active_only || banner.is_active
    }
}

/// Composite `(feature, tag)` cache address, rendered as `banner:{feature}:{tag}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub feature_id: i64,
    pub tag_id: i64,
}

const CACHE_KEY_PREFIX: &str = "banner";

impl CacheKey {
    pub fn new(feature_id: i64, tag_id: i64) -> Self {
        Self { feature_id, tag_id }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", CACHE_KEY_PREFIX, self.feature_id, self.tag_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_banner() -> Banner {
        let now = Utc::now();
        Banner {
            id: 1,
            feature_id: 10,
            tag_ids: vec![5, 7],
            title: "Spring sale".to_string(),
            text: "Everything half off".to_string(),
            url: "https://example.com/sale".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_banner_json_round_trip() {
        let banner = sample_banner();
        let json = serde_json::to_string(&banner).unwrap();
        let decoded: Banner = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, banner);
        assert!(json.contains("\"feature_id\":10"));
        assert!(json.contains("\"tag_ids\":[5,7]"));
    }

    #[test]
    fn test_cache_keys_fan_out_per_tag() {
        let keys: Vec<String> = sample_banner().cache_keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["banner:10:5", "banner:10:7"]);
    }

    #[test]
    fn test_payload_defaults_active_and_dedups_tags() {
        let payload: BannerPayload = serde_json::from_str(
            r#"{"feature_id":3,"tag_ids":[4,4,2],"title":"t","text":"x","url":"u"}"#,
        )
        .unwrap();
        assert!(payload.is_active);
        let payload = payload.validated().unwrap();
        assert_eq!(payload.tag_ids, vec![4, 2]);
    }

    #[test]
    fn test_payload_validation_rejects_empty_fields() {
        let payload = BannerPayload {
            feature_id: 1,
            tag_ids: vec![],
            title: "t".to_string(),
            text: "x".to_string(),
            url: "u".to_string(),
            is_active: true,
        };
        assert!(matches!(payload.clone().validated(), Err(BannerError::Validation(_))));

        let payload = BannerPayload {
            tag_ids: vec![1],
            title: "  ".to_string(),
            ..payload
        };
        assert!(matches!(payload.validated(), Err(BannerError::Validation(_))));
    }

    #[test]
    fn test_filter_matches() {
        let mut banner = sample_banner();
        assert!(BannerFilter::lookup(10, 7, true).matches(&banner));
        assert!(!BannerFilter::lookup(10, 6, false).matches(&banner));
        assert!(!BannerFilter::lookup(11, 5, false).matches(&banner));

        banner.is_active = false;
        assert!(!BannerFilter::lookup(10, 5, true).matches(&banner));
        assert!(BannerFilter::lookup(10, 5, false).matches(&banner));
        assert!(BannerFilter::default().matches(&banner));
    }
}
