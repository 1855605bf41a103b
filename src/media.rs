use serde::{Deserialize, Serialize};

/// Descriptor for a playable piece of media — the content feature itself or
/// a single ad creative. The core never decodes media; this is the handle it
/// passes between collaborators (renderer, UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaModel {
    /// Display name ("Feature", "Preroll spot 2", ...).
    pub name: String,
    /// Location of the media (URL or path); opaque to the core.
    pub url: String,
    /// Whether this descriptor is an ad creative rather than content.
    pub is_ad: bool,
    /// Click-through URL for interactive creatives, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_through: Option<String>,
}

impl MediaModel {
    /// Create a content (non-ad) descriptor.
    pub fn content(name: impl Into<String>, url: impl Into<String>) -> Self {
        MediaModel {
            name: name.into(),
            url: url.into(),
            is_ad: false,
            click_through: None,
        }
    }

    /// Create an ad-creative descriptor.
    pub fn ad(name: impl Into<String>, url: impl Into<String>) -> Self {
        MediaModel {
            name: name.into(),
            url: url.into(),
            is_ad: true,
            click_through: None,
        }
    }
}

/// A fetched ad break: the cue point it was requested for plus the ordered
/// creatives to play back to back (a pod may hold several).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdBreak {
    /// Content timestamp this break belongs to (milliseconds).
    pub cue_point_millis: u64,
    /// Creatives in playback order. May be empty if the server returned
    /// nothing for this break.
    pub ads: Vec<MediaModel>,
}

impl AdBreak {
    pub fn new(cue_point_millis: u64, ads: Vec<MediaModel>) -> Self {
        AdBreak {
            cue_point_millis,
            ads,
        }
    }

    /// Number of creatives in this break.
    pub fn ad_count(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_constructor_is_not_ad() {
        let m = MediaModel::content("Feature", "https://cdn/feature.mpd");
        assert!(!m.is_ad);
        assert!(m.click_through.is_none());
    }

    #[test]
    fn ad_constructor_is_ad() {
        let m = MediaModel::ad("Spot", "https://ads/spot.mp4");
        assert!(m.is_ad);
    }

    #[test]
    fn ad_break_counts_creatives() {
        let b = AdBreak::new(
            10_000,
            vec![MediaModel::ad("A", "a"), MediaModel::ad("B", "b")],
        );
        assert_eq!(b.ad_count(), 2);
        assert!(!b.is_empty());
        assert!(AdBreak::new(0, vec![]).is_empty());
    }

    #[test]
    fn media_model_serialization_roundtrip() {
        let m = MediaModel {
            name: "Spot".into(),
            url: "https://ads/spot.mp4".into(),
            is_ad: true,
            click_through: Some("https://advertiser.example".into()),
        };
        let json = serde_json::to_string(&m).unwrap();
        let loaded: MediaModel = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn click_through_omitted_when_absent() {
        let m = MediaModel::ad("Spot", "u");
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("click_through"));
    }
}
