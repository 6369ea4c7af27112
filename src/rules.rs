//! # Rule Table and Path Classification Module
//!
//! Questo modulo gestisce la tabella ordinata delle regole e la
//! classificazione dei percorsi relativi.
//!
//! ## Responsabilità:
//! - Definisce `RuleSpec` (forma serializzabile, file di configurazione)
//! - Compila le regole in `Rule`/`RuleSet` con pattern regex ancorati
//! - Classifica un percorso relativo: prima regola che combacia vince
//! - Fornisce la tabella di default per gli asset del sito
//!
//! ## Contratto di matching:
//! - I pattern sono valutati nell'ordine della tabella, mai riordinati
//! - L'ordine è l'unico criterio di priorità (nessun "best match")
//! - Il match è ancorato all'inizio del percorso ma NON alla fine:
//!   un pattern senza `$` finale combacia con qualsiasi percorso di cui
//!   è prefisso. Le regole vanno scritte dalla più specifica alla più
//!   generica, e chiuse con `$` quando serve un match completo.
//!
//! ## Esempio:
//! ```rust,ignore
//! let rules = RuleSet::compile(&default_rules())?;
//! if let Some(rule) = rules.classify("hero/slide1/src.png") {
//!     println!("matched: {}", rule.pattern());
//! }
//! ```

use crate::error::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Media kind a rule dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Serializable rule description, as written in a config file.
///
/// JSON form: `{ "pattern": "...", "kind": "image", "width": 256 }` or
/// `{ "pattern": "...", "kind": "video", "height": 720, "crf": 28 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Regular expression matched against the `/`-normalized relative path
    pub pattern: String,
    #[serde(flatten)]
    pub action: RuleAction,
}

/// Kind-specific rule parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleAction {
    Image {
        /// Target width in pixels; wider images are downscaled to this
        width: u32,
    },
    Video {
        /// Target height in pixels; width follows the aspect ratio
        height: u32,
        /// Constant rate factor (0-51, 23-28 is good for web)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        crf: Option<u8>,
        /// Target video bitrate in kbps, alternative to `crf`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bitrate_kbps: Option<u32>,
    },
}

impl RuleSpec {
    /// Shorthand for an image rule
    pub fn image(pattern: &str, width: u32) -> Self {
        Self {
            pattern: pattern.to_string(),
            action: RuleAction::Image { width },
        }
    }

    /// Shorthand for a video rule with a CRF quality knob
    pub fn video_crf(pattern: &str, height: u32, crf: u8) -> Self {
        Self {
            pattern: pattern.to_string(),
            action: RuleAction::Video {
                height,
                crf: Some(crf),
                bitrate_kbps: None,
            },
        }
    }
}

/// The built-in rule table for the site's media tree, most specific first.
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        // Hero carousel thumbnails
        RuleSpec::image(r"hero/slide\d+/(src|edited)\.(png|jpe?g)$", 256),
        // Hero carousel videos (720p height, good web compression)
        RuleSpec::video_crf(r"hero/slide\d+/ours\.mp4$", 720, 28),
        // Multi-view gallery images (consistent thumbnail size)
        RuleSpec::image(r"mv-gallery/\d+/.*/.+\.(png|jpe?g)$", 300),
        // Method overview figure (larger, for detail)
        RuleSpec::image(r"method/method_fig2\.(png|jpe?g)$", 1024),
        // Any other video
        RuleSpec::video_crf(r".*\.mp4$", 720, 28),
        // Any other image
        RuleSpec::image(r".*\.(png|jpe?g)$", 1280),
    ]
}

/// Image transform parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParams {
    pub target_width: u32,
}

/// Video transform parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    pub target_height: u32,
    pub quality: VideoQuality,
}

/// Encoder quality knob: constant quality or a bitrate tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoQuality {
    Crf(u8),
    BitrateKbps(u32),
}

impl VideoQuality {
    /// Bitrate tier equivalent to good web quality at the given height
    pub fn for_height(target_height: u32) -> Self {
        if target_height >= 720 {
            VideoQuality::BitrateKbps(2000)
        } else {
            VideoQuality::BitrateKbps(1000)
        }
    }
}

/// Compiled transform dispatch for a matched rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Image(ImageParams),
    Video(VideoParams),
}

impl Transform {
    pub fn kind(&self) -> MediaKind {
        match self {
            Transform::Image(_) => MediaKind::Image,
            Transform::Video(_) => MediaKind::Video,
        }
    }
}

/// A single compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    regex: Regex,
    raw_pattern: String,
    transform: Transform,
}

impl Rule {
    fn compile(spec: &RuleSpec) -> Result<Self, PipelineError> {
        let transform = match spec.action {
            RuleAction::Image { width } => {
                if width == 0 {
                    return Err(PipelineError::Validation(format!(
                        "Rule '{}': image width must be greater than 0",
                        spec.pattern
                    )));
                }
                Transform::Image(ImageParams {
                    target_width: width,
                })
            }
            RuleAction::Video {
                height,
                crf,
                bitrate_kbps,
            } => {
                if height == 0 {
                    return Err(PipelineError::Validation(format!(
                        "Rule '{}': video height must be greater than 0",
                        spec.pattern
                    )));
                }
                let quality = match (crf, bitrate_kbps) {
                    (Some(_), Some(_)) => {
                        return Err(PipelineError::Validation(format!(
                            "Rule '{}': crf and bitrate_kbps are mutually exclusive",
                            spec.pattern
                        )));
                    }
                    (Some(crf), None) => {
                        if crf > 51 {
                            return Err(PipelineError::Validation(format!(
                                "Rule '{}': CRF must be between 0 and 51",
                                spec.pattern
                            )));
                        }
                        VideoQuality::Crf(crf)
                    }
                    (None, Some(kbps)) => VideoQuality::BitrateKbps(kbps),
                    (None, None) => VideoQuality::for_height(height),
                };
                Transform::Video(VideoParams {
                    target_height: height,
                    quality,
                })
            }
        };

        // Anchor at the start only: historical "match" semantics, a pattern
        // may consume just a prefix of the path.
        let regex = Regex::new(&format!("^(?:{})", spec.pattern)).map_err(|source| {
            PipelineError::Pattern {
                pattern: spec.pattern.clone(),
                source,
            }
        })?;

        Ok(Self {
            regex,
            raw_pattern: spec.pattern.clone(),
            transform,
        })
    }

    /// The pattern as written in the rule table
    pub fn pattern(&self) -> &str {
        &self.raw_pattern
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Test this rule against a `/`-normalized relative path
    pub fn matches(&self, relative_path: &str) -> bool {
        self.regex.is_match(relative_path)
    }
}

/// An ordered, immutable rule table
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile rule specs into a matchable table, preserving order
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, PipelineError> {
        let rules = specs.iter().map(Rule::compile).collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    /// Return the first rule matching the relative path, or None.
    ///
    /// Rules are tried strictly in table order; the first hit wins even if
    /// a later rule would match "more" of the path.
    pub fn classify(&self, relative_path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(relative_path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_set() -> RuleSet {
        RuleSet::compile(&default_rules()).unwrap()
    }

    #[test]
    fn test_first_match_wins_in_table_order() {
        let specs = vec![
            RuleSpec::image(r".*\.png$", 100),
            RuleSpec::image(r"gallery/.*\.png$", 200),
        ];
        let rules = RuleSet::compile(&specs).unwrap();

        // Both patterns match; the earlier one must win.
        let rule = rules.classify("gallery/photo.png").unwrap();
        assert_eq!(rule.pattern(), r".*\.png$");
        assert_eq!(
            rule.transform(),
            Transform::Image(ImageParams { target_width: 100 })
        );
    }

    #[test]
    fn test_hero_slide_rule_beats_generic_image_rule() {
        let rules = default_set();

        let rule = rules.classify("hero/slide1/src.png").unwrap();
        assert_eq!(
            rule.transform(),
            Transform::Image(ImageParams { target_width: 256 })
        );

        let rule = rules.classify("hero/slide12/edited.jpeg").unwrap();
        assert_eq!(
            rule.transform(),
            Transform::Image(ImageParams { target_width: 256 })
        );
    }

    #[test]
    fn test_generic_rules_catch_remaining_media() {
        let rules = default_set();

        let rule = rules.classify("clips/intro.mp4").unwrap();
        assert_eq!(
            rule.transform(),
            Transform::Video(VideoParams {
                target_height: 720,
                quality: VideoQuality::Crf(28),
            })
        );

        let rule = rules.classify("team/portrait.jpg").unwrap();
        assert_eq!(
            rule.transform(),
            Transform::Image(ImageParams {
                target_width: 1280
            })
        );
    }

    #[test]
    fn test_unmatched_paths_return_none() {
        let rules = default_set();
        assert!(rules.classify("notes.txt").is_none());
        assert!(rules.classify("docs/readme.md").is_none());
        assert!(rules.classify("models/scene.glb").is_none());
    }

    #[test]
    fn test_match_is_anchored_at_path_start() {
        let specs = vec![RuleSpec::image(r"hero/.*\.png$", 256)];
        let rules = RuleSet::compile(&specs).unwrap();

        assert!(rules.classify("hero/slide1/src.png").is_some());
        // The pattern must not float to the middle of the path.
        assert!(rules.classify("archive/hero/slide1/src.png").is_none());
    }

    #[test]
    fn test_prefix_match_does_not_require_full_consumption() {
        // A pattern with no terminal anchor matches any path it is a
        // prefix-match of. Known sharp edge of the rule contract.
        let specs = vec![RuleSpec::image(r"raw", 640)];
        let rules = RuleSet::compile(&specs).unwrap();

        assert!(rules.classify("raw/shot.png").is_some());
        assert!(rules.classify("raw-exports/shot.tiff").is_some());
        assert!(rules.classify("exports/raw/shot.png").is_none());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let rules = default_set();
        assert!(rules.classify("HERO/slide1/src.png").is_none());
        assert!(rules.classify("team/portrait.PNG").is_none());
    }

    #[test]
    fn test_video_quality_defaults_to_bitrate_tier() {
        let spec = RuleSpec {
            pattern: r".*\.mp4$".to_string(),
            action: RuleAction::Video {
                height: 720,
                crf: None,
                bitrate_kbps: None,
            },
        };
        let rules = RuleSet::compile(&[spec]).unwrap();
        let rule = rules.classify("clip.mp4").unwrap();
        assert_eq!(
            rule.transform(),
            Transform::Video(VideoParams {
                target_height: 720,
                quality: VideoQuality::BitrateKbps(2000),
            })
        );

        assert_eq!(VideoQuality::for_height(480), VideoQuality::BitrateKbps(1000));
    }

    #[test]
    fn test_conflicting_quality_knobs_rejected() {
        let spec = RuleSpec {
            pattern: r".*\.mp4$".to_string(),
            action: RuleAction::Video {
                height: 720,
                crf: Some(28),
                bitrate_kbps: Some(2000),
            },
        };
        assert!(matches!(
            RuleSet::compile(&[spec]),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let crf_too_high = RuleSpec::video_crf(r".*\.mp4$", 720, 52);
        assert!(RuleSet::compile(&[crf_too_high]).is_err());

        let zero_width = RuleSpec::image(r".*\.png$", 0);
        assert!(RuleSet::compile(&[zero_width]).is_err());
    }

    #[test]
    fn test_invalid_pattern_reports_pattern_error() {
        let spec = RuleSpec::image(r"hero/(unclosed", 256);
        match RuleSet::compile(&[spec]) {
            Err(PipelineError::Pattern { pattern, .. }) => {
                assert_eq!(pattern, r"hero/(unclosed");
            }
            other => panic!("expected Pattern error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rule_specs_round_trip_through_json() {
        let specs = default_rules();
        let json = serde_json::to_string_pretty(&specs).unwrap();
        let parsed: Vec<RuleSpec> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, specs);
    }

    #[test]
    fn test_transform_reports_its_media_kind() {
        let rules = default_set();
        let image = rules.classify("team/portrait.jpg").unwrap();
        let video = rules.classify("clips/intro.mp4").unwrap();

        assert_eq!(image.transform().kind(), MediaKind::Image);
        assert_eq!(video.transform().kind(), MediaKind::Video);
        assert_eq!(MediaKind::Image.to_string(), "image");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
