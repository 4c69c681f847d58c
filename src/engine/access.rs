//! Access policy: who may see the premium half of a prediction.
//!
//! The viewer arrives fully resolved. Subscription expiry and session
//! validity are settled by the identity layer before a `ViewerContext`
//! is built, so nothing here looks at the clock.

use crate::model::{Confidence, Odds, Prediction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown in place of the pick, confidence, reasoning and odds.
pub const LOCKED_PLACEHOLDER: &str =
    "Premium Content: subscribe to access detailed predictions and analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("Free Member"),
            Self::Premium => f.write_str("Premium Member"),
        }
    }
}

/// An authenticated member with an already-resolved tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    pub display_name: Option<String>,
    pub tier: SubscriptionTier,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewerContext {
    member: Option<Member>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self { member: None }
    }

    pub fn member(member: Member) -> Self {
        Self { member: Some(member) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.member.is_some()
    }

    pub fn tier(&self) -> Option<SubscriptionTier> {
        self.member.as_ref().map(|m| m.tier)
    }

    pub fn is_admin(&self) -> bool {
        self.member.as_ref().is_some_and(|m| m.is_admin)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.member.as_ref().map(|m| m.user_id.as_str())
    }

    pub fn display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| m.display_name.as_deref())
            .unwrap_or("User")
    }

    pub fn has_premium(&self) -> bool {
        self.tier() == Some(SubscriptionTier::Premium)
    }

    /// Server-side `is_premium` narrowing for listing queries. Viewers who
    /// cannot see premium content never need those rows.
    pub fn premium_filter(&self) -> Option<bool> {
        if self.has_premium() {
            None
        } else {
            Some(false)
        }
    }
}

pub fn can_reveal(viewer: &ViewerContext, prediction: &Prediction) -> bool {
    !prediction.is_premium || (viewer.is_authenticated() && viewer.has_premium())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PremiumContent<'a> {
    pub pick: &'a str,
    pub confidence: Option<Confidence>,
    pub reasoning: Option<&'a str>,
    pub odds: &'a Odds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content<'a> {
    Revealed(PremiumContent<'a>),
    Locked,
}

/// What the rendering layer may show for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView<'a> {
    pub prediction: &'a Prediction,
    pub content: Content<'a>,
}

impl PredictionView<'_> {
    pub fn is_locked(&self) -> bool {
        matches!(self.content, Content::Locked)
    }
}

pub fn present<'a>(viewer: &ViewerContext, prediction: &'a Prediction) -> PredictionView<'a> {
    let content = if can_reveal(viewer, prediction) {
        Content::Revealed(PremiumContent {
            pick: &prediction.prediction,
            confidence: prediction.confidence_score,
            reasoning: prediction.reasoning.as_deref().filter(|r| !r.trim().is_empty()),
            odds: &prediction.odds,
        })
    } else {
        Content::Locked
    };
    PredictionView { prediction, content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::model::PredictionType;
    use chrono::{TimeZone, Utc};

    fn member(tier: SubscriptionTier) -> ViewerContext {
        ViewerContext::member(Member {
            user_id: "u-1".to_string(),
            display_name: Some("Wanjiru".to_string()),
            tier,
            is_admin: false,
        })
    }

    fn tip(is_premium: bool) -> Prediction {
        let mut p = fixtures::prediction(
            "p-1",
            PredictionType::Single,
            Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap(),
        );
        p.is_premium = is_premium;
        p
    }

    fn all_viewers() -> Vec<ViewerContext> {
        vec![
            ViewerContext::anonymous(),
            member(SubscriptionTier::Free),
            member(SubscriptionTier::Premium),
        ]
    }

    #[test]
    fn test_free_tips_visible_to_everyone() {
        let p = tip(false);
        for viewer in all_viewers() {
            assert!(can_reveal(&viewer, &p), "{:?}", viewer);
        }
    }

    #[test]
    fn test_premium_tip_hidden_from_anonymous() {
        assert!(!can_reveal(&ViewerContext::anonymous(), &tip(true)));
    }

    #[test]
    fn test_premium_tip_visible_to_premium_member() {
        assert!(can_reveal(&member(SubscriptionTier::Premium), &tip(true)));
    }

    #[test]
    fn test_free_member_treated_like_anonymous() {
        let p = tip(true);
        assert!(!can_reveal(&member(SubscriptionTier::Free), &p));
        assert_eq!(
            can_reveal(&member(SubscriptionTier::Free), &p),
            can_reveal(&ViewerContext::anonymous(), &p)
        );
    }

    #[test]
    fn test_locked_view_keeps_identification_fields() {
        let p = tip(true);
        let view = present(&ViewerContext::anonymous(), &p);
        assert!(view.is_locked());
        assert_eq!(view.prediction.home_team, "Arsenal");
        assert_eq!(view.prediction.league, "Premier League");
    }

    #[test]
    fn test_revealed_view_omits_blank_reasoning() {
        let mut p = tip(false);
        p.reasoning = Some("  ".to_string());
        p.confidence_score = None;
        let view = present(&ViewerContext::anonymous(), &p);
        match view.content {
            Content::Revealed(c) => {
                assert_eq!(c.pick, "Home Win");
                assert!(c.reasoning.is_none());
                assert!(c.confidence.is_none());
                assert_eq!(c.odds.len(), 2);
            }
            Content::Locked => panic!("free tip should be revealed"),
        }
    }

    #[test]
    fn test_premium_filter_only_for_non_premium() {
        assert_eq!(ViewerContext::anonymous().premium_filter(), Some(false));
        assert_eq!(member(SubscriptionTier::Free).premium_filter(), Some(false));
        assert_eq!(member(SubscriptionTier::Premium).premium_filter(), None);
    }
}
