//! Who is asking. `UserRole` drives what the presentation layer unlocks,
//! `Tier` drives which model a flow talks to. Guests and free users share a
//! tier but not a role: guests still have to sign in for some features.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Guest,
    Free,
    Pro,
    Admin,
}

#[derive(
    Debug, Clone, Copy, Display, clap::ValueEnum, Serialize, Deserialize, Hash, PartialEq, Eq, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Free,
    Pro,
    Admin,
}

#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, EnumIter)]
pub enum Feature {
    #[strum(to_string = "Prompt refinement")]
    PromptRefinement,
    #[strum(to_string = "Image generation")]
    ImageGeneration,
    #[strum(to_string = "AI parameter adjustment")]
    ParameterAdjustment,
    #[strum(to_string = "Feedback submission")]
    FeedbackSubmission,
}

impl UserRole {
    pub fn tier(self) -> Tier {
        match self {
            UserRole::Guest | UserRole::Free => Tier::Free,
            UserRole::Pro => Tier::Pro,
            UserRole::Admin => Tier::Admin,
        }
    }

    pub fn is_signed_in(self) -> bool {
        self != UserRole::Guest
    }

    pub fn can_use(self, feature: Feature) -> bool {
        use Feature::*;
        match feature {
            PromptRefinement | ImageGeneration => true,
            ParameterAdjustment | FeedbackSubmission => self.is_signed_in(),
        }
    }
}

impl From<UserRole> for Tier {
    fn from(role: UserRole) -> Self {
        role.tier()
    }
}

/// What the identity provider tells us about the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub email: Option<String>,
    pub signed_in: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn signed_in(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            signed_in: true,
        }
    }
}

/// E-mail addresses that get the admin role. Compared trimmed and lowercase.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList(BTreeSet<String>);

impl AdminAllowList {
    pub fn new<S: AsRef<str>>(emails: impl IntoIterator<Item = S>) -> Self {
        Self(
            emails
                .into_iter()
                .map(|e| normalize_email(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        self.0.contains(&normalize_email(email))
    }

    pub fn resolve(&self, identity: &Identity) -> UserRole {
        if !identity.signed_in {
            return UserRole::Guest;
        }

        match &identity.email {
            Some(email) if self.contains(email) => UserRole::Admin,
            _ => UserRole::Pro,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
