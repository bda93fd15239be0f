use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::role::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Task {
    Refine,
    AdjustParameters,
    Generate,
    AnalyzeFeedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum TemplateVariant {
    Standard,
    Premium,
}

/// Model identifiers per class of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub standard_text: String,
    pub premium_text: String,
    pub image: String,
}

pub const STANDARD_TEXT_MODEL: &str = "gemini-2.0-flash";
pub const PREMIUM_TEXT_MODEL: &str = "gemini-1.5-pro-latest";
pub const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            standard_text: STANDARD_TEXT_MODEL.into(),
            premium_text: PREMIUM_TEXT_MODEL.into(),
            image: IMAGE_MODEL.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub model: &'a str,
    /// only set for tasks that come in more than one template flavour
    pub variant: Option<TemplateVariant>,
}

pub fn route(catalog: &ModelCatalog, task: Task, tier: Tier) -> Route<'_> {
    let premium = matches!(tier, Tier::Pro | Tier::Admin);

    match task {
        Task::Refine if premium => Route {
            model: &catalog.premium_text,
            variant: Some(TemplateVariant::Premium),
        },
        Task::Refine => Route {
            model: &catalog.standard_text,
            variant: Some(TemplateVariant::Standard),
        },
        Task::AdjustParameters => Route {
            model: if premium {
                &catalog.premium_text
            } else {
                &catalog.standard_text
            },
            variant: None,
        },
        Task::Generate => Route {
            model: &catalog.image,
            variant: None,
        },
        Task::AnalyzeFeedback => Route {
            model: &catalog.premium_text,
            variant: None,
        },
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn refine_table() {
        let catalog = ModelCatalog::default();
        assert_eq!(
            route(&catalog, Task::Refine, Tier::Free),
            Route {
                model: STANDARD_TEXT_MODEL,
                variant: Some(TemplateVariant::Standard)
            }
        );
        for tier in [Tier::Pro, Tier::Admin] {
            assert_eq!(
                route(&catalog, Task::Refine, tier),
                Route {
                    model: PREMIUM_TEXT_MODEL,
                    variant: Some(TemplateVariant::Premium)
                }
            );
        }
    }

    #[test]
    fn other_tasks() {
        let catalog = ModelCatalog::default();
        for tier in Tier::iter() {
            assert_eq!(route(&catalog, Task::Generate, tier).model, IMAGE_MODEL);
            assert_eq!(
                route(&catalog, Task::AnalyzeFeedback, tier).model,
                PREMIUM_TEXT_MODEL
            );
            let adjust = route(&catalog, Task::AdjustParameters, tier);
            let expected = if tier == Tier::Free {
                STANDARD_TEXT_MODEL
            } else {
                PREMIUM_TEXT_MODEL
            };
            assert_eq!(adjust.model, expected);
            assert_eq!(adjust.variant, None);
        }
    }

    #[test]
    fn only_refine_has_variants() {
        let catalog = ModelCatalog::default();
        for task in Task::iter() {
            for tier in Tier::iter() {
                let r = route(&catalog, task, tier);
                assert_eq!(r.variant.is_some(), task == Task::Refine);
                assert_eq!(r, route(&catalog, task, tier));
            }
        }
    }

    #[test]
    fn catalog_overrides_are_used() {
        let catalog = ModelCatalog {
            standard_text: "small".into(),
            premium_text: "big".into(),
            image: "painter".into(),
        };
        assert_eq!(route(&catalog, Task::Refine, Tier::Free).model, "small");
        assert_eq!(route(&catalog, Task::Generate, Tier::Admin).model, "painter");
    }
}
