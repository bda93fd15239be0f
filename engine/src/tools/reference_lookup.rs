use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{LocalTool, ToolDeclaration, ToolError};

pub const TOOL_NAME: &str = "lookupSceneReference";

/// Offline stand-in for a web search: a small dictionary of scene
/// descriptions keyed by words in the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceLookup;

#[derive(Debug, Deserialize)]
pub struct LookupInput {
    pub query: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LookupOutput {
    pub summary: String,
}

struct Entry {
    /// every keyword must appear
    all_of: &'static [&'static str],
    /// at least one must appear, ignored when empty
    any_of: &'static [&'static str],
    summary: &'static str,
}

impl Entry {
    fn matches(&self, query: &str) -> bool {
        self.all_of.iter().all(|k| query.contains(k))
            && (self.any_of.is_empty() || self.any_of.iter().any(|k| query.contains(k)))
    }
}

const ENTRIES: &[Entry] = &[
    Entry {
        all_of: &["beach", "sunset"],
        any_of: &[],
        summary: "Beach sunsets: low golden light, long shadows cast by dunes or palms, \
                  reflections on wet sand and gentle surf. Seashells, driftwood or a distant \
                  boat are common props. The sky shifts through orange, pink and violet.",
    },
    Entry {
        all_of: &["forest"],
        any_of: &["path", "clearing"],
        summary: "Forest paths and clearings: sunlight breaking through a dense canopy in \
                  patches, mossy stones, leaf litter, ferns and twisted roots. The mood ranges \
                  from calm to eerie. Wildflowers, a small stream or an animal add life.",
    },
    Entry {
        all_of: &["cyberpunk", "city"],
        any_of: &[],
        summary: "Cyberpunk cities: neon-lit towers, holographic billboards, crowded narrow \
                  streets, visible cybernetic implants and a wet, reflective street surface \
                  under constant rain.",
    },
    Entry {
        all_of: &[],
        any_of: &["cafe", "coffee shop"],
        summary: "Cozy coffee shops: warm lamps, armchairs and worn wooden benches, shelves of \
                  books, potted plants and art on the walls. Steam rising from cups and pastries \
                  in a glass counter sell the atmosphere.",
    },
    Entry {
        all_of: &[],
        any_of: &["gym", "fitness center", "selfie", "post-workout"],
        summary: "Gym and post-workout shots: mixed overhead and window light, mirrors, \
                  dumbbells, machines and treadmills, athletic clothing. Authentic details are \
                  beads of sweat, damp hair stuck to the forehead or neck, flushed skin and \
                  tired but natural expressions. Water bottles with condensation and used \
                  towels with visible terry loops help. Aim for a real moment, not an ad.",
    },
];

const FALLBACK: &str = "Focus on the lighting typical for the scene, the objects and textures \
                        people expect to see there, and the overall mood. For people, keep \
                        natural imperfections and details that fit the context, such as sweat \
                        after exercise.";

impl ReferenceLookup {
    pub fn lookup(&self, query: &str) -> LookupOutput {
        let query = query.to_lowercase();
        let summary = ENTRIES
            .iter()
            .find(|e| e.matches(&query))
            .map(|e| e.summary)
            .unwrap_or(FALLBACK);

        LookupOutput {
            summary: summary.to_string(),
        }
    }
}

impl LocalTool for ReferenceLookup {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: TOOL_NAME.into(),
            description: "Looks up common knowledge about a scene, object or style: typical \
                          lighting, props, textures and atmosphere. Use it when the prompt is \
                          vague about an element whose usual characteristics would make the \
                          image more realistic."
                .into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "query": {
                        "type": "STRING",
                        "description": "What to look up, e.g. \"cozy coffee shop interior\"."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    fn call(&self, args: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: LookupInput =
            serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArguments {
                tool: TOOL_NAME.into(),
                reason: e.to_string(),
            })?;

        let output = self.lookup(&input.query);
        Ok(json!(output))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keyword_rules() {
        let lookup = ReferenceLookup;
        assert!(lookup.lookup("Beach at SUNSET").summary.starts_with("Beach sunsets"));
        assert!(lookup.lookup("forest clearing at dawn").summary.starts_with("Forest"));
        // `forest` alone does not satisfy the path/clearing requirement
        assert_eq!(lookup.lookup("dark forest").summary, FALLBACK);
        assert!(lookup.lookup("neon cyberpunk city").summary.starts_with("Cyberpunk"));
        assert!(lookup.lookup("small cafe").summary.starts_with("Cozy"));
        assert!(lookup.lookup("realistic post-workout selfie").summary.starts_with("Gym"));
        assert_eq!(lookup.lookup("a cat").summary, FALLBACK);
    }

    #[test]
    fn first_matching_entry_wins() {
        // matches both the coffee shop and the selfie entries
        let out = ReferenceLookup.lookup("selfie in a coffee shop");
        assert!(out.summary.starts_with("Cozy"));
    }

    #[test]
    fn call_contract() {
        let out = ReferenceLookup
            .call(&json!({"query": "sunset on the beach"}))
            .unwrap();
        assert!(out["summary"].as_str().unwrap().starts_with("Beach sunsets"));

        let err = ReferenceLookup.call(&json!({"q": 1})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
