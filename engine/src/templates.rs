//! Instruction templates sent to the text models.
//!
//! Templates are rendered with `minijinja` in strict mode, so a variable the
//! caller forgot to pass is an error instead of an empty string. Every
//! context is a plain `Serialize` struct; optional inputs are `Option`s and
//! the templates test them with `{% if %}`.

use indoc::indoc;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

use crate::{params::ParameterSet, router::TemplateVariant};

/// Appended to the generation prompt for the free tier.
pub const WATERMARK_CLAUSE: &str =
    ". Include a subtle text or watermark 'ImageGenAI' in one of the corners of the image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum TemplateId {
    RefineStandard,
    RefinePremium,
    AdjustParameters,
    AnalyzeFeedback,
}

impl TemplateId {
    pub fn refine(variant: TemplateVariant) -> Self {
        match variant {
            TemplateVariant::Standard => TemplateId::RefineStandard,
            TemplateVariant::Premium => TemplateId::RefinePremium,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateId::RefineStandard => "refine/standard",
            TemplateId::RefinePremium => "refine/premium",
            TemplateId::AdjustParameters => "adjust_parameters",
            TemplateId::AnalyzeFeedback => "analyze_feedback",
        }
    }

    fn source(self) -> &'static str {
        match self {
            TemplateId::RefineStandard => REFINE_STANDARD,
            TemplateId::RefinePremium => REFINE_PREMIUM,
            TemplateId::AdjustParameters => ADJUST_PARAMETERS,
            TemplateId::AnalyzeFeedback => ANALYZE_FEEDBACK,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefineContext<'a> {
    pub user_prompt: &'a str,
    pub lookup_tool: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AdjustContext<'a> {
    pub prompt: &'a str,
    pub feedback: &'a str,
    pub initial: &'a ParameterSet,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeContext<'a> {
    pub feedback: &'a str,
    pub original_prompt: Option<&'a str>,
    pub refined_prompt: Option<&'a str>,
    /// already JSON encoded
    pub image_parameters: Option<String>,
}

pub struct TemplateStore {
    env: Environment<'static>,
}

impl TemplateStore {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template("refine/body", REFINE_BODY)?;
        env.add_template("refine/closing", REFINE_CLOSING)?;
        for id in TemplateId::iter() {
            env.add_template(id.name(), id.source())?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, id: TemplateId, ctx: &impl Serialize) -> Result<String, minijinja::Error> {
        self.env.get_template(id.name())?.render(ctx)
    }
}

const REFINE_BODY: &str = indoc! {r#"
    You are a prompt engineer who specializes in prompts for HYPER-REALISTIC image generation.
    The finished prompt must be clear, specific and effective at producing images that pair strong
    photographic craft (composition, lighting, aesthetics) with raw, authentic realism: micro-expressions,
    skin texture with natural imperfections, details that fit the context (real sweat on skin and damp hair
    after a workout) and environmental nuance. Never trade granular realism for a polished, airbrushed look.
    Authenticity beats idealized perfection.

    **Step 1: assess.**
    Read the user's prompt: `{{ user_prompt }}`.
    Decide whether it ALREADY covers the "Key considerations" below in enough depth to produce a
    hyper-realistic image without significant changes.

    * If it does, return the user's prompt as it is. Only make a tiny clarifying tweak when it lifts an
      already excellent prompt without changing its core. Do not rewrite it.
      Example: a prompt that already names the light, skin details like "visible pores on the T-zone",
      clothing texture and a rich environment is sufficient.
    * If it does not, rewrite it thoroughly. Work in every key consideration, filling unspecified details
      with plausible, rich specifics. When the prompt is vague about an element whose typical
      characteristics would add realism, call the `{{ lookup_tool }}` tool (for "a post-workout selfie",
      look up "realistic post-workout selfie details") and weave what it returns into the prompt. Only
      call it for genuinely vague areas.

    **Key considerations (used for both the assessment and the rewrite):**

    1. Physical and anatomical micro-details. Context and authenticity over idealized perfection.
       * Proportions: correct, specific human proportions.
       * Skin: natural texture and variation, e.g. "visible pores, especially on the T-zone, faint
         freckles across nose and cheeks, a tiny birthmark on the left temple". Texture differs between
         areas of the face. Natural oils, a matte finish or a sheen of sweat depending on context. Keep
         small blemishes, faint scars, uneven tone and post-exercise flush.
       * Sweat, when the scene implies exertion: individual droplets on forehead, temples, upper lip,
         chest and back, a sheen on broader areas, damp strands stuck to forehead or neck. Never uniform.
       * Face: specific eye shape with detailed irises, faint blood vessels in the sclera, several
         distinct catchlights per eye. Eyebrows made of individual, slightly irregular hairs. A named
         nose shape. Lips with fine lines and a natural finish, drier after a workout. Subtle natural
         asymmetry.
       * Hair: color with undertones, texture (fine, coarse, 2b waves, 3c curls, 4c coils), style, shine
         from a named light source, flyaways and loose strands, damp strands where the context calls for it.
       * Hands and limbs: the right number of fingers and toes, relaxed natural poses, nail details such
         as uneven cuticles or faint ridges.
       * Posture and expression: natural body language and genuine micro-expressions (a slight furrow, a
         barely visible smile) instead of a posed look.
       * Explicitly steer away from AI artifacts: distorted faces, extra fingers or limbs, impossible
         poses, melted or merged body parts.

    2. Lighting and environment.
       * Type and direction of the light ("soft morning light through a window", "mixed gym lighting:
         overhead fluorescents plus window light", "softbox from the front left").
       * Shadows with the hardness the light source implies and soft transitions on skin.
       * Reflections: catchlights, sheen on skin, glossy surfaces, faint reflections of the surroundings
         on floors or bottles.
       * Depth of field: tack-sharp focus on the subject (on the eyes for portraits), natural background
         blur that still shows recognizable shapes.
       * Quality of light: golden hour, diffuse overcast, chiaroscuro.

    3. Context and scenery.
       * Elaborate on anything the user left open: a concrete environment with signs of use (scuffs,
         chalk marks, worn grips, dust in corners).
       * Coherent background objects (a used towel on a bench, a shaker bottle with condensation).
       * Correct perspective and scale.
       * Atmosphere: haze, sunbeams, humidity, falling leaves.

    4. Clothing and accessories.
       * Fabric and texture ("crisp cotton with a fine weave", "chunky knit with visible loops",
         "moisture-wicking top with realistic sweat patches that change the sheen of the fabric").
       * Fit, drape, folds and creases that follow the pose.
       * Wear and tear where it fits (frayed denim, scuffed shoes).
       * How accessories interact with the body (a necklace casting a faint shadow, clinging to damp skin).

    5. Photographic qualities.
       * Style: film stock, cinematic or documentary look, macro detail. The style must support the realism.
       * Camera angle and lens ("slight high angle typical of a selfie", "85mm portrait lens").
       * Focus as above, colors that are harmonious and believable, no oversaturated patches.
       * High resolution and consistent lighting, style and perspective; no illogical objects or
         unnatural color combinations unless requested.
"#};

const REFINE_CLOSING: &str = indoc! {r#"
    Original prompt: {{ user_prompt }}

    **Decision:** based on your assessment against ALL key considerations, either return the original
    prompt (with at most a negligible tweak) or a comprehensive rewrite. The result is fed directly to
    an image model, so output only the prompt, without commentary or headings. Fill unspecified details
    with plausible, hyper-realistic elements, e.g. "visible skin pores on the T-zone, individual eyebrow
    hairs, subtle lip texture, slight nail ridges, damp hair stuck to the forehead, condensation on a
    water bottle, terry cloth texture, several catchlights per eye, natural facial asymmetry, genuine
    micro-expressions, slight post-exercise flush".

    Refined Prompt:
"#};

const REFINE_STANDARD: &str = indoc! {r#"
    {% include "refine/body" %}

    {% include "refine/closing" %}
"#};

const REFINE_PREMIUM: &str = indoc! {r#"
    {% include "refine/body" %}

    **Premium review pass.** Before answering, review your draft once more against each key
    consideration and add whatever is still missing. Prefer several precise sensory details over one
    generic adjective, and state the camera, lens and light source explicitly.

    {% include "refine/closing" %}
"#};

const ADJUST_PARAMETERS: &str = indoc! {r#"
    You are an expert in tuning image generation parameters. The user generates images from the prompt
    "{{ prompt }}" and gave this feedback on the result: "{{ feedback }}".

    The parameters used were:
    - CFG Scale: {{ initial.cfgScale }}
    - Steps: {{ initial.steps }}
    - Realism Enhancement: {{ initial.realismEnhancement }}

    Adjust cfgScale, steps and realismEnhancement so the next images address the feedback.
    Return ONLY a JSON object with the keys "cfgScale", "steps" and "realismEnhancement".
    Keep every value in its valid range: cfgScale 1-20, steps 10-150 (an integer), realismEnhancement 0-1.
"#};

const ANALYZE_FEEDBACK: &str = indoc! {r#"
    You are the system analyst and improvement strategist for ImageGenAI, an AI image generation tool.
    Analyze the user feedback below, together with any example prompts and parameters, find the areas
    that need improvement and propose actionable changes that improve the tool, the realism of its
    images and the user experience.

    Provided information:
    - User feedback: {{ feedback }}
    {%- if original_prompt %}
    - Example original prompt: {{ original_prompt }}
    {%- endif %}
    {%- if refined_prompt %}
    - Example refined prompt: {{ refined_prompt }}
    {%- endif %}
    {%- if image_parameters %}
    - Example image parameters: {{ image_parameters }}
    {%- endif %}

    Your output:
    1. "overallAssessment": a short summary of the trends in the feedback and how the system is perceived.
    2. "improvementSuggestions": an array of concrete suggestions. Each one is an object with
       - "areaToImprove": the area, e.g. "Prompt detail in refinement", "Lighting realism", "Anatomy",
         "Parameter defaults", "UI clarity", "New feature".
       - "currentApproachOrProblem": what the system does today or what problem the feedback shows.
       - "suggestedChange": a specific, actionable change, e.g. "extend the refinement instructions to
         require X whenever Y is mentioned" or "explain the CFG scale slider in a tooltip".
       - "reasoning": why, grounded in the feedback.
       - "potentialImpact": the expected benefit for users or image quality.

    Prefer suggestions that fix recurring problems or give large improvements, and that can be done by
    changing prompt instructions, flows or UI.

    Return a single JSON object with the keys "success" (true when you produced suggestions),
    "message" (a one-line summary), "overallAssessment" and "improvementSuggestions".
    Example of one suggestion:
    {
      "areaToImprove": "Anatomical accuracy - hands",
      "currentApproachOrProblem": "Users report distorted hands and wrong finger counts.",
      "suggestedChange": "Add to the anatomy section of the refinement instructions: 'five fingers per hand, naturally posed'.",
      "reasoning": "Several users mention broken hands, so the problem is recurring.",
      "potentialImpact": "Fewer artifacts on images with people and higher satisfaction."
    }
"#};
