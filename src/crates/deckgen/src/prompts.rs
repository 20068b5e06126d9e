//! Prompt construction for outline and slide requests.

use crate::layout::Layout;
use crate::models::{InstructionalLevel, OutlineRequest, Topic, KEY_POINT_RANGE};
use crate::validation::{ContentSchema, Escalation};

/// System instruction for an attempt, escalated after failures.
pub fn system_instruction<S: ContentSchema>(schema: &S, escalation: Escalation) -> String {
    let mut prompt = String::from(
        "You are an instructional designer who writes clear, accurate educational slide content.\n\n",
    );

    match escalation {
        Escalation::Standard => {
            prompt.push_str("Respond with JSON in the following shape:\n\n");
            prompt.push_str(&schema.shape(false));
        }
        Escalation::Strict => {
            prompt.push_str(
                "Your previous answer could not be used. Respond with ONLY a JSON value, \
                 no prose and no code fences, matching this shape exactly:\n\n",
            );
            prompt.push_str(&schema.shape(false));
            prompt.push_str("\n\nEvery string must be non-empty. If you cannot comply, respond with exactly ");
            prompt.push_str(schema.empty_shape());
            prompt.push_str(" instead of a partial answer.");
        }
        Escalation::Simplified => {
            prompt.push_str(
                "Respond with ONLY a JSON value containing just the required members, \
                 in this shape:\n\n",
            );
            prompt.push_str(&schema.shape(true));
            prompt.push_str("\n\nIf you cannot comply, respond with exactly ");
            prompt.push_str(schema.empty_shape());
            prompt.push('.');
        }
    }

    prompt
}

/// User prompt for an outline request.
pub fn outline_prompt(request: &OutlineRequest) -> String {
    format!(
        "Create an outline of {count} slide topics about the following subject.\n\n\
         Subject: {context}\n\
         Audience: {audience}\n\n\
         Each topic needs a title and {min} to {max} key points. \
         Add an image_prompt describing one illustration for the topic.",
        count = request.count(),
        context = request.context(),
        audience = request.level().audience(),
        min = KEY_POINT_RANGE.start(),
        max = KEY_POINT_RANGE.end(),
    )
}

/// User prompt for slide content.
pub fn slide_prompt(topic: &Topic, level: InstructionalLevel, layout: Layout) -> String {
    let mut prompt = format!(
        "Write the content of one slide titled \"{}\".\n\nAudience: {}\n\nKey points to cover:\n",
        topic.title,
        level.audience()
    );
    for point in &topic.key_points {
        prompt.push_str(&format!("  - {point}\n"));
    }

    prompt.push_str("\nFill these fields:\n");
    for spec in layout.text_fields() {
        prompt.push_str(&format!("  - {}: {}\n", spec.name, spec.hint));
    }
    if layout.has_image() {
        prompt.push_str("  - image_prompt: a short description of an illustration for the slide\n");
    }

    prompt
}
