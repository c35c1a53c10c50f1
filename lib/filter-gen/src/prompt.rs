use crate::quiz::{QuizAnswer, QuizQuestion};
use photo_filter::{FilterParameters, Param};

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert plant photography color grading specialist. \
Create tasteful, cohesive filters. Always respond with valid JSON only, no markdown formatting.";

fn range_lines() -> String {
    Param::ALL
        .iter()
        .map(|p| {
            let r = p.range();
            format!("- {p}: {} to {} (neutral {})", r.min, r.max, r.default)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn current_lines(params: &FilterParameters) -> String {
    Param::ALL
        .iter()
        .map(|p| format!("- {p}: {}", params.get(*p)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_template(params: &FilterParameters, with_name: bool) -> String {
    let mut fields = Vec::with_capacity(Param::ALL.len() + 1);
    if with_name {
        fields.push("  \"name\": \"Filter Name\"".to_string());
    }

    fields.extend(
        Param::ALL
            .iter()
            .map(|p| format!("  \"{p}\": {}", params.get(*p))),
    );

    format!("{{\n{}\n}}", fields.join(",\n"))
}

pub(crate) fn answer_summary(questions: &[QuizQuestion], answers: &[QuizAnswer]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let question = questions.iter().find(|q| q.id == answer.question_id);
            let text = question.map(|q| q.text.as_str()).unwrap_or(&answer.question_id);

            match question.and_then(|q| q.option(&answer.value)) {
                Some(option) => format!(
                    "Q{}: \"{text}\" -> \"{}\" ({})",
                    i + 1,
                    option.label,
                    option.description
                ),
                None => format!("Q{}: \"{text}\" -> \"{}\"", i + 1, answer.value),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn generate_prompt(questions: &[QuizQuestion], answers: &[QuizAnswer]) -> String {
    format!(
        r#"You are an expert plant photography specialist. Based on the user's answers about their aesthetic preferences, create a great looking photo filter.

USER'S ANSWERS:
{answers}

PARAMETERS (keep subtle, within these ranges):
{ranges}

Brightness sets the exposure; contrast adds depth. Saturation controls color intensity; lower often looks more cinematic.
Temperature moves between blue (cool) and yellow (warm). Tint moves between green and magenta.
Fade, grain and vignette add texture in the manner of older cameras.

Also generate a gentle 2-3 word name.

Respond ONLY with valid JSON:
{template}"#,
        answers = answer_summary(questions, answers),
        ranges = range_lines(),
        template = json_template(&FilterParameters::default(), true),
    )
}

pub(crate) fn refine_prompt(current: &FilterParameters, instruction: &str) -> String {
    format!(
        r#"You are a photo filter expert. The user has an existing filter and wants to ADJUST it based on their feedback.

CURRENT FILTER PARAMETERS (these are the starting point):
{current}

USER'S ADJUSTMENT REQUEST: "{instruction}"

IMPORTANT: Make INCREMENTAL adjustments to the CURRENT values above. Do NOT start from scratch.
- If they say "warmer", ADD 5 to 15 to the current temperature
- If they say "more contrast", INCREASE the current contrast by 0.05 to 0.15
- Only change parameters relevant to their request
- Keep other parameters UNCHANGED from their current values

Parameter ranges for reference:
{ranges}

Respond ONLY with valid JSON containing the ADJUSTED values:
{template}"#,
        current = current_lines(current),
        instruction = instruction.trim(),
        ranges = range_lines(),
        template = json_template(current, false),
    )
}

pub(crate) fn vision_prompt(current: &FilterParameters) -> String {
    format!(
        r#"Analyze this reference image's color grading, mood, and visual style. Then ADJUST the user's current filter to incorporate elements of this style.

CURRENT FILTER PARAMETERS (starting point):
{current}

Analyze the reference image for overall exposure, color temperature, saturation, contrast and tonal range, film effects (grain, fade) and vignetting.

IMPORTANT: Make INCREMENTAL adjustments to blend the reference image's style INTO the current filter.
- Don't completely replace the current values
- Shift parameters TOWARD the reference style by 30-60% of the difference
- Preserve some of the original filter's character

Parameter ranges (use full range when appropriate):
{ranges}

Respond ONLY with valid JSON:
{template}"#,
        current = current_lines(current),
        ranges = range_lines(),
        template = json_template(current, false),
    )
}
