//! Aesthetic quiz and the rule-based answer mapping used when the remote
//! generator is unavailable.

use photo_filter::{FilterParameters, Param, synthesize_name, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizOption {
    pub value: String,
    pub label: String,

    #[serde(default)]
    pub description: String,

    /// Offsets added to the neutral value, keyed by parameter name.
    #[serde(default)]
    pub adjustments: BTreeMap<String, f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<QuizOption>,
}

impl QuizQuestion {
    pub fn option(&self, value: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizAnswer {
    #[serde(alias = "question")]
    pub question_id: String,

    #[serde(alias = "answer")]
    pub value: String,
}

impl QuizAnswer {
    pub fn new(question_id: impl ToString, value: impl ToString) -> Self {
        Self {
            question_id: question_id.to_string(),
            value: value.to_string(),
        }
    }
}

fn option(value: &str, label: &str, description: &str, adjustments: &[(Param, f64)]) -> QuizOption {
    QuizOption {
        value: value.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        adjustments: adjustments
            .iter()
            .map(|(p, v)| (p.key().to_string(), *v))
            .collect(),
    }
}

fn question(id: &str, text: &str, options: Vec<QuizOption>) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        text: text.to_string(),
        options,
    }
}

pub fn default_questions() -> Vec<QuizQuestion> {
    use Param::*;

    vec![
        question(
            "light",
            "Which light do you love most on plants?",
            vec![
                option(
                    "golden",
                    "Golden hour",
                    "warm, low sun through leaves",
                    &[(Temperature, 18.0), (Brightness, 0.05)],
                ),
                option(
                    "overcast",
                    "Soft overcast",
                    "even, diffused light",
                    &[(Contrast, -0.12), (Temperature, -4.0)],
                ),
                option(
                    "midday",
                    "Bright midday",
                    "crisp, high sun",
                    &[(Brightness, 0.15), (Contrast, 0.1)],
                ),
                option(
                    "dusk",
                    "Blue dusk",
                    "cool, fading light",
                    &[(Temperature, -18.0), (Brightness, -0.1)],
                ),
            ],
        ),
        question(
            "color",
            "How should the colors feel?",
            vec![
                option("vivid", "Vivid", "saturated greens and blooms", &[(Saturation, 0.35)]),
                option("natural", "Natural", "true to life", &[(Saturation, 0.05)]),
                option("muted", "Muted", "quiet, earthy tones", &[(Saturation, -0.35)]),
                option(
                    "washed",
                    "Washed out",
                    "pale and airy",
                    &[(Saturation, -0.2), (Fade, 0.12)],
                ),
            ],
        ),
        question(
            "mood",
            "Pick a mood.",
            vec![
                option(
                    "dreamy",
                    "Dreamy",
                    "soft and hazy",
                    &[(Fade, 0.15), (Contrast, -0.1), (Tint, 6.0)],
                ),
                option(
                    "dramatic",
                    "Dramatic",
                    "deep shadows, strong shapes",
                    &[(Contrast, 0.3), (Vignette, 0.35)],
                ),
                option(
                    "fresh",
                    "Fresh",
                    "bright morning greens",
                    &[(Brightness, 0.1), (Tint, -8.0)],
                ),
                option(
                    "nostalgic",
                    "Nostalgic",
                    "like an old photo album",
                    &[(Grain, 0.2), (Fade, 0.1), (Temperature, 8.0)],
                ),
            ],
        ),
        question(
            "texture",
            "How much texture?",
            vec![
                option("clean", "Clean", "smooth digital look", &[]),
                option("fine", "Fine grain", "a hint of texture", &[(Grain, 0.08)]),
                option(
                    "film",
                    "Film",
                    "heavy grain, darker edges",
                    &[(Grain, 0.18), (Vignette, 0.1)],
                ),
            ],
        ),
        question(
            "focus",
            "Where should the eye go?",
            vec![
                option("centre", "The centre", "a single hero plant", &[(Vignette, 0.3)]),
                option("everywhere", "Everywhere", "the whole garden", &[]),
                option(
                    "soft",
                    "Softly inward",
                    "gentle framing",
                    &[(Vignette, 0.12), (Fade, 0.05)],
                ),
            ],
        ),
    ]
}

/// Deterministic answer mapping: neutral values plus the offsets of every
/// chosen option, clamped, named by [`synthesize_name`].
///
/// Answers to unknown questions or with unknown values are ignored.
pub fn fallback_params(questions: &[QuizQuestion], answers: &[QuizAnswer]) -> FilterParameters {
    let mut totals: BTreeMap<Param, f64> = BTreeMap::new();

    for answer in answers {
        let Some(option) = questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .and_then(|q| q.option(&answer.value))
        else {
            log::debug!("ignore quiz answer {}={}", answer.question_id, answer.value);
            continue;
        };

        for (key, delta) in &option.adjustments {
            match Param::from_key(key) {
                Some(param) => *totals.entry(param).or_default() += delta,
                None => log::debug!("ignore unknown quiz adjustment `{key}`"),
            }
        }
    }

    let raw: Map<String, Value> = totals
        .into_iter()
        .map(|(param, delta)| {
            (
                param.key().to_string(),
                Value::from(param.default_value() as f64 + delta),
            )
        })
        .collect();

    let params = validate(&Value::Object(raw));
    let name = synthesize_name(&params);
    params.with_name(&name)
}
