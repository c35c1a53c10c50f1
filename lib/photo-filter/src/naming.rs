use crate::params::FilterParameters;

pub const FALLBACK_NAME: &str = "Natural Leaf";

struct NameRule {
    matches: fn(&FilterParameters) -> bool,
    adjective: &'static str,
    noun: &'static str,
}

// Checked in order, the first match supplies the noun.
const RULES: [NameRule; 13] = [
    NameRule {
        matches: |p| p.saturation() >= 1.3,
        adjective: "Lush",
        noun: "Leaf",
    },
    NameRule {
        matches: |p| p.saturation() <= 0.7,
        adjective: "Muted",
        noun: "Moss",
    },
    NameRule {
        matches: |p| p.temperature() >= 15.0,
        adjective: "Golden",
        noun: "Bloom",
    },
    NameRule {
        matches: |p| p.temperature() <= -15.0,
        adjective: "Frosted",
        noun: "Fern",
    },
    NameRule {
        matches: |p| p.grain() >= 0.15,
        adjective: "Film",
        noun: "Petal",
    },
    NameRule {
        matches: |p| p.fade() >= 0.15,
        adjective: "Faded",
        noun: "Meadow",
    },
    NameRule {
        matches: |p| p.vignette() >= 0.3,
        adjective: "Moody",
        noun: "Grove",
    },
    NameRule {
        matches: |p| p.contrast() >= 1.25,
        adjective: "Bold",
        noun: "Thorn",
    },
    NameRule {
        matches: |p| p.contrast() <= 0.8,
        adjective: "Soft",
        noun: "Blossom",
    },
    NameRule {
        matches: |p| p.brightness() >= 1.2,
        adjective: "Bright",
        noun: "Sprout",
    },
    NameRule {
        matches: |p| p.brightness() <= 0.8,
        adjective: "Shadow",
        noun: "Ivy",
    },
    NameRule {
        matches: |p| p.tint() >= 10.0,
        adjective: "Rose",
        noun: "Garden",
    },
    NameRule {
        matches: |p| p.tint() <= -10.0,
        adjective: "Mint",
        noun: "Canopy",
    },
];

/// Derive a display name from the dominant characteristics of `params`.
pub fn synthesize_name(params: &FilterParameters) -> String {
    let mut hits = RULES.iter().filter(|rule| (rule.matches)(params));

    match (hits.next(), hits.next()) {
        (None, _) => FALLBACK_NAME.to_string(),
        (Some(first), None) => format!("{} {}", first.adjective, first.noun),
        (Some(first), Some(second)) => {
            format!("{} {} {}", first.adjective, second.adjective, first.noun)
        }
    }
}

/// Lowercase ASCII filename stem; runs of anything else collapse to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "filter".to_string()
    } else {
        slug
    }
}
