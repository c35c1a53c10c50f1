use super::{generator, open_store, print_params};
use crate::{cli::QuizArgs, config::Config};
use anyhow::{Context, Result, bail};
use filter_gen::{QuizAnswer, QuizQuestion, default_questions, generate_or_fallback};
use photo_filter::{FilterSource, SavedFilter};
use serde_json::Value;
use std::io::{self, BufRead, Write};

pub(super) async fn run(args: QuizArgs, config: &Config) -> Result<()> {
    let questions = default_questions();

    let answers = match &args.answers {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            parse_answers(&text).with_context(|| format!("parse {}", path.display()))?
        }
        None => ask(&questions, &mut io::stdin().lock(), &mut io::stdout())?,
    };

    let generator = if args.offline {
        None
    } else {
        let generator = generator(config);
        if generator.is_none() {
            log::info!("no API key configured, using the built-in quiz mapping");
        }
        generator
    };

    let params = generate_or_fallback(generator.as_ref(), &questions, &answers).await;
    print_params(&params)?;

    if args.save {
        let store = open_store(config).await?;
        let record = SavedFilter::new(params, FilterSource::Quiz);
        store.insert(&record).await?;
        println!("saved as {}", record.id);
        store.close().await;
    }

    Ok(())
}

/// Accepts `[{"question": .., "answer": ..}]` or `{"light": "golden", ..}`.
pub fn parse_answers(text: &str) -> Result<Vec<QuizAnswer>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(question, answer)| match answer {
                Value::String(value) => Ok(QuizAnswer::new(question, value)),
                other => bail!("answer to `{question}` must be a string, got {other}"),
            })
            .collect(),
        raw @ Value::Array(_) => Ok(serde_json::from_value(raw)?),
        other => bail!("expected a JSON array or object of answers, got {other}"),
    }
}

/// Prompt for each question. A blank line skips it, end of input stops early.
fn ask(
    questions: &[QuizQuestion],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Vec<QuizAnswer>> {
    let mut answers = Vec::with_capacity(questions.len());

    'questions: for question in questions {
        writeln!(output, "\n{}", question.text)?;
        for (i, option) in question.options.iter().enumerate() {
            writeln!(output, "  {}) {} - {}", i + 1, option.label, option.description)?;
        }

        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break 'questions;
            }

            let line = line.trim();
            if line.is_empty() {
                continue 'questions;
            }

            let chosen = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| question.options.get(i))
                .or_else(|| question.option(line));

            match chosen {
                Some(option) => {
                    answers.push(QuizAnswer::new(&question.id, &option.value));
                    continue 'questions;
                }
                None => writeln!(output, "pick 1-{}", question.options.len())?,
            }
        }
    }

    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer_list() -> Result<()> {
        let answers = parse_answers(
            r#"[{"question": "light", "answer": "golden"}, {"question_id": "mood", "value": "calm"}]"#,
        )?;
        assert_eq!(
            answers,
            [QuizAnswer::new("light", "golden"), QuizAnswer::new("mood", "calm")]
        );
        Ok(())
    }

    #[test]
    fn test_parse_answer_map() -> Result<()> {
        let answers = parse_answers(r#"{"color": "vivid"}"#)?;
        assert_eq!(answers, [QuizAnswer::new("color", "vivid")]);

        assert!(parse_answers(r#"{"color": 3}"#).is_err());
        assert!(parse_answers("42").is_err());
        Ok(())
    }

    #[test]
    fn test_ask_by_number_and_value() -> Result<()> {
        let questions = default_questions();
        let second_value = questions[1].options[0].value.clone();

        let mut input = io::Cursor::new(format!("9\n2\n{second_value}\n\n"));
        let mut output = Vec::new();
        let answers = ask(&questions, &mut input, &mut output)?;

        assert_eq!(
            answers,
            [
                QuizAnswer::new(&questions[0].id, &questions[0].options[1].value),
                QuizAnswer::new(&questions[1].id, &second_value),
            ]
        );

        let transcript = String::from_utf8(output)?;
        assert!(transcript.contains(&questions[0].text));
        assert!(transcript.contains("pick 1-"));
        Ok(())
    }
}
