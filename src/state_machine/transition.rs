//! Pure state transition function
//!
//! Dispatch looks at the session's current step first, then the event. The
//! function performs no I/O: session storage and message delivery are
//! described as effects and carried out by the runtime.

use super::prompts;
use super::{ConvContext, Effect, Event, Session, Step};
use crate::valuation::{appraise, MAX_YEAR, MIN_YEAR};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    /// Step after the event; `None` once the session is gone
    pub new_step: Option<Step>,
    pub effects: Vec<Effect>,
    /// Why the input was rejected, if it was
    pub rejection: Option<InputError>,
}

impl TransitionResult {
    /// Session (re)created at the first step
    fn started() -> Self {
        Self {
            new_step: Some(Step::AwaitingMake),
            effects: vec![Effect::CreateSession],
            rejection: None,
        }
    }

    /// Input accepted, move to the next step
    fn advance(step: Step) -> Self {
        Self {
            new_step: Some(step),
            effects: vec![Effect::PersistSession],
            rejection: None,
        }
    }

    /// Input rejected, session untouched
    fn reject(step: &Step, error: InputError) -> Self {
        Self {
            new_step: Some(step.clone()),
            effects: vec![],
            rejection: Some(error),
        }
    }

    /// Final step done, the session is deleted
    fn finished() -> Self {
        Self {
            new_step: None,
            effects: vec![],
            rejection: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Recoverable input errors; each one results in a re-prompt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{text:?} is not one of the offered choices")]
    InvalidSelection { text: String },
    #[error("{text:?} is not a number")]
    InvalidNumber { text: String },
    #[error("{text:?} is out of range")]
    OutOfRange { text: String },
    #[error("Expected {expected}, got {received}")]
    UnexpectedEventType {
        expected: &'static str,
        received: &'static str,
    },
}

/// Pure transition function
///
/// A conversation without a session starts one no matter what it sent.
pub fn transition(session: Option<&Session>, ctx: &ConvContext, event: Event) -> TransitionResult {
    let Some(session) = session else {
        return start(ctx);
    };

    match (&session.step, event) {
        (_, Event::Restart) => start(ctx),

        (Step::AwaitingMake, Event::Text { text }) => match ctx.catalog.is_valid_make(&text) {
            Some(make) => {
                let reply = prompts::choose_model(ctx, make);
                TransitionResult::advance(Step::AwaitingModel {
                    make: make.to_string(),
                })
                .with_effect(Effect::reply(reply))
            }
            None => TransitionResult::reject(&session.step, InputError::InvalidSelection { text })
                .with_effect(Effect::reply(prompts::unknown_make(ctx))),
        },

        (Step::AwaitingModel { make }, Event::Text { text }) => {
            match ctx.catalog.is_valid_model(make, &text) {
                Some(model) => TransitionResult::advance(Step::AwaitingYear {
                    make: make.clone(),
                    model: model.to_string(),
                })
                .with_effect(Effect::reply(prompts::enter_year(ctx))),
                None => {
                    TransitionResult::reject(&session.step, InputError::InvalidSelection { text })
                        .with_effect(Effect::reply(prompts::unknown_model(ctx, make)))
                }
            }
        }

        (Step::AwaitingYear { make, model }, Event::Text { text }) => match parse_year(&text) {
            Ok(year) => TransitionResult::advance(Step::AwaitingMileage {
                make: make.clone(),
                model: model.clone(),
                year,
            })
            .with_effect(Effect::reply(prompts::enter_mileage(ctx))),
            Err(error) => {
                let reply = match error {
                    InputError::OutOfRange { .. } => prompts::year_out_of_range(ctx),
                    _ => prompts::year_not_a_number(ctx),
                };
                TransitionResult::reject(&session.step, error).with_effect(Effect::reply(reply))
            }
        },

        (Step::AwaitingMileage { make, model, year }, Event::Text { text }) => {
            match parse_mileage(&text) {
                Ok(mileage) => TransitionResult::advance(Step::AwaitingPhoto {
                    make: make.clone(),
                    model: model.clone(),
                    year: *year,
                    mileage,
                })
                .with_effect(Effect::reply(prompts::send_photo(ctx))),
                Err(error) => TransitionResult::reject(&session.step, error)
                    .with_effect(Effect::reply(prompts::mileage_not_a_number(ctx))),
            }
        }

        (
            Step::AwaitingPhoto {
                make,
                model,
                year,
                mileage,
            },
            Event::Photo { .. },
        ) => {
            let valuation = appraise(&ctx.catalog, make, model, *year, *mileage);
            let reply = prompts::valuation_result(ctx, &valuation);
            TransitionResult::finished()
                .with_effect(Effect::Completed { valuation })
                .with_effect(Effect::reply(reply))
                .with_effect(Effect::DeleteSession)
        }

        (Step::AwaitingPhoto { .. }, Event::Text { .. }) => TransitionResult::reject(
            &session.step,
            InputError::UnexpectedEventType {
                expected: "photo",
                received: "text",
            },
        )
        .with_effect(Effect::reply(prompts::photo_expected(ctx))),

        (step, Event::Photo { .. }) => TransitionResult::reject(
            step,
            InputError::UnexpectedEventType {
                expected: "text",
                received: "photo",
            },
        )
        .with_effect(Effect::reply(prompts::start_fresh(ctx))),
    }
}

fn start(ctx: &ConvContext) -> TransitionResult {
    TransitionResult::started().with_effect(Effect::reply(prompts::choose_make(ctx)))
}

/// Parse a model year: ASCII digits only, within the supported range
pub fn parse_year(text: &str) -> Result<u16, InputError> {
    check_digits(text)?;
    text.parse()
        .ok()
        .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
        .ok_or_else(|| InputError::OutOfRange {
            text: text.to_string(),
        })
}

/// Parse a mileage in kilometres: ASCII digits only
///
/// Any digit string is a valid mileage. Values past `u64::MAX` saturate; the
/// price has long since reached the floor by then.
pub fn parse_mileage(text: &str) -> Result<u64, InputError> {
    check_digits(text)?;
    // Only overflow can fail past the digit check
    Ok(text.parse().unwrap_or(u64::MAX))
}

/// Digit-only check: no whitespace, signs, separators or decimal points
fn check_digits(text: &str) -> Result<(), InputError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::InvalidNumber {
            text: text.to_string(),
        });
    }
    Ok(())
}
