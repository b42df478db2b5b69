//! User-facing prompt text

use super::ConvContext;
use crate::catalog::{DATA_SOURCE, DATA_VALID_AS_OF};
use crate::gateway::OutboundMessage;
use crate::valuation::{Valuation, MAX_YEAR, MIN_YEAR};

pub fn choose_make(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(&ctx.conversation_id, "🚗 Hi! Choose the car make:")
        .with_choices(ctx.catalog.list_makes())
}

pub fn unknown_make(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        "❌ Make not found. Choose one from the list:",
    )
    .with_choices(ctx.catalog.list_makes())
}

pub fn choose_model(ctx: &ConvContext, make: &str) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        format!("You chose {make}. Now choose the model:"),
    )
    .with_choices(ctx.catalog.list_models(make))
}

pub fn unknown_model(ctx: &ConvContext, make: &str) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        "❌ Model not found. Choose one from the list:",
    )
    .with_choices(ctx.catalog.list_models(make))
}

pub fn enter_year(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        format!("Enter the model year ({MIN_YEAR}–{MAX_YEAR}):"),
    )
}

pub fn year_not_a_number(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        "❌ The year must be a number. Try again:",
    )
}

pub fn year_out_of_range(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        format!("❌ The year must be between {MIN_YEAR} and {MAX_YEAR}:"),
    )
}

pub fn enter_mileage(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(&ctx.conversation_id, "Enter the mileage in kilometres:")
}

pub fn mileage_not_a_number(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(&ctx.conversation_id, "❌ The mileage must be a number:")
}

pub fn send_photo(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        "Send a photo of the car (one is enough):",
    )
}

pub fn photo_expected(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(&ctx.conversation_id, "📸 Please send a photo of the car!")
}

pub fn start_fresh(ctx: &ConvContext) -> OutboundMessage {
    OutboundMessage::new(
        &ctx.conversation_id,
        "❌ Start a fresh valuation with /start first",
    )
}

pub fn valuation_result(ctx: &ConvContext, valuation: &Valuation) -> OutboundMessage {
    let text = format!(
        "✅ *Valuation complete!*\n\n\
         Make: {make}\n\
         Model: {model}\n\
         Year: {year}\n\
         Mileage: {mileage} km\n\n\
         💰 *Price: ${price} USD*\n\n\
         📅 Data valid as of {DATA_VALID_AS_OF}\n\
         📈 Source: {DATA_SOURCE}",
        make = escape_markdown(&valuation.make),
        model = escape_markdown(&valuation.model),
        year = valuation.year,
        mileage = group_thousands(valuation.mileage),
        price = group_thousands(u64::from(valuation.price)),
    );
    OutboundMessage::new(&ctx.conversation_id, text).with_markdown()
}

/// Escape the characters legacy Telegram Markdown treats as entity markers
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Format with comma thousands separators: `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
