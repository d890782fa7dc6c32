// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-step handlers for the scripted onboarding flow.
//!
//! A handler validates the inbound text, performs its durable writes, and
//! names the next step. It never touches the session itself; the engine owns
//! session persistence, so a handler error always leaves the step unchanged.

use fixline_core::types::{ProviderProfile, User};
use fixline_core::{AccountStatus, AccountType, EntityGateway, FixlineError, Step};
use fixline_session::recovery::{Recovered, derive_step};
use fixline_session::now_rfc3339;
use tracing::info;

use crate::validate;

/// A handled step: where the conversation goes next, with an optional
/// acknowledgment line prepended to the next step's prompt.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub next: Step,
    pub ack: Option<String>,
}

impl HandlerOutcome {
    fn advance(next: Step, ack: impl Into<String>) -> Self {
        Self {
            next,
            ack: Some(ack.into()),
        }
    }

    fn stay(step: Step) -> Self {
        Self {
            next: step,
            ack: None,
        }
    }
}

/// Runs the handler for a scripted (non-menu) step.
pub async fn handle_step(
    entities: &dyn EntityGateway,
    user: &User,
    step: Step,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    match step {
        Step::AwaitingTerms => terms(entities, user, text).await,
        Step::AwaitingAccountType => account_type(entities, user, text).await,
        Step::AwaitingName => name(entities, user, text).await,
        Step::AwaitingNationalId => national_id(entities, user, text).await,
        Step::AwaitingCity => city(entities, user, text).await,
        Step::AwaitingAddress => address(entities, user, text).await,
        Step::AwaitingLocation => location(entities, user, text).await,
        Step::AwaitingCategory => category(entities, user, text).await,
        Step::AwaitingService => service(entities, user, text).await,
        Step::AwaitingDescription => description(entities, user, text).await,
        Step::AwaitingRate => rate(entities, user, text).await,
        Step::AwaitingIdPhoto => id_photo(entities, user, text).await,
        Step::AwaitingVerification => verification(user),
        Step::Suspended | Step::Inactive => reactivation(entities, user, step, text).await,
        Step::ClientMenu | Step::ProviderMenu => Err(FixlineError::Internal(
            "menu steps are handled by the dispatcher".into(),
        )),
    }
}

fn is_provider(user: &User) -> bool {
    user.account_type == Some(AccountType::ServiceProvider)
}

async fn save_user(entities: &dyn EntityGateway, user: User) -> Result<(), FixlineError> {
    let mut user = user;
    user.updated_at = now_rfc3339();
    entities.update_user(&user).await
}

async fn terms(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let answer = text.trim().to_lowercase();
    if !matches!(answer.as_str(), "accept" | "agree" | "yes" | "ok" | "1") {
        return Err(FixlineError::validation(
            "Please reply ACCEPT to agree to the terms of service.",
        ));
    }
    let mut updated = user.clone();
    updated.terms_accepted = true;
    save_user(entities, updated).await?;
    Ok(HandlerOutcome::advance(
        Step::AwaitingAccountType,
        "Thank you!",
    ))
}

async fn account_type(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let chosen = match text.trim().to_lowercase().as_str() {
        "1" | "client" => AccountType::Client,
        "2" | "provider" | "service provider" => AccountType::ServiceProvider,
        _ => {
            return Err(FixlineError::validation(
                "Please reply 1 for Client or 2 for Service Provider.",
            ));
        }
    };
    let mut updated = user.clone();
    updated.account_type = Some(chosen);
    save_user(entities, updated).await?;
    if chosen == AccountType::ServiceProvider {
        // The empty profile row anchors provider onboarding and recovery.
        entities
            .upsert_provider_profile(&ProviderProfile::new(&user.phone))
            .await?;
    }
    Ok(HandlerOutcome::advance(Step::AwaitingName, "Got it."))
}

async fn name(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let name = validate::name(text)?;
    let ack = format!("Nice to meet you, {name}.");
    let mut updated = user.clone();
    updated.name = Some(name);
    save_user(entities, updated).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingNationalId, ack))
}

async fn national_id(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let id = validate::national_id(text)?;
    let mut updated = user.clone();
    updated.national_id = Some(id);
    save_user(entities, updated).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingCity, "Thanks."))
}

async fn city(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let city = validate::place(text, "city")?;
    let mut updated = user.clone();
    updated.city = Some(city);
    save_user(entities, updated).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingAddress, "Thanks."))
}

async fn address(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let address = validate::place(text, "street address")?;
    let mut updated = user.clone();
    updated.address = Some(address);
    save_user(entities, updated).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingLocation, "Thanks."))
}

async fn location(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let (lat, lon) = validate::coordinates(text)?;
    let mut updated = user.clone();
    updated.latitude = Some(lat);
    updated.longitude = Some(lon);
    save_user(entities, updated).await?;
    if is_provider(user) {
        Ok(HandlerOutcome::advance(
            Step::AwaitingCategory,
            "Location saved.",
        ))
    } else {
        info!(phone = %user.phone, "client onboarding complete");
        Ok(HandlerOutcome::advance(
            Step::ClientMenu,
            "Location saved. Your profile is complete!",
        ))
    }
}

async fn provider_profile(
    entities: &dyn EntityGateway,
    user: &User,
) -> Result<ProviderProfile, FixlineError> {
    Ok(entities
        .get_provider_profile(&user.phone)
        .await?
        .unwrap_or_else(|| ProviderProfile::new(&user.phone)))
}

async fn category(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let categories = entities.list_categories().await?;
    let offered: Vec<i64> = categories.iter().map(|c| c.id).collect();
    let chosen = validate::selection(text, &offered, "category")?;
    let mut profile = provider_profile(entities, user).await?;
    profile.category_id = Some(chosen);
    // Changing category invalidates any previously chosen service.
    profile.service_id = None;
    entities.upsert_provider_profile(&profile).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingService, "Great."))
}

async fn service(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let mut profile = provider_profile(entities, user).await?;
    let category_id = profile.category_id.ok_or_else(|| {
        FixlineError::Internal("service step reached without a category".into())
    })?;
    let services = entities.list_services(category_id).await?;
    let offered: Vec<i64> = services.iter().map(|s| s.id).collect();
    let chosen = validate::selection(text, &offered, "service")?;
    profile.service_id = Some(chosen);
    entities.upsert_provider_profile(&profile).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingDescription, "Great."))
}

async fn description(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let description = validate::description(text)?;
    let mut profile = provider_profile(entities, user).await?;
    profile.description = Some(description);
    entities.upsert_provider_profile(&profile).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingRate, "Sounds good."))
}

async fn rate(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    let rate = validate::hourly_rate(text)?;
    let mut profile = provider_profile(entities, user).await?;
    profile.hourly_rate = Some(rate);
    entities.upsert_provider_profile(&profile).await?;
    Ok(HandlerOutcome::advance(Step::AwaitingIdPhoto, "Noted."))
}

async fn id_photo(
    entities: &dyn EntityGateway,
    user: &User,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    // The channel layer turns an inbound image into a media reference string.
    let reference = text.trim();
    if reference.is_empty() {
        return Err(FixlineError::validation(
            "Please send a photo of your national ID.",
        ));
    }
    let mut profile = provider_profile(entities, user).await?;
    profile.id_image_ref = Some(reference.to_string());
    profile.profile_completed = true;
    entities.upsert_provider_profile(&profile).await?;
    info!(phone = %user.phone, "provider profile submitted for verification");
    Ok(HandlerOutcome::advance(
        Step::AwaitingVerification,
        "Thank you! Your profile has been submitted for verification.",
    ))
}

fn verification(user: &User) -> Result<HandlerOutcome, FixlineError> {
    if user.verified {
        Ok(HandlerOutcome::advance(
            Step::ProviderMenu,
            "Good news — your profile has been verified!",
        ))
    } else {
        Ok(HandlerOutcome::stay(Step::AwaitingVerification))
    }
}

/// Suspended and Inactive repeat a fixed message until the user sends the
/// explicit reactivation command, which restores `Active` and resumes at
/// whatever step the durable record supports.
async fn reactivation(
    entities: &dyn EntityGateway,
    user: &User,
    step: Step,
    text: &str,
) -> Result<HandlerOutcome, FixlineError> {
    if !text.trim().eq_ignore_ascii_case("reactivate") {
        return Ok(HandlerOutcome::stay(step));
    }
    let mut updated = user.clone();
    updated.status = AccountStatus::Active;
    save_user(entities, updated.clone()).await?;
    let profile = if is_provider(&updated) {
        entities.get_provider_profile(&updated.phone).await?
    } else {
        None
    };
    let next = match derive_step(Some(&updated), profile.as_ref()) {
        Recovered::Resume(step) => step,
        Recovered::NewUser => Step::AwaitingTerms,
    };
    info!(phone = %user.phone, next = %next, "account reactivated");
    Ok(HandlerOutcome::advance(
        next,
        "Your account has been reactivated.",
    ))
}
