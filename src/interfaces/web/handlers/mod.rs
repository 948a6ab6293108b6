pub mod credits;
pub mod jumps;
pub mod realtime;
pub mod streaming;
pub mod system;

use tracing::info;

use super::AppState;
use super::auth::Caller;
use super::error::ApiError;
use crate::core::generation::{FailurePolicy, GenerationRequest, JumpSequencer, ValidatedRequest};

/// Checks shared by both generation transports, in order: input validation,
/// provider availability, then the credit charge.
pub(crate) async fn prepare_generation(
    state: &AppState,
    caller: &Caller,
    request: &GenerationRequest,
    policy: FailurePolicy,
) -> Result<(JumpSequencer, ValidatedRequest), ApiError> {
    let validated = request.validate()?;
    let sequencer = state.sequencer(policy).ok_or(ApiError::NotConfigured)?;

    if state.config.generation.charge_credits && caller.authenticated {
        let balance = state
            .store
            .deduct_credit(&caller.user_id, "jump generation")
            .await?;
        info!(
            "Charged 1 credit to {} (remaining {})",
            caller.user_id, balance
        );
    }

    Ok((sequencer, validated))
}
