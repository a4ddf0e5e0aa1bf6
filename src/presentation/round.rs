//=========================================================================
// Round Playback
//=========================================================================
//
// Glue between a flow phase and a scenario.
//
// Flow:
//   phase scope → child scope → wait(on_finished) + on(skip_requests)
//                             → scenario.start() → await outcome
//                             → child disposed (skip routing removed)
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::acts::{Scenario, SkipAll};
use crate::core::scope::Scope;
use crate::core::signal::Signal;
use crate::error::FlowError;

//=== play_scenario =======================================================

/// Plays `scenario` to its end inside `scope`.
///
/// Every emission of `skip_requests` fast-forwards the scenario,
/// including the act currently playing. An act failure is returned as
/// [`FlowError::Act`]; disposing `scope` first yields
/// [`FlowError::ScopeDisposed`].
pub async fn play_scenario(
    scope: &Scope,
    scenario: &Scenario,
    skip_requests: &Signal<()>,
) -> Result<(), FlowError> {
    if let Some(outcome) = scenario.outcome() {
        return outcome.map_err(FlowError::from);
    }

    scope
        .run(|round| async move {
            // Subscribe before starting: a fully synchronous run ends inside start()
            let finished = round.wait(scenario.on_finished());

            let target = scenario.clone();
            round.on(skip_requests, move |_| {
                debug!("Skip requested");
                target.skip_all_if_possible(SkipAll::INCLUDE_CURRENT);
            });

            scenario.start();
            finished.await?.map_err(FlowError::from)
        })
        .await
}

//=========================================================================
// Tests
//=========================================================================
