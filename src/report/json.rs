use serde::Serialize;

use crate::pipeline::stage6_profile::{EntityProfile, ProfileOutcome};
use crate::report::{FailureRecord, RunSummary, failures};

#[derive(Debug, Serialize)]
struct ProfilesDocument<'a> {
    tool: &'static str,
    run: &'a RunSummary,
    profiles: Vec<&'a EntityProfile>,
    failures: Vec<FailureRecord>,
}

pub fn render_profiles_json(
    summary: &RunSummary,
    outcomes: &[ProfileOutcome],
) -> serde_json::Result<String> {
    let doc = ProfilesDocument {
        tool: "peerprofile",
        run: summary,
        profiles: outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect(),
        failures: failures(outcomes),
    };
    serde_json::to_string_pretty(&doc)
}
