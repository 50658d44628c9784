//! Single access decisions.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use custodian::{AccessRequest, CancellationToken, Engine, FixedClock};
use custodian_config::CustodianConfig;
use custodian_types::{AccessDecision, Action, ActorId, PermissionName};
use serde::Serialize;
use tracing::debug;

use super::fixture;

/// Exit status for a denied request. Errors use 1.
const DENIED: u8 = 2;

pub struct DecideArgs {
    pub fixture: PathBuf,
    pub actor: String,
    pub action: Action,
    pub resource: Option<String>,
    pub permission: Option<PermissionName>,
    pub ip: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct Output<'a> {
    actor: &'a str,
    action: Action,
    resource: Option<&'a str>,
    #[serde(flatten)]
    decision: &'a AccessDecision,
}

/// Evaluates the request and prints the decision as JSON.
///
/// Ctrl-C cancels the evaluation, which is reported as an error rather
/// than a denial.
pub fn run(config: &CustodianConfig, args: &DecideArgs) -> Result<ExitCode> {
    let store = fixture::load(&args.fixture)?;
    let actor_id = ActorId::new(args.actor.as_str());
    let actor = store
        .actor(&actor_id)
        .context("Failed to read actors")?
        .with_context(|| format!("Unknown actor '{}' in fixture", args.actor))?;

    let mut engine = Engine::from_config(Arc::new(store), config)
        .context("Failed to build decision engine")?;
    if let Some(at) = args.at {
        engine = engine.with_clock(Arc::new(FixedClock::new(at)));
    }

    let mut request = AccessRequest::new(actor, args.action);
    if let Some(resource) = &args.resource {
        request = request.with_resource(resource.as_str());
    }
    if let Some(permission) = &args.permission {
        request = request.with_permission(permission.clone());
    }
    if let Some(ip) = &args.ip {
        request = request.with_network_origin(ip);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let decision = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, cancelling evaluation");
                on_interrupt.cancel();
            }
        });
        engine.evaluate(&request, &cancel).await
    })?;

    let output = Output {
        actor: &args.actor,
        action: args.action,
        resource: args.resource.as_deref(),
        decision: &decision,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if decision.is_allowed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(DENIED)
    })
}
