// Right checks against a fixture world

use crate::world::{lookup, WorldSpec};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use warden_authorization::{CheckRequest, RightChecker};
use warden_core::{CheckerConfig, GuestCredentials, Principal, RightCatalog};

#[derive(Args)]
pub struct CheckArgs {
    /// World fixture
    #[arg(short, long)]
    pub world: PathBuf,

    /// Grantee entry name or id; omit for an anonymous check
    #[arg(short, long, conflicts_with = "guest")]
    pub grantee: Option<String>,

    /// Check as an unauthenticated guest with this email
    #[arg(long)]
    pub guest: Option<String>,

    /// Guest password
    #[arg(long, requires = "guest")]
    pub password: Option<String>,

    /// Target entry name, id or `globalgrant`
    #[arg(short, long)]
    pub target: String,

    /// Right name
    #[arg(long)]
    pub right: String,

    /// Ask for the right to grant the right onward
    #[arg(long)]
    pub delegate: bool,

    /// Report the deciding grant
    #[arg(long)]
    pub via: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: &CheckerConfig, catalog: Arc<RightCatalog>, args: &CheckArgs) -> Result<()> {
    let directory = WorldSpec::load(&args.world)?.build(&catalog, &config.grants)?;
    let right = catalog.lookup(&args.right)?;
    let target = lookup(&*directory, &args.target)?;
    let principal = match (&args.grantee, &args.guest) {
        (Some(grantee), _) => Principal::Entry(lookup(&*directory, grantee)?),
        (None, Some(email)) => Principal::Guest(GuestCredentials::with_password(
            email.as_str(),
            args.password.clone().unwrap_or_default(),
        )),
        (None, None) => Principal::Anonymous,
    };

    let checker = RightChecker::from_config(directory, catalog, config);
    let mut request = CheckRequest::new(&principal, &target, &right).delegate(args.delegate);
    if args.via {
        request = request.with_via();
    }

    let evaluation = match checker.evaluate(&request) {
        Ok(evaluation) => evaluation,
        Err(e) if e.is_permission_denied() => {
            info!(reason = ?e.denial_reason(), "refused by hard rule");
            println!("DENY ({e})");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }
    let effective = evaluation
        .decision
        .resolve_with(right.default_decision(), false);
    println!("{} (effective: {effective})", evaluation.decision);
    if let Some(via) = &evaluation.via {
        println!(
            "via {}{} {} {} on {}",
            if via.negative { "-" } else { "" },
            via.right,
            via.grantee_type,
            via.grantee,
            via.target_name.as_deref().unwrap_or("?"),
        );
    }
    Ok(())
}
