use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Args;
use safe_core::backlog::{default_strategic_themes, sample_backlog};
use safe_core::change::ChangeRequest;
use safe_core::types::{AgentRole, Tier};
use safe_core::Simulation;
use safe_llm::{ScriptedProvider, Turn};
use std::path::Path;

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Configuration tier: essential, portfolio, full
    #[arg(long)]
    tier: Option<String>,

    /// Project name
    #[arg(long, default_value = "Demo Project")]
    project: String,

    /// Sprints to run inside the PI
    #[arg(long, default_value = "2")]
    sprints: u32,

    /// Daily standups per sprint
    #[arg(long, default_value = "3")]
    days: u32,

    /// Seed for the random draws
    #[arg(long)]
    seed: Option<u64>,

    /// Use canned agent replies instead of the configured providers
    #[arg(long)]
    offline: bool,
}

pub fn run(config_path: Option<&Path>, args: DemoArgs, json: bool) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(tier) = &args.tier {
        config.tier = tier.parse::<Tier>()?;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if !args.offline {
        super::warn_missing_keys(&config);
    }

    let tier = config.tier;
    let mut builder = Simulation::builder(config);
    if args.offline {
        for role in AgentRole::all() {
            builder = builder.provider(
                *role,
                Box::new(ScriptedProvider::responder(offline_reply).named("offline")),
            );
        }
    }
    let mut sim = builder.build();

    let themes = tier.has_portfolio().then(default_strategic_themes);
    sim.setup_project(args.project.as_str(), sample_backlog(), themes)?;

    let pi = sim.start_pi().context("PI planning failed")?;
    if !json {
        println!("Started PI {} with {} items in scope", pi.pi_number, pi.scope.len());
    }

    let mut reviews = Vec::new();
    for _ in 0..args.sprints {
        let sprint = sim.start_sprint().context("sprint planning failed")?;
        if !json {
            println!(
                "Started Sprint {} with {} items (velocity {})",
                sprint.sprint_number,
                sprint.backlog.len(),
                sprint.velocity
            );
        }
        for _ in 0..args.days {
            let standup = sim.run_daily_standup().context("daily standup failed")?;
            if !json {
                println!(
                    "Completed Day {} standup ({} impediments)",
                    standup.day,
                    standup.impediments_addressed.len()
                );
            }
        }
        let review = sim.end_sprint().context("sprint review failed")?;
        if !json {
            println!(
                "Ended Sprint {} with {:.1}% completion",
                review.sprint_number, review.completion_rate
            );
        }
        reviews.push(review);
    }

    let pi_review = sim.end_pi().context("Inspect & Adapt failed")?;
    let change = ChangeRequest {
        urgency: "high".to_string(),
        estimate: Some(8),
        ..ChangeRequest::new("Add two-factor authentication", 9)
    };
    let outcome = sim.handle_change_request(&change)?;

    if json {
        return print_json(&serde_json::json!({
            "state": sim.state(),
            "sprints": reviews,
            "pi": pi_review,
            "change": outcome,
            "events": sim.events(None),
        }));
    }

    println!(
        "Ended PI {} with {:.1}% predictability",
        pi_review.pi_number, pi_review.metrics.predictability
    );
    println!("Change request handled by {}", outcome.handler);

    let events = sim.events(None);
    println!("\nEvent Log ({} events):", events.len());
    print_table(
        &["TIME", "PI", "SPRINT", "DAY", "TYPE", "DESCRIPTION"],
        events
            .iter()
            .map(|e| {
                vec![
                    e.timestamp.format("%H:%M:%S").to_string(),
                    e.pi.to_string(),
                    e.sprint.to_string(),
                    e.day.to_string(),
                    e.kind.to_string(),
                    e.description.clone(),
                ]
            })
            .collect(),
    );
    Ok(())
}

/// Canned reply echoing the first line of the latest prompt.
fn offline_reply(_system: &str, history: &[Turn]) -> String {
    let topic = history
        .last()
        .and_then(|t| t.content.lines().next())
        .unwrap_or("the request")
        .trim_end_matches(':');
    format!(
        "**Noted.** {topic}\n\n\
         - Keep the team focused on the highest priority items\n\
         - Review progress at the next sync\n\n\
         Sizing this as 5 story points."
    )
}
