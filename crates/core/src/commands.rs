//! Command Dispatcher.
//!
//! Parses `/<verb> ...` commands from the PR description and comments,
//! applies the `/reviewers` authorization rule against the running
//! requirement, and authorizes `/approve`/`/tag` against the configured
//! integrator list. Every other command's effect on the projection is a
//! mutation to [`crate::projector::CommandEffects`], never a direct
//! `ForgeAdapter` call.

use std::collections::HashMap;

use jcheck_platforms::models::{Comment, PullRequest, User};

use crate::config::COMMAND_LINE_REGEX;
use crate::models::{CommentMarker, OutboundComment, ReviewerRequirement, Role};

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// The literal denial reply for an unauthorized `/reviewers` decrease
///.
pub const DENY_REVIEWERS_DECREASE_MESSAGE: &str =
    "Only Reviewers are allowed to decrease the number of required reviewers.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reviewers { count: u32, role: Option<Role> },
    Approve { verdict: bool, id: Option<String> },
    Tag { name: String },
    Integrate,
    Sponsor,
    Csr,
    Jep,
    Touch,
    Keepalive,
    IssueAdd { id: String },
    Unrecognized { verb: String },
}

fn parse_role(token: &str) -> Option<Role> {
    match token.to_ascii_lowercase().as_str() {
        "contributor" => Some(Role::Contributor),
        "author" => Some(Role::Author),
        "committer" => Some(Role::Committer),
        "reviewer" => Some(Role::Reviewer),
        "lead" => Some(Role::Lead),
        _ => None,
    }
}

fn to_command(verb: &str, rest: &str) -> Command {
    match verb {
        "reviewers" => {
            let mut parts = rest.split_whitespace();
            let count = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let role = parts.next().and_then(parse_role);
            Command::Reviewers { count, role }
        }
        "approve" => {
            let mut parts = rest.split_whitespace();
            let verdict = matches!(parts.next(), Some("yes"));
            let id = parts.next().map(|s| s.to_string());
            Command::Approve { verdict, id }
        }
        "tag" => Command::Tag {
            name: rest.trim().to_string(),
        },
        "integrate" => Command::Integrate,
        "sponsor" => Command::Sponsor,
        "csr" => Command::Csr,
        "jep" => Command::Jep,
        "touch" => Command::Touch,
        "keepalive" => Command::Keepalive,
        "issue" if rest.starts_with("add ") => Command::IssueAdd {
            id: rest[4..].trim().to_string(),
        },
        other => Command::Unrecognized {
            verb: other.to_string(),
        },
    }
}

/// Parses every `/<verb> ...` command line found in `text`.
pub fn parse_commands(text: &str) -> Vec<Command> {
    COMMAND_LINE_REGEX
        .captures_iter(text)
        .map(|captures| {
            let verb = captures[1].to_ascii_lowercase();
            let rest = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            to_command(&verb, rest)
        })
        .collect()
}

/// A command tied to the user who issued it and its position in the
/// PR's overall command stream.
#[derive(Debug, Clone)]
pub struct DispatchedCommand {
    pub command: Command,
    pub issuer: User,
    pub generation: u64,
}

/// Collects every command embedded in the PR body (processed once, as the
/// author's command) followed by every comment's commands in strict
/// chronological order, assigning a running generation
/// counter as they are discovered.
pub fn collect_commands(pr: &PullRequest) -> Vec<DispatchedCommand> {
    let mut dispatched = Vec::new();
    let mut generation = 0u64;

    if let (Some(body), Some(author)) = (pr.body.as_deref(), pr.author.clone()) {
        for command in parse_commands(body) {
            dispatched.push(DispatchedCommand {
                command,
                issuer: author.clone(),
                generation,
            });
            generation += 1;
        }
    }

    let mut comments: Vec<&Comment> = pr.comments.iter().collect();
    comments.sort_by_key(|c| c.created_at_epoch_ms);
    for comment in comments {
        for command in parse_commands(&comment.body) {
            dispatched.push(DispatchedCommand {
                command,
                issuer: comment.user.clone(),
                generation,
            });
            generation += 1;
        }
    }

    dispatched
}

fn reviewers_reply(generation: u64, message: &str) -> OutboundComment {
    let marker = CommentMarker::keyed("reviewers-command", &generation.to_string());
    OutboundComment {
        body: format!("{message}\n\n{}", marker.as_str()),
        marker,
        one_shot: false,
    }
}

/// Folds every `/reviewers` command over `config_requirement` in order:
/// raising the count for a role is always allowed; lowering it below the
/// running requirement is allowed only for an issuer with role ≥
/// Reviewer, otherwise the command is rejected with a marker-keyed reply
///.
pub fn apply_reviewer_commands(
    config_requirement: &ReviewerRequirement,
    commands: &[DispatchedCommand],
    issuer_roles: &HashMap<u64, Role>,
) -> (ReviewerRequirement, Vec<OutboundComment>) {
    let mut effective = config_requirement.clone();
    let mut replies = Vec::new();

    for dispatched in commands {
        let Command::Reviewers { count, role } = &dispatched.command else {
            continue;
        };
        let role = role.unwrap_or(Role::Reviewer);
        let current = effective.get(role);
        let issuer_role = issuer_roles
            .get(&dispatched.issuer.id)
            .copied()
            .unwrap_or(Role::Contributor);

        if *count >= current || issuer_role >= Role::Reviewer {
            let mut map = effective.0.clone();
            map.insert(role, *count);
            effective = ReviewerRequirement(map);
        } else {
            replies.push(reviewers_reply(dispatched.generation, DENY_REVIEWERS_DECREASE_MESSAGE));
        }
    }

    (effective, replies)
}

/// `/approve` and `/tag` are restricted to configured integrators
///.
pub fn is_integrator(issuer: &User, integrators: &[String]) -> bool {
    integrators.iter().any(|name| name == &issuer.login)
}

/// Authorizes and validates a `/tag <name>` command: issuer must be a
/// configured integrator, the name must match the repository's tag
/// pattern, and it must not already exist.
pub fn authorize_tag(
    name: &str,
    issuer: &User,
    integrators: &[String],
    tag_pattern: Option<&regex::Regex>,
    existing_tags: &[String],
) -> Result<(), String> {
    if !is_integrator(issuer, integrators) {
        return Err("Only configured integrators may create a tag.".to_string());
    }
    if let Some(pattern) = tag_pattern {
        if !pattern.is_match(name) {
            return Err(format!(
                "Tag name `{name}` does not match the repository's tag pattern."
            ));
        }
    }
    if existing_tags.iter().any(|t| t == name) {
        return Err(format!("Tag `{name}` already exists."));
    }
    Ok(())
}
