//! In-memory implementations of every adapter trait, used by `jcheck_core`'s
//! own unit tests and by the `jcheck-integration-tests` crate to exercise
//! the end-to-end scenarios of spec §8 without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::Error;
use crate::models::{
    Comment, Issue, IssueState, Label, MergeProbeOutcome, PullRequest, PullRequestFile, Review,
    StatusCheck, User, VcsCommit,
};
use crate::{CensusRole, CensusStore, ForgeAdapter, IssueTrackerAdapter, JCheckEngine, VCSAdapter};

/// An in-memory forge: pull requests keyed by number, files keyed by
/// `(ref, path)` for config resolution, and a monotonic comment id counter.
#[derive(Default)]
pub struct FakeForge {
    pull_requests: Mutex<HashMap<u64, PullRequest>>,
    files: Mutex<HashMap<(String, String), String>>,
    changed_files: Mutex<HashMap<u64, Vec<PullRequestFile>>>,
    next_comment_id: Mutex<u64>,
}

impl FakeForge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds (or replaces) a pull request.
    pub fn insert_pull_request(&self, pr: PullRequest) {
        self.pull_requests.lock().unwrap().insert(pr.number, pr);
    }

    /// Seeds the content of `path` at `git_ref`, e.g. the `.jcheck/conf`
    /// that the Configuration Resolver reads.
    pub fn insert_file(&self, git_ref: &str, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert((git_ref.to_string(), path.to_string()), content.to_string());
    }

    /// Seeds the set of files `list_files` reports as changed by
    /// `pr_number`, e.g. so the Check Executor's no-changes/changes-subset
    /// checks have something non-empty to reason about.
    pub fn set_changed_files(&self, pr_number: u64, files: Vec<PullRequestFile>) {
        self.changed_files.lock().unwrap().insert(pr_number, files);
    }

    fn get_mut<'a>(
        map: &'a mut HashMap<u64, PullRequest>,
        pr_number: u64,
    ) -> Result<&'a mut PullRequest, Error> {
        map.get_mut(&pr_number)
            .ok_or_else(|| Error::NotFound(format!("pull request #{pr_number}")))
    }
}

#[async_trait]
impl ForgeAdapter for FakeForge {
    async fn list_open_pull_requests(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
    ) -> Result<Vec<PullRequest>, Error> {
        let mut prs: Vec<PullRequest> = self.pull_requests.lock().unwrap().values().cloned().collect();
        prs.sort_by_key(|pr| pr.number);
        Ok(prs)
    }

    async fn get_pull_request(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error> {
        self.pull_requests
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pull request #{pr_number}")))
    }

    async fn set_title(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        title: &str,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        Self::get_mut(&mut map, pr_number)?.title = title.to_string();
        Ok(())
    }

    async fn set_body(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        Self::get_mut(&mut map, pr_number)?.body = Some(body.to_string());
        Ok(())
    }

    async fn add_label(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        let pr = Self::get_mut(&mut map, pr_number)?;
        if !pr.labels.iter().any(|l| l.name == label) {
            pr.labels.push(Label {
                name: label.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        let pr = Self::get_mut(&mut map, pr_number)?;
        pr.labels.retain(|l| l.name != label);
        Ok(())
    }

    async fn list_applied_labels(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        Ok(self.get_pull_request("", "", pr_number).await?.labels)
    }

    async fn add_comment(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<u64, Error> {
        let id = {
            let mut counter = self.next_comment_id.lock().unwrap();
            *counter += 1;
            *counter
        };
        let mut map = self.pull_requests.lock().unwrap();
        let pr = Self::get_mut(&mut map, pr_number)?;
        pr.comments.push(Comment {
            id,
            body: body.to_string(),
            user: User {
                id: 0,
                login: "jcheck-bot".to_string(),
            },
            created_at_epoch_ms: 0,
        });
        Ok(id)
    }

    async fn update_comment(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        for pr in map.values_mut() {
            if let Some(comment) = pr.comments.iter_mut().find(|c| c.id == comment_id) {
                comment.body = body.to_string();
                return Ok(());
            }
        }
        Err(Error::NotFound(format!("comment #{comment_id}")))
    }

    async fn list_comments(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>, Error> {
        Ok(self.get_pull_request("", "", pr_number).await?.comments)
    }

    async fn create_check(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error> {
        self.update_check(repo_owner, repo_name, pr_number, check)
            .await
    }

    async fn update_check(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error> {
        let mut map = self.pull_requests.lock().unwrap();
        Self::get_mut(&mut map, pr_number)?.check = Some(check.clone());
        Ok(())
    }

    async fn list_files(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error> {
        Ok(self
            .changed_files
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_reviews(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, Error> {
        Ok(self.get_pull_request("", "", pr_number).await?.reviews)
    }

    async fn fetch_file(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<String>, Error> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&(git_ref.to_string(), path.to_string()))
            .cloned())
    }
}

/// An in-memory issue tracker keyed by issue id.
#[derive(Default)]
pub struct FakeIssueTracker {
    issues: Mutex<HashMap<String, Issue>>,
}

impl FakeIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_issue(&self, issue: Issue) {
        self.issues.lock().unwrap().insert(issue.id.clone(), issue);
    }

    fn get_mut<'a>(map: &'a mut HashMap<String, Issue>, id: &str) -> Result<&'a mut Issue, Error> {
        map.get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("issue {id}")))
    }
}

#[async_trait]
impl IssueTrackerAdapter for FakeIssueTracker {
    async fn get_issue(&self, id: &str) -> Result<Issue, Error> {
        self.issues
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("issue {id}")))
    }

    async fn set_title(&self, id: &str, title: &str) -> Result<(), Error> {
        let mut map = self.issues.lock().unwrap();
        Self::get_mut(&mut map, id)?.title = title.to_string();
        Ok(())
    }

    async fn set_state(&self, id: &str, state: IssueState) -> Result<(), Error> {
        let mut map = self.issues.lock().unwrap();
        Self::get_mut(&mut map, id)?.state = state;
        Ok(())
    }

    async fn set_property(&self, _id: &str, _key: &str, _value: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn add_label(&self, id: &str, label: &str) -> Result<(), Error> {
        let mut map = self.issues.lock().unwrap();
        let issue = Self::get_mut(&mut map, id)?;
        if !issue.labels.iter().any(|l| l.name == label) {
            issue.labels.push(Label {
                name: label.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_label(&self, id: &str, label: &str) -> Result<(), Error> {
        let mut map = self.issues.lock().unwrap();
        Self::get_mut(&mut map, id)?.labels.retain(|l| l.name != label);
        Ok(())
    }

    async fn add_comment(&self, _id: &str, _body: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn add_link(&self, _id: &str, _relation: &str, _target_id: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// An in-memory version control system: a flat commit graph of
/// `child -> parent` edges plus named refs, enough to satisfy the
/// Mergeability Prober's ancestry and dry-run probes without a
/// real git checkout.
#[derive(Default)]
pub struct FakeVcs {
    refs: Mutex<HashMap<(String, String, String), String>>,
    parents: Mutex<HashMap<String, String>>,
    conflicts: Mutex<HashMap<(String, String), Vec<String>>>,
    messages: Mutex<HashMap<String, String>>,
    tags: Mutex<HashMap<(String, String), Vec<String>>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ref(&self, repo_owner: &str, repo_name: &str, git_ref: &str, commit: &str) {
        self.refs.lock().unwrap().insert(
            (repo_owner.to_string(), repo_name.to_string(), git_ref.to_string()),
            commit.to_string(),
        );
    }

    pub fn set_parent(&self, child: &str, parent: &str) {
        self.parents
            .lock()
            .unwrap()
            .insert(child.to_string(), parent.to_string());
    }

    /// Registers that rebasing/cherry-picking `source` onto `target`
    /// conflicts on the given paths; absent an entry, probes succeed clean.
    pub fn set_conflict(&self, source: &str, target: &str, paths: Vec<String>) {
        self.conflicts
            .lock()
            .unwrap()
            .insert((source.to_string(), target.to_string()), paths);
    }

    /// Registers the commit message returned for `hash` by
    /// [`VCSAdapter::resolve_ref`]/[`VCSAdapter::find_commit_on_any_branch`],
    /// e.g. the original `<id>: <title>` header a backport references.
    pub fn set_commit_message(&self, hash: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .insert(hash.to_string(), message.to_string());
    }

    fn message_of(&self, hash: &str) -> String {
        self.messages.lock().unwrap().get(hash).cloned().unwrap_or_default()
    }

    /// Seeds a pre-existing tag, e.g. to exercise `/tag`'s duplicate check.
    pub fn seed_tag(&self, repo_owner: &str, repo_name: &str, name: &str) {
        self.tags
            .lock()
            .unwrap()
            .entry((repo_owner.to_string(), repo_name.to_string()))
            .or_default()
            .push(name.to_string());
    }
}

#[async_trait]
impl VCSAdapter for FakeVcs {
    async fn resolve_ref(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
    ) -> Result<VcsCommit, Error> {
        self.refs
            .lock()
            .unwrap()
            .get(&(repo_owner.to_string(), repo_name.to_string(), git_ref.to_string()))
            .map(|hash| VcsCommit {
                hash: hash.clone(),
                short_id: hash.chars().take(7).collect(),
                message: self.message_of(hash),
            })
            .ok_or_else(|| Error::NotFound(format!("ref {git_ref}")))
    }

    async fn find_commit_on_any_branch(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        hash_or_id: &str,
    ) -> Result<VcsCommit, Error> {
        let parents = self.parents.lock().unwrap();
        let known = parents.contains_key(hash_or_id)
            || parents.values().any(|p| p == hash_or_id)
            || self
                .refs
                .lock()
                .unwrap()
                .values()
                .any(|c| c == hash_or_id);
        if known {
            Ok(VcsCommit {
                hash: hash_or_id.to_string(),
                short_id: hash_or_id.chars().take(7).collect(),
                message: self.message_of(hash_or_id),
            })
        } else {
            Err(Error::NotFound(format!("commit {hash_or_id}")))
        }
    }

    async fn is_ancestor(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool, Error> {
        let parents = self.parents.lock().unwrap();
        let mut current = descendant.to_string();
        while let Some(parent) = parents.get(&current) {
            if parent == ancestor {
                return Ok(true);
            }
            current = parent.clone();
        }
        Ok(ancestor == descendant)
    }

    async fn dry_run_rebase(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        source: &str,
        target: &str,
    ) -> Result<MergeProbeOutcome, Error> {
        match self
            .conflicts
            .lock()
            .unwrap()
            .get(&(source.to_string(), target.to_string()))
        {
            Some(paths) => Ok(MergeProbeOutcome::Conflict {
                conflicting_paths: paths.clone(),
            }),
            None => Ok(MergeProbeOutcome::Clean {
                resulting_tree_hash: format!("{source}-onto-{target}"),
            }),
        }
    }

    async fn is_simple_merge_of_target(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        _base: &str,
        _head: &str,
        _target: &str,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    async fn dry_run_cherry_pick(
        &self,
        repo_owner: &str,
        repo_name: &str,
        commit: &str,
        onto: &str,
        _fuzzy: bool,
    ) -> Result<MergeProbeOutcome, Error> {
        self.dry_run_rebase(repo_owner, repo_name, commit, onto)
            .await
    }

    async fn diff_is_empty(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        from: &str,
        to: &str,
    ) -> Result<bool, Error> {
        Ok(from == to)
    }

    async fn list_tags(&self, repo_owner: &str, repo_name: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(&(repo_owner.to_string(), repo_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_tag(
        &self,
        repo_owner: &str,
        repo_name: &str,
        name: &str,
        _target_sha: &str,
    ) -> Result<(), Error> {
        self.tags
            .lock()
            .unwrap()
            .entry((repo_owner.to_string(), repo_name.to_string()))
            .or_default()
            .push(name.to_string());
        Ok(())
    }
}

/// An in-memory census mapping `(project, user id)` to a role.
#[derive(Default)]
pub struct FakeCensus {
    roles: Mutex<HashMap<(String, u64), CensusRole>>,
    default_role: CensusRole,
}

impl FakeCensus {
    pub fn new(default_role: CensusRole) -> Self {
        Self {
            roles: Mutex::new(HashMap::new()),
            default_role,
        }
    }

    pub fn set_role(&self, project: &str, user: &User, role: CensusRole) {
        self.roles
            .lock()
            .unwrap()
            .insert((project.to_string(), user.id), role);
    }
}

#[async_trait]
impl CensusStore for FakeCensus {
    async fn role_of(
        &self,
        project: &str,
        user: &User,
        _at_epoch_ms: i64,
    ) -> Result<CensusRole, Error> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(project.to_string(), user.id))
            .copied()
            .unwrap_or(self.default_role))
    }
}

/// A scripted jcheck engine: returns whatever findings were registered for a
/// given `(range, config_blob)` pair, or an empty (clean) result otherwise.
#[derive(Default)]
pub struct FakeJCheckEngine {
    findings: Mutex<HashMap<(String, String, String), Vec<crate::models::JCheckFinding>>>,
}

impl FakeJCheckEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_findings(
        &self,
        commit_range: (&str, &str),
        config_blob: &str,
        findings: Vec<crate::models::JCheckFinding>,
    ) {
        self.findings.lock().unwrap().insert(
            (
                commit_range.0.to_string(),
                commit_range.1.to_string(),
                config_blob.to_string(),
            ),
            findings,
        );
    }
}

#[async_trait]
impl JCheckEngine for FakeJCheckEngine {
    async fn run(
        &self,
        _repo_owner: &str,
        _repo_name: &str,
        commit_range: (&str, &str),
        config_blob: &str,
    ) -> Result<Vec<crate::models::JCheckFinding>, Error> {
        Ok(self
            .findings
            .lock()
            .unwrap()
            .get(&(
                commit_range.0.to_string(),
                commit_range.1.to_string(),
                config_blob.to_string(),
            ))
            .cloned()
            .unwrap_or_default())
    }
}
