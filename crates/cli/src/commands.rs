/// The `check-pr` command: one reconciliation pass against a single PR.
pub mod check_pr;
/// The `config` command: manage the CLI's own bot-level configuration file.
pub mod config_cmd;
