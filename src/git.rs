//! # Repository Detection
//!
//! Derives the origin repository's canonical HTTPS URL and the current
//! branch, for the optional app-sync step. Detection is best-effort: the
//! required bootstrap steps never depend on it, so failures log a warning
//! and yield `None` instead of aborting.
//!
//! CI provides the branch via `GITHUB_HEAD_REF` on pull-request runs, where
//! the local checkout is a detached merge ref; that override wins when set.

use tokio::process::Command;
use tracing::warn;

/// Where the checkout came from and which branch is checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    /// Canonical HTTPS URL of the origin remote
    pub url: String,
    /// Branch name (CI override or local HEAD)
    pub branch: String,
}

/// Detect the origin URL and branch of the current checkout.
pub async fn detect_repo_context() -> Option<RepoContext> {
    let remote = match git_stdout(&["remote", "get-url", "origin"]).await {
        Some(remote) => remote,
        None => {
            warn!("Could not determine origin remote; app sync will be unavailable");
            return None;
        }
    };

    let url = match canonical_https_url(&remote) {
        Some(url) => url,
        None => {
            warn!(remote, "Origin remote is not a recognizable git URL");
            return None;
        }
    };

    let branch = match branch_override() {
        Some(branch) => branch,
        None => match git_stdout(&["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Some(branch) => branch,
            None => {
                warn!("Could not determine current branch; app sync will be unavailable");
                return None;
            }
        },
    };

    Some(RepoContext { url, branch })
}

fn branch_override() -> Option<String> {
    std::env::var("GITHUB_HEAD_REF")
        .ok()
        .filter(|branch| !branch.is_empty())
}

async fn git_stdout(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Normalize a git remote to its canonical HTTPS form.
///
/// Handles the three shapes remotes come in: scp-like ssh
/// (`git@host:org/repo.git`), ssh URLs (`ssh://git@host/org/repo.git`), and
/// https (with or without the `.git` suffix).
fn canonical_https_url(remote: &str) -> Option<String> {
    let remote = remote.trim();

    if let Some(rest) = remote.strip_prefix("https://") {
        return Some(format!("https://{}", rest.trim_end_matches(".git")));
    }

    if let Some(rest) = remote.strip_prefix("ssh://") {
        let rest = rest.strip_prefix("git@").unwrap_or(rest);
        let (host, path) = rest.split_once('/')?;
        return Some(format!(
            "https://{}/{}",
            host,
            path.trim_end_matches(".git")
        ));
    }

    if let Some(rest) = remote.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(format!(
            "https://{}/{}",
            host,
            path.trim_end_matches(".git")
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalizes_scp_like_remote() {
        assert_eq!(
            canonical_https_url("git@github.com:microscaler/deploy.git").as_deref(),
            Some("https://github.com/microscaler/deploy")
        );
    }

    #[test]
    fn test_canonicalizes_ssh_url() {
        assert_eq!(
            canonical_https_url("ssh://git@git.example.com/infra/deploy.git").as_deref(),
            Some("https://git.example.com/infra/deploy")
        );
    }

    #[test]
    fn test_strips_git_suffix_from_https() {
        assert_eq!(
            canonical_https_url("https://github.com/microscaler/deploy.git").as_deref(),
            Some("https://github.com/microscaler/deploy")
        );
        assert_eq!(
            canonical_https_url("https://github.com/microscaler/deploy").as_deref(),
            Some("https://github.com/microscaler/deploy")
        );
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert_eq!(canonical_https_url("/local/path/repo"), None);
        assert_eq!(canonical_https_url("git@github.com"), None);
    }
}
