use std::fmt;

use url::Url;

/// URL scheme prefixes that mark a string as a git remote.
const GIT_SCHEMES: &[&str] = &[
    "https://",
    "http://",
    "ssh://",
    "git://",
    "git+ssh://",
    "file://",
];

/// Hosting platforms whose web URLs can be resolved to clone URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// github.com
    GitHub,
    /// gitlab.com and self-hosted `gitlab.*` instances
    GitLab,
    /// bitbucket.org
    Bitbucket,
    /// dev.azure.com and `*.visualstudio.com`
    AzureDevOps,
    /// codeberg.org
    Codeberg,
    /// Self-hosted Gitea instances
    Gitea,
}

impl Platform {
    /// Identify the platform serving `host`.
    fn detect(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        match host {
            "github.com" => Some(Self::GitHub),
            "bitbucket.org" => Some(Self::Bitbucket),
            "codeberg.org" => Some(Self::Codeberg),
            "dev.azure.com" | "ssh.dev.azure.com" => Some(Self::AzureDevOps),
            h if h.ends_with(".visualstudio.com") => Some(Self::AzureDevOps),
            h if h == "gitlab.com" || h.starts_with("gitlab.") => Some(Self::GitLab),
            h if h.contains("gitea") => Some(Self::Gitea),
            _ => None,
        }
    }

    /// The ref a pull request's head can be fetched from, when the platform
    /// exposes one.
    pub fn pull_request_ref(self, number: &str) -> Option<String> {
        match self {
            Self::GitHub | Self::Codeberg | Self::Gitea => Some(format!("refs/pull/{number}/head")),
            Self::GitLab => Some(format!("refs/merge-requests/{number}/head")),
            Self::Bitbucket | Self::AzureDevOps => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
            Self::Bitbucket => "Bitbucket",
            Self::AzureDevOps => "Azure DevOps",
            Self::Codeberg => "Codeberg",
            Self::Gitea => "Gitea",
        };
        f.write_str(name)
    }
}

/// Clone URL and references extracted from a user-supplied remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUrlInfo {
    /// URL handed to `git clone`.
    pub clone_url: String,
    /// Hosting platform, when recognized.
    pub platform: Option<Platform>,
    /// Branch named by the URL, verbatim.
    pub branch: Option<String>,
    /// Pull/merge request number named by the URL.
    pub pull_request: Option<String>,
}

impl PlatformUrlInfo {
    /// Wrap a generic git URL that carries no platform references.
    pub fn plain(url: &str) -> Self {
        Self {
            clone_url: url.to_string(),
            platform: None,
            branch: None,
            pull_request: None,
        }
    }

    /// Info for a platform URL without branch or pull request references.
    fn repository(clone_url: String, platform: Platform) -> Self {
        Self {
            clone_url,
            platform: Some(platform),
            branch: None,
            pull_request: None,
        }
    }

    /// Attach a branch reference.
    fn with_branch(mut self, branch: String) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Attach a pull request reference.
    fn with_pull_request(mut self, number: &str) -> Self {
        self.pull_request = Some(number.to_string());
        self
    }
}

/// Resolve a hosting-platform URL into its clone URL and references.
///
/// Returns `None` when `input` is not a recognized platform URL: a filesystem
/// path, a URL on an unknown host, or a known host with an unrecognized path
/// shape. Callers should then try [`is_git_url`] before treating `input` as
/// a local path.
pub fn resolve_platform_url(input: &str) -> Option<PlatformUrlInfo> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if !input.contains("://") {
        return resolve_scp_like(input);
    }

    let url = Url::parse(input).ok()?;
    let platform = Platform::detect(url.host_str()?)?;

    match url.scheme() {
        "ssh" | "git+ssh" | "git" => {
            // Non-web remotes carry no branch or pull request references.
            let segments = path_segments(&url);
            (segments.len() >= 2).then(|| PlatformUrlInfo::repository(input.to_string(), platform))
        }
        "http" | "https" => match platform {
            Platform::GitHub => resolve_github(&url),
            Platform::GitLab => resolve_gitlab(&url),
            Platform::Bitbucket => resolve_bitbucket(&url),
            Platform::AzureDevOps => resolve_azure(&url),
            Platform::Codeberg | Platform::Gitea => resolve_gitea(&url, platform),
        },
        _ => None,
    }
}

/// Check whether `input` looks like a git remote: a URL scheme, a `.git`
/// suffix, or the `user@host:path` SSH form.
pub fn is_git_url(input: &str) -> bool {
    let input = input.trim();
    if input.is_empty() {
        return false;
    }

    GIT_SCHEMES.iter().any(|scheme| input.starts_with(scheme))
        || input.ends_with(".git")
        || split_scp_like(input).is_some()
}

/// Split `user@host:path` into its host and path.
fn split_scp_like(input: &str) -> Option<(&str, &str)> {
    let (user, rest) = input.split_once('@')?;
    let (host, path) = rest.split_once(':')?;

    if user.is_empty() || user.contains('/') || host.is_empty() || host.contains('/') {
        return None;
    }
    if path.is_empty() {
        return None;
    }
    Some((host, path))
}

/// Resolve an SSH remote such as `git@github.com:owner/repo.git`.
fn resolve_scp_like(input: &str) -> Option<PlatformUrlInfo> {
    let (host, path) = split_scp_like(input)?;
    let platform = Platform::detect(host)?;
    let segments = path.split('/').filter(|s| !s.is_empty()).count();
    (segments >= 2).then(|| PlatformUrlInfo::repository(input.to_string(), platform))
}

/// Non-empty path segments of `url`.
fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Rebuild `url` with only the given path segments, dropping query and fragment.
fn base_url(url: &Url, segments: &[&str]) -> String {
    let mut base = url.clone();
    base.set_path(&segments.join("/"));
    base.set_query(None);
    base.set_fragment(None);
    base.to_string()
}

/// Join the segments that make up a branch name, rejecting an empty result.
fn join_branch(segments: &[&str]) -> Option<String> {
    (!segments.is_empty()).then(|| segments.join("/"))
}

/// Parse a pull request number segment.
fn pr_number<'a>(segment: Option<&&'a str>) -> Option<&'a str> {
    segment
        .copied()
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// `github.com/<owner>/<repo>[/tree/<branch>|/blob/<branch>/<path>|/pull/<n>]`
fn resolve_github(url: &Url) -> Option<PlatformUrlInfo> {
    let segments = path_segments(url);
    if segments.len() < 2 {
        return None;
    }
    let info = PlatformUrlInfo::repository(base_url(url, &segments[..2]), Platform::GitHub);
    let rest = &segments[2..];

    match rest.first().copied() {
        None => Some(info),
        Some("tree") => Some(info.with_branch(join_branch(&rest[1..])?)),
        Some("blob") => Some(info.with_branch(rest.get(1)?.to_string())),
        Some("pull") => Some(info.with_pull_request(pr_number(rest.get(1))?)),
        Some(_) => None,
    }
}

/// `gitlab.com/<group>/.../<project>[/-/tree/<branch>|/-/blob/<branch>/<path>|/-/merge_requests/<n>]`
fn resolve_gitlab(url: &Url) -> Option<PlatformUrlInfo> {
    let segments = path_segments(url);
    let marker = segments.iter().position(|s| *s == "-");
    let project = &segments[..marker.unwrap_or(segments.len())];
    if project.len() < 2 {
        return None;
    }
    let info = PlatformUrlInfo::repository(base_url(url, project), Platform::GitLab);

    let Some(marker) = marker else {
        return Some(info);
    };
    let rest = &segments[marker + 1..];

    match rest.first().copied() {
        Some("tree") => Some(info.with_branch(join_branch(&rest[1..])?)),
        Some("blob") => Some(info.with_branch(rest.get(1)?.to_string())),
        Some("merge_requests") => Some(info.with_pull_request(pr_number(rest.get(1))?)),
        _ => None,
    }
}

/// `bitbucket.org/<owner>/<repo>[/src/<branch>/<path>|/branch/<branch>|/pull-requests/<n>]`
fn resolve_bitbucket(url: &Url) -> Option<PlatformUrlInfo> {
    let segments = path_segments(url);
    if segments.len() < 2 {
        return None;
    }
    let info = PlatformUrlInfo::repository(base_url(url, &segments[..2]), Platform::Bitbucket);
    let rest = &segments[2..];

    match rest.first().copied() {
        None => Some(info),
        Some("src") => Some(info.with_branch(rest.get(1)?.to_string())),
        Some("branch") => Some(info.with_branch(join_branch(&rest[1..])?)),
        Some("pull-requests") => Some(info.with_pull_request(pr_number(rest.get(1))?)),
        Some(_) => None,
    }
}

/// `dev.azure.com/<org>/<project>/_git/<repo>[?version=GB<branch>|/pullrequest/<n>]`
fn resolve_azure(url: &Url) -> Option<PlatformUrlInfo> {
    let segments = path_segments(url);
    let marker = segments.iter().position(|s| *s == "_git")?;
    // Need at least one segment before `_git` and the repository after it.
    if marker == 0 || segments.len() <= marker + 1 {
        return None;
    }
    let mut info =
        PlatformUrlInfo::repository(base_url(url, &segments[..=marker + 1]), Platform::AzureDevOps);

    let version = url
        .query_pairs()
        .find(|(key, _)| key == "version")
        .and_then(|(_, value)| value.strip_prefix("GB").map(str::to_string));
    if let Some(branch) = version.filter(|b| !b.is_empty()) {
        info = info.with_branch(branch);
    }

    let rest = &segments[marker + 2..];
    match rest.first().copied() {
        None => Some(info),
        Some("pullrequest") => Some(info.with_pull_request(pr_number(rest.get(1))?)),
        Some(_) => None,
    }
}

/// `codeberg.org/<owner>/<repo>[/src/branch/<branch>|/pulls/<n>]`, shared with Gitea.
fn resolve_gitea(url: &Url, platform: Platform) -> Option<PlatformUrlInfo> {
    let segments = path_segments(url);
    if segments.len() < 2 {
        return None;
    }
    let info = PlatformUrlInfo::repository(base_url(url, &segments[..2]), platform);
    let rest = &segments[2..];

    match rest.first().copied() {
        None => Some(info),
        Some("src") if rest.get(1) == Some(&"branch") => {
            Some(info.with_branch(join_branch(&rest[2..])?))
        }
        Some("pulls" | "pull") => Some(info.with_pull_request(pr_number(rest.get(1))?)),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(input: &str) -> PlatformUrlInfo {
        resolve_platform_url(input).unwrap_or_else(|| panic!("expected {input} to resolve"))
    }

    #[test]
    fn github_pull_request() {
        let info = resolve("https://github.com/owner/repo/pull/123");
        assert_eq!(info.platform, Some(Platform::GitHub));
        assert_eq!(info.platform.unwrap().to_string(), "GitHub");
        assert_eq!(info.pull_request.as_deref(), Some("123"));
        assert_eq!(info.branch, None);
        assert_eq!(info.clone_url, "https://github.com/owner/repo");
        assert!(!info.clone_url.contains("/pull/123"));

        let info = resolve("https://github.com/owner/repo/pull/123/files");
        assert_eq!(info.pull_request.as_deref(), Some("123"));
    }

    #[test]
    fn github_tree_keeps_slashes_in_branch() {
        let info = resolve("https://github.com/owner/repo/tree/release/v1");
        assert_eq!(info.branch.as_deref(), Some("release/v1"));
        assert_eq!(info.clone_url, "https://github.com/owner/repo");
        assert_eq!(info.pull_request, None);
    }

    #[test]
    fn github_blob_takes_first_segment() {
        let info = resolve("https://github.com/owner/repo/blob/main/src/lib.rs");
        assert_eq!(info.branch.as_deref(), Some("main"));
        assert_eq!(info.clone_url, "https://github.com/owner/repo");
    }

    #[test]
    fn github_plain_repository_urls() {
        let info = resolve("https://github.com/owner/repo");
        assert_eq!(info.clone_url, "https://github.com/owner/repo");
        assert_eq!(info.branch, None);

        let info = resolve("https://github.com/owner/repo.git");
        assert_eq!(info.clone_url, "https://github.com/owner/repo.git");

        let info = resolve("https://github.com/owner/repo/?tab=readme#top");
        assert_eq!(info.clone_url, "https://github.com/owner/repo");

        let info = resolve("git@github.com:owner/repo.git");
        assert_eq!(info.platform, Some(Platform::GitHub));
        assert_eq!(info.clone_url, "git@github.com:owner/repo.git");

        let info = resolve("ssh://git@github.com/owner/repo.git");
        assert_eq!(info.clone_url, "ssh://git@github.com/owner/repo.git");
    }

    #[test]
    fn github_unrecognized_shapes_are_not_smart() {
        assert!(resolve_platform_url("https://github.com/owner").is_none());
        assert!(resolve_platform_url("https://github.com/owner/repo/issues/4").is_none());
        assert!(resolve_platform_url("https://github.com/owner/repo/pull/abc").is_none());
        assert!(resolve_platform_url("https://github.com/owner/repo/tree").is_none());
    }

    #[test]
    fn gitlab_urls() {
        let info = resolve("https://gitlab.com/group/sub/project/-/tree/feature/login");
        assert_eq!(info.platform, Some(Platform::GitLab));
        assert_eq!(info.clone_url, "https://gitlab.com/group/sub/project");
        assert_eq!(info.branch.as_deref(), Some("feature/login"));

        let info = resolve("https://gitlab.com/group/project/-/merge_requests/42");
        assert_eq!(info.clone_url, "https://gitlab.com/group/project");
        assert_eq!(info.pull_request.as_deref(), Some("42"));

        let info = resolve("https://gitlab.example.org/team/project");
        assert_eq!(info.platform, Some(Platform::GitLab));
        assert_eq!(info.clone_url, "https://gitlab.example.org/team/project");
    }

    #[test]
    fn bitbucket_urls() {
        let info = resolve("https://bitbucket.org/team/repo/src/develop/README.md");
        assert_eq!(info.platform, Some(Platform::Bitbucket));
        assert_eq!(info.clone_url, "https://bitbucket.org/team/repo");
        assert_eq!(info.branch.as_deref(), Some("develop"));

        let info = resolve("https://bitbucket.org/team/repo/pull-requests/7");
        assert_eq!(info.pull_request.as_deref(), Some("7"));
    }

    #[test]
    fn azure_devops_urls() {
        let info = resolve("https://dev.azure.com/org/project/_git/repo?version=GBfeature/x");
        assert_eq!(info.platform, Some(Platform::AzureDevOps));
        assert_eq!(info.platform.unwrap().to_string(), "Azure DevOps");
        assert_eq!(info.clone_url, "https://dev.azure.com/org/project/_git/repo");
        assert_eq!(info.branch.as_deref(), Some("feature/x"));

        let info = resolve("https://dev.azure.com/org/project/_git/repo/pullrequest/99");
        assert_eq!(info.pull_request.as_deref(), Some("99"));
        assert_eq!(info.clone_url, "https://dev.azure.com/org/project/_git/repo");

        assert!(resolve_platform_url("https://dev.azure.com/org/project").is_none());
    }

    #[test]
    fn codeberg_and_gitea_urls() {
        let info = resolve("https://codeberg.org/owner/repo/src/branch/dev/ui");
        assert_eq!(info.platform, Some(Platform::Codeberg));
        assert_eq!(info.clone_url, "https://codeberg.org/owner/repo");
        assert_eq!(info.branch.as_deref(), Some("dev/ui"));

        let info = resolve("https://gitea.example.com/owner/repo/pulls/5");
        assert_eq!(info.platform, Some(Platform::Gitea));
        assert_eq!(info.pull_request.as_deref(), Some("5"));
    }

    #[test]
    fn paths_and_unknown_hosts_are_not_smart() {
        assert!(resolve_platform_url("").is_none());
        assert!(resolve_platform_url("my-project").is_none());
        assert!(resolve_platform_url("./nested/dir").is_none());
        assert!(resolve_platform_url("/abs/path").is_none());
        assert!(resolve_platform_url("https://example.com/owner/repo.git").is_none());
        assert!(resolve_platform_url("file:///tmp/origin.git").is_none());
    }

    #[test]
    fn generic_git_urls() {
        assert!(is_git_url("https://example.com/owner/repo"));
        assert!(is_git_url("file:///tmp/origin.git"));
        assert!(is_git_url("ssh://host/repo"));
        assert!(is_git_url("git@example.com:owner/repo"));
        assert!(is_git_url("../mirror.git"));

        assert!(!is_git_url(""));
        assert!(!is_git_url("my-project"));
        assert!(!is_git_url("./nested/dir"));
        assert!(!is_git_url("/abs/path"));
        assert!(!is_git_url("odd@name"));
    }

    #[test]
    fn pull_request_refs() {
        assert_eq!(
            Platform::GitHub.pull_request_ref("12").as_deref(),
            Some("refs/pull/12/head")
        );
        assert_eq!(
            Platform::GitLab.pull_request_ref("3").as_deref(),
            Some("refs/merge-requests/3/head")
        );
        assert_eq!(Platform::Bitbucket.pull_request_ref("1"), None);
    }
}
