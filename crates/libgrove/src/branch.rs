use tracing::debug;

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Check whether `name` is acceptable as a git branch name.
///
/// Slash-separated namespaces (`feature/auth`), dots, digits and underscores
/// are allowed. Rejected: the empty string, names starting with `-` or `/`,
/// names ending with `/` or `.lock`, names containing `..`, ASCII control
/// characters or spaces, and any of `~ ^ : ? * [ \`.
pub fn is_valid_branch_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('-') {
        return false;
    }
    if name.starts_with('/') || name.ends_with('/') || name.ends_with(".lock") {
        return false;
    }
    if name.contains("..") {
        return false;
    }

    !name
        .chars()
        .any(|c| c.is_ascii_control() || c == ' ' || FORBIDDEN_CHARS.contains(&c))
}

/// Parse a comma-separated branch list.
///
/// Segments are trimmed; empty segments and invalid branch names are dropped.
/// The relative order of the remaining names is preserved.
pub fn parse_branch_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let valid = is_valid_branch_name(segment);
            if !valid {
                debug!(branch = %segment, "dropping invalid branch name");
            }
            valid
        })
        .map(str::to_string)
        .collect()
}

/// Put a URL-derived branch at the front of `branches` unless already listed.
pub fn merge_url_branch(mut branches: Vec<String>, url_branch: Option<&str>) -> Vec<String> {
    if let Some(branch) = url_branch
        && !branches.iter().any(|b| b == branch)
    {
        branches.insert(0, branch.to_string());
    }
    branches
}

/// Derive the worktree directory name for `branch`.
pub fn worktree_dir_name(branch: &str) -> String {
    branch.replace('/', "-")
}
