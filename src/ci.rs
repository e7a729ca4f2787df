//! Warnings for builds running on continuous-integration services, where
//! checkouts are often shallow and page dates would silently collapse onto
//! the latest commit.

use crate::git::GitCommand;
use log::{debug, warn};
use std::fmt;

/// The CI services we know how to give advice for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CiVendor {
    GitHubActions,
    GitLabCi,
    AzurePipelines,
    BitbucketPipelines,
    TravisCi,
    CircleCi,
    Generic,
}

impl CiVendor {
    /// Detects the CI service from environment variables read through `env`.
    pub fn detect<F>(env: F) -> Option<CiVendor>
    where
        F: Fn(&str) -> Option<String>,
    {
        const MARKERS: &[(&str, CiVendor)] = &[
            ("GITHUB_ACTIONS", CiVendor::GitHubActions),
            ("GITLAB_CI", CiVendor::GitLabCi),
            ("TF_BUILD", CiVendor::AzurePipelines),
            ("BITBUCKET_BUILD_NUMBER", CiVendor::BitbucketPipelines),
            ("TRAVIS", CiVendor::TravisCi),
            ("CIRCLECI", CiVendor::CircleCi),
            ("CI", CiVendor::Generic),
        ];
        MARKERS
            .iter()
            .find(|(var, _)| env(*var).map_or(false, |v| !v.is_empty() && v != "false"))
            .map(|(_, vendor)| *vendor)
    }

    fn full_history_hint(self) -> &'static str {
        match self {
            CiVendor::GitHubActions => {
                "set `fetch-depth: 0` on the actions/checkout step"
            }
            CiVendor::GitLabCi => "set the `GIT_DEPTH` variable to 0",
            CiVendor::AzurePipelines => {
                "set `fetchDepth: 0` on the checkout step"
            }
            CiVendor::BitbucketPipelines => "set `clone: depth: full`",
            CiVendor::TravisCi => "set `git: depth: false`",
            CiVendor::CircleCi | CiVendor::Generic => {
                "fetch the full history (e.g., `git fetch --unshallow`)"
            }
        }
    }
}

impl fmt::Display for CiVendor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CiVendor::GitHubActions => "GitHub Actions",
            CiVendor::GitLabCi => "GitLab CI",
            CiVendor::AzurePipelines => "Azure Pipelines",
            CiVendor::BitbucketPipelines => "Bitbucket Pipelines",
            CiVendor::TravisCi => "Travis CI",
            CiVendor::CircleCi => "CircleCI",
            CiVendor::Generic => "a CI environment",
        })
    }
}

/// An advisory raised by [`raise_ci_warnings`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CiWarning {
    /// Running on CI without a usable repository.
    NoRepository(CiVendor),

    /// The checkout is shallow.
    ShallowClone(CiVendor),

    /// GitLab was told to fetch a limited number of commits.
    LimitedGitLabDepth(String),
}

impl fmt::Display for CiWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CiWarning::NoRepository(vendor) => write!(
                f,
                "Running on {} without git history: all page dates will be the build date",
                vendor
            ),
            CiWarning::ShallowClone(vendor) => write!(
                f,
                "Running on {} with a shallow clone: page dates will be wrong; {}",
                vendor,
                vendor.full_history_hint()
            ),
            CiWarning::LimitedGitLabDepth(depth) => write!(
                f,
                "GIT_DEPTH is set to {}: page dates may be wrong; {}",
                depth,
                CiVendor::GitLabCi.full_history_hint()
            ),
        }
    }
}

/// Checks the process environment for CI-specific pitfalls and logs a
/// warning for each one found. Never fails; the warnings are also returned.
pub fn raise_ci_warnings(git: Option<&GitCommand>) -> Vec<CiWarning> {
    check(git, |var| std::env::var(var).ok())
}

/// Same as [`raise_ci_warnings`] with the environment read through `env`.
pub fn check<F>(git: Option<&GitCommand>, env: F) -> Vec<CiWarning>
where
    F: Fn(&str) -> Option<String>,
{
    let vendor = match CiVendor::detect(&env) {
        Some(vendor) => vendor,
        None => return Vec::new(),
    };
    debug!("Detected {}", vendor);

    let mut warnings = Vec::new();
    match git {
        None => warnings.push(CiWarning::NoRepository(vendor)),
        Some(git) => {
            if is_shallow(git) {
                warnings.push(CiWarning::ShallowClone(vendor));
            }
        }
    }
    if vendor == CiVendor::GitLabCi {
        if let Some(depth) = env("GIT_DEPTH").filter(|d| !d.is_empty() && d != "0") {
            warnings.push(CiWarning::LimitedGitLabDepth(depth));
        }
    }

    for warning in &warnings {
        warn!("{}", warning);
    }
    warnings
}

fn is_shallow(git: &GitCommand) -> bool {
    match git.run(&["rev-parse", "--is-shallow-repository"]) {
        Ok(out) => out == "true",
        Err(err) => {
            debug!("Could not tell whether the clone is shallow: {}", err);
            false
        }
    }
}
