use anyhow::Context;
use git2::Repository;
use std::path::{Path, PathBuf};

pub const REPO_PATH_ENV: &str = "WERKBANK_REPO_PATH";

/// Resolution order: explicit CLI flag, then the WERKBANK_REPO_PATH
/// environment variable, then git discovery from the current directory.
pub fn resolve_repository_root(cli_repo: Option<&Path>) -> Option<PathBuf> {
    cli_repo
        .map(Path::to_path_buf)
        .or_else(resolve_env_repo_path)
        .or_else(resolve_repo_from_cwd)
}

fn resolve_env_repo_path() -> Option<PathBuf> {
    let env_value = std::env::var_os(REPO_PATH_ENV)?;
    if env_value.is_empty() {
        return None;
    }

    let candidate = PathBuf::from(env_value);
    candidate.exists().then_some(candidate)
}

fn resolve_repo_from_cwd() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    Repository::discover(&cwd)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
}

/// Confirms the chosen root actually is a git repository and normalizes it to
/// the repository's working directory.
pub fn validate_repository_root(root: &Path) -> anyhow::Result<PathBuf> {
    let repo = Repository::discover(root)
        .with_context(|| format!("'{}' is not inside a git repository", root.display()))?;
    repo.workdir().map(Path::to_path_buf).ok_or_else(|| {
        anyhow::anyhow!(
            "'{}' is a bare repository; worktree sessions need a working directory",
            root.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn returns_cli_path_when_provided() {
        let cli = Path::new("/projects/alpha");
        let result = resolve_repository_root(Some(cli));
        assert_eq!(result, Some(cli.to_path_buf()));
    }

    #[test]
    #[serial]
    fn falls_back_to_env_variable_when_available() {
        let temp = TempDir::new().expect("temp dir");
        let original = std::env::var(REPO_PATH_ENV).ok();
        set_env(REPO_PATH_ENV, &temp.path().display().to_string());

        let result = resolve_repository_root(None);
        assert_eq!(result, Some(temp.path().to_path_buf()));

        match original {
            Some(value) => set_env(REPO_PATH_ENV, &value),
            None => remove_env(REPO_PATH_ENV),
        }
    }

    #[test]
    #[serial]
    fn env_variable_pointing_nowhere_is_ignored() {
        let original = std::env::var(REPO_PATH_ENV).ok();
        set_env(REPO_PATH_ENV, "/does/not/exist/anywhere");

        let temp = TempDir::new().expect("temp dir");
        let original_cwd = std::env::current_dir().expect("cwd");
        std::env::set_current_dir(temp.path()).expect("chdir");

        let result = resolve_repository_root(None);
        assert!(result.is_none());

        std::env::set_current_dir(original_cwd).expect("restore cwd");
        match original {
            Some(value) => set_env(REPO_PATH_ENV, &value),
            None => remove_env(REPO_PATH_ENV),
        }
    }

    #[test]
    #[serial]
    fn falls_back_to_cwd_when_a_repository_is_present() {
        let temp = TempDir::new().expect("temp dir");
        Repository::init(temp.path()).expect("init repo");

        let original_cwd = std::env::current_dir().expect("cwd");
        let original_env = std::env::var(REPO_PATH_ENV).ok();
        remove_env(REPO_PATH_ENV);
        std::env::set_current_dir(temp.path()).expect("chdir");

        let result = resolve_repository_root(None);
        let resolved = result
            .map(|p| p.canonicalize().expect("canonicalize resolved"))
            .expect("repository discovered");
        assert_eq!(resolved, temp.path().canonicalize().expect("canonicalize temp"));

        std::env::set_current_dir(original_cwd).expect("restore cwd");
        if let Some(value) = original_env {
            set_env(REPO_PATH_ENV, &value);
        }
    }

    #[test]
    fn validate_rejects_a_plain_directory() {
        let temp = TempDir::new().expect("temp dir");
        assert!(validate_repository_root(temp.path()).is_err());
    }

    #[test]
    fn validate_normalizes_subdirectories_to_the_workdir() {
        let temp = TempDir::new().expect("temp dir");
        Repository::init(temp.path()).expect("init repo");
        let nested = temp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).expect("nested dirs");

        let workdir = validate_repository_root(&nested).expect("validate");
        assert_eq!(
            workdir.canonicalize().expect("canonicalize workdir"),
            temp.path().canonicalize().expect("canonicalize temp")
        );
    }
}
