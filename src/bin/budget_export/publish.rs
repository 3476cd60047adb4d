//! Commit the generated data file and push it to the `origin` remote.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Commit, ErrorCode, Oid, Repository};

pub const COMMIT_MESSAGE: &str = "Actualizar datos presupuesto";

/// Stage and commit the file and push the current branch.
///
/// # Errors
/// Returns an error if the file is not in a git repository or any git operation fails.
pub fn publish(path: &Path, verbose: bool) -> Result<()> {
    let path = dunce::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))?;
    let repo = Repository::discover(path.parent().unwrap_or(&path))
        .with_context(|| format!("Not inside a git repository: {}", path.display()))?;

    match commit_file(&repo, &path, COMMIT_MESSAGE)? {
        Some(oid) => println!("Committed {oid}"),
        None => println!("No changes to commit"),
    }
    push_head(&repo, verbose)
}

/// Stage the file and commit it on HEAD.
///
/// Returns `None` when the staged tree equals the current HEAD tree.
pub fn commit_file(repo: &Repository, path: &Path, message: &str) -> Result<Option<Oid>> {
    let workdir = repo.workdir().context("Repository has no working directory")?;
    let workdir = dunce::canonicalize(workdir)?;
    let relative = path
        .strip_prefix(&workdir)
        .with_context(|| format!("{} is outside of {}", path.display(), workdir.display()))?;

    let mut index = repo.index()?;
    index.add_path(relative)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(error) if error.code() == ErrorCode::UnbornBranch => None,
        Err(error) => return Err(error.into()),
    };
    if let Some(parent) = &parent
        && parent.tree_id() == tree_id
    {
        return Ok(None);
    }

    let signature = repo.signature()?;
    let parents: Vec<&Commit> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(Some(oid))
}

/// Push the current branch to `origin`.
pub fn push_head(repo: &Repository, verbose: bool) -> Result<()> {
    let head = repo.head()?;
    let branch = head.shorthand().context("HEAD does not point to a branch")?;
    let mut remote = repo.find_remote("origin").context("No 'origin' remote configured")?;

    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            return git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        git2::Cred::default()
    });
    callbacks.sideband_progress(move |data| {
        if verbose && let Ok(text) = std::str::from_utf8(data) {
            print!("remote: {text}");
        }
        true
    });

    let mut push_options = git2::PushOptions::new();
    push_options.remote_callbacks(callbacks);

    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    remote
        .push(&[&refspec], Some(&mut push_options))
        .with_context(|| format!("Failed to push {branch} to origin"))?;
    println!("Pushed {branch} to origin");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).expect("init repo");
        let mut config = repo.config().expect("config");
        config.set_str("user.name", "Budget Export").expect("set name");
        config.set_str("user.email", "budget@example.com").expect("set email");
        repo
    }

    #[test]
    fn commits_only_when_changed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dunce::canonicalize(dir.path()).expect("canonical");
        let repo = init_repo(&root);
        let file = root.join("datos-presupuesto.js");

        fs::write(&file, "const DATOS_PRESUPUESTO = {};\n").expect("write");
        let first = commit_file(&repo, &file, COMMIT_MESSAGE).expect("commit").expect("new commit");
        let commit = repo.find_commit(first).expect("find commit");
        assert_eq!(commit.message(), Some(COMMIT_MESSAGE));
        assert_eq!(commit.parent_count(), 0);
        assert!(commit.tree().expect("tree").get_name("datos-presupuesto.js").is_some());

        assert!(commit_file(&repo, &file, COMMIT_MESSAGE).expect("commit").is_none());

        fs::write(&file, "const DATOS_PRESUPUESTO = {\"a\": 1};\n").expect("write");
        let second = commit_file(&repo, &file, COMMIT_MESSAGE).expect("commit").expect("new commit");
        assert_eq!(repo.find_commit(second).expect("find commit").parent_id(0).expect("parent"), first);
    }

    #[test]
    fn rejects_file_outside_repository() {
        let repo_dir = tempfile::tempdir().expect("tempdir");
        let other_dir = tempfile::tempdir().expect("tempdir");
        let repo = init_repo(&dunce::canonicalize(repo_dir.path()).expect("canonical"));
        let file = dunce::canonicalize(other_dir.path()).expect("canonical").join("data.js");
        fs::write(&file, "x").expect("write");
        assert!(commit_file(&repo, &file, COMMIT_MESSAGE).is_err());
    }

    #[test]
    fn pushes_branch_to_local_remote() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dunce::canonicalize(dir.path()).expect("canonical");
        let work = root.join("work");
        let bare = root.join("origin.git");
        fs::create_dir_all(&work).expect("mkdir");
        let remote_repo = Repository::init_bare(&bare).expect("bare repo");
        let repo = init_repo(&work);
        repo.remote("origin", &bare.to_string_lossy()).expect("add remote");

        let file = work.join("datos-presupuesto.js");
        fs::write(&file, "const DATOS_PRESUPUESTO = {};\n").expect("write");
        let oid = commit_file(&repo, &file, COMMIT_MESSAGE).expect("commit").expect("new commit");

        push_head(&repo, false).expect("push");

        let head = repo.head().expect("head");
        let branch = head.shorthand().expect("branch");
        let pushed = remote_repo
            .find_reference(&format!("refs/heads/{branch}"))
            .expect("pushed ref");
        assert_eq!(pushed.target(), Some(oid));
    }
}
