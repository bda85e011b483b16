use crate::command::{CommandRunner, SystemRunner, display_command};
use crate::constants::PAST_COMMIT_LIMIT;
use crate::error::RepoError;
use crate::marker::index_of_marker;
use crate::status::{FileEntry, FileState, parse_status};
use git2::Repository;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// reads file contents for marker scanning
pub trait FileReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// reads files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// a value computed at most once; concurrent callers wait for the first
/// computation instead of repeating it. failures are not cached.
#[derive(Debug)]
struct Memo<T>(Mutex<Option<Arc<T>>>);

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self(Mutex::new(None))
    }
}

impl<T> Memo<T> {
    fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

/// the real path of the process's current directory
fn current_dir() -> Result<PathBuf, RepoError> {
    std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .map_err(RepoError::CurrentDir)
}

/// find the root of the work tree containing `dir`
pub fn find_root(dir: &Path) -> Result<PathBuf, RepoError> {
    let repo =
        Repository::discover(dir).map_err(|e| RepoError::NotARepository(e.message().to_string()))?;
    repo.workdir().map(Path::to_path_buf).ok_or_else(|| {
        RepoError::NotARepository(format!("{} is a bare repository", repo.path().display()))
    })
}

/// read-only view of a git work tree
///
/// the repository is assumed not to change while a view is alive, so every
/// query runs git at most once and is cached for the life of the view
#[derive(Debug)]
pub struct GitRepo<R = SystemRunner, F = FsReader> {
    root: PathBuf,
    runner: R,
    reader: F,
    entries: Memo<Vec<FileEntry>>,
    untracked: Memo<Vec<FileEntry>>,
    unmerged: Memo<Vec<FileEntry>>,
    marked: Memo<Vec<FileEntry>>,
    branch: Memo<Option<String>>,
    past_commits: Memo<Vec<String>>,
}

impl GitRepo {
    /// open the work tree containing `dir`, running git with `timeout`
    pub fn open(dir: &Path, timeout: Duration) -> Result<Self, RepoError> {
        let root = find_root(dir)?;
        Ok(Self::with_collaborators(
            root,
            SystemRunner::new(timeout),
            FsReader,
        ))
    }
}

impl<R: CommandRunner, F: FileReader> GitRepo<R, F> {
    pub fn with_collaborators(root: PathBuf, runner: R, reader: F) -> Self {
        Self {
            root,
            runner,
            reader,
            entries: Memo::default(),
            untracked: Memo::default(),
            unmerged: Memo::default(),
            marked: Memo::default(),
            branch: Memo::default(),
            past_commits: Memo::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// resolve a path reported by git (relative to the root) to an absolute one
    pub fn absolute_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// express a path reported by git relative to `dir`, or to the current
    /// directory if `dir` is `None`
    pub fn path_relative_to(&self, path: &str, dir: Option<&Path>) -> Result<PathBuf, RepoError> {
        let base = match dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => current_dir()?.join(dir),
            None => current_dir()?,
        };
        // compare real paths so a symlinked root or directory still lines up
        let base = base.canonicalize().unwrap_or(base);
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let absolute = root.join(path);
        Ok(pathdiff::diff_paths(&absolute, &base).unwrap_or(absolute))
    }

    /// run git in the root, failing on a non-zero exit
    fn git(&self, args: &[&str]) -> Result<String, RepoError> {
        let output = self.runner.run(&self.root, "git", args)?;
        if !output.success() {
            return Err(RepoError::CommandFailed {
                command: display_command("git", args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// every changed path, as reported by `git status --porcelain`
    pub fn file_entries(&self) -> Result<Arc<Vec<FileEntry>>, RepoError> {
        self.entries.get_or_try_init(|| {
            let output = self.git(&["status", "--porcelain"])?;
            Ok::<_, RepoError>(parse_status(&output)?)
        })
    }

    pub fn working_tree_modified(&self) -> Result<bool, RepoError> {
        Ok(!self.file_entries()?.is_empty())
    }

    fn entries_in_state(&self, state: FileState) -> Result<Vec<FileEntry>, RepoError> {
        Ok(self
            .file_entries()?
            .iter()
            .filter(|entry| entry.new_state == state)
            .cloned()
            .collect())
    }

    pub fn untracked_files(&self) -> Result<Arc<Vec<FileEntry>>, RepoError> {
        self.untracked
            .get_or_try_init(|| self.entries_in_state(FileState::Untracked))
    }

    pub fn unmerged_files(&self) -> Result<Arc<Vec<FileEntry>>, RepoError> {
        self.unmerged
            .get_or_try_init(|| self.entries_in_state(FileState::Unmerged))
    }

    /// modified or added files whose contents carry the sentinel marker
    pub fn marked_files(&self) -> Result<Arc<Vec<FileEntry>>, RepoError> {
        self.marked.get_or_try_init(|| {
            let mut marked = Vec::new();
            for entry in self.file_entries()?.iter() {
                if !matches!(entry.new_state, FileState::Modified | FileState::Added) {
                    continue;
                }
                let path = self.absolute_path(&entry.path);
                let bytes = self
                    .reader
                    .read(&path)
                    .map_err(|source| RepoError::Read { path, source })?;
                if index_of_marker(&bytes).is_some() {
                    marked.push(entry.clone());
                }
            }
            Ok::<_, RepoError>(marked)
        })
    }

    /// the checked out branch, or `None` if git can't name it (e.g. no commits yet)
    pub fn branch_name(&self) -> Result<Option<String>, RepoError> {
        let branch = self.branch.get_or_try_init(|| {
            let output = self
                .runner
                .run(&self.root, "git", &["rev-parse", "--abbrev-ref", "HEAD"])?;
            let name = output.stdout.trim();
            Ok::<_, RepoError>((output.success() && !name.is_empty()).then(|| name.to_string()))
        })?;
        Ok((*branch).clone())
    }

    /// abbreviated hash of a recent commit; -1 is the most recent
    pub fn past_commit_name(&self, index: i32) -> Result<String, RepoError> {
        let back = usize::try_from(-1_i64 - i64::from(index))
            .map_err(|_| RepoError::NoSuchCommit { index })?;

        let names = self.past_commits.get_or_try_init(|| {
            let limit = format!("-{PAST_COMMIT_LIMIT}");
            let output = self.git(&["log", "--pretty=format:%h", &limit])?;
            Ok::<_, RepoError>(output.lines().map(str::to_string).collect())
        })?;

        names
            .get(back)
            .cloned()
            .ok_or(RepoError::NoSuchCommit { index })
    }
}
